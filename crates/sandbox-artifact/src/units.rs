//! Unsigned fixed-point amounts
//!
//! Settings values are 18-decimal fixed-point integers. 128 bits covers every
//! value the sandbox configures (the largest is a volume cap around 1e24).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// 10^18, one whole unit at 18 decimals
pub const ONE_IN_EIGHTEEN: u128 = 1_000_000_000_000_000_000;

/// One basis point at 18 decimals (10^14)
pub const BPS_IN_EIGHTEEN: u128 = 100_000_000_000_000;

/// An unsigned integer setting value
///
/// Serializes as a decimal string so configuration files and payloads are
/// not limited to 64-bit integers. Deserializes from either a string or a
/// native integer.
///
/// Values are capped at [`Uint::MAX`] (2^128 - 1), not the full 256-bit word
/// programs store. Anything larger is rejected when parsed instead of being
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uint(pub u128);

impl Uint {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Largest representable value, 2^128 - 1
    pub const MAX: Self = Self(u128::MAX);

    /// Whole units at 18 decimals
    ///
    /// # Panics
    /// Panics on overflow
    #[must_use]
    pub const fn units(whole: u128) -> Self {
        Self(whole * ONE_IN_EIGHTEEN)
    }

    /// Basis points at 18 decimals
    ///
    /// # Panics
    /// Panics on overflow
    #[must_use]
    pub const fn bps(bps: u128) -> Self {
        Self(bps * BPS_IN_EIGHTEEN)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }
}

impl Display for Uint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uint {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '_').collect();
        digits.parse().map(Self)
    }
}

impl From<u128> for Uint {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Uint {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl serde::Serialize for Uint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Uint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct UintVisitor;

        impl serde::de::Visitor<'_> for UintVisitor {
            type Value = Uint;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a non-negative integer or a decimal string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Uint(u128::from(value)))
            }

            fn visit_u128<E>(self, value: u128) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Uint(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u128::try_from(value)
                    .map(Uint)
                    .map_err(|_| serde::de::Error::custom(format!("negative value {value}")))
            }
        }

        deserializer.deserialize_any(UintVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_helpers() {
        assert_eq!(Uint::units(1_000_000).get(), 1_000_000 * 10u128.pow(18));
        assert_eq!(Uint::bps(30).get(), 30 * 10u128.pow(14));
    }

    #[test]
    fn parses_underscored_decimal() {
        let value: Uint = "1_000_000".parse().unwrap();
        assert_eq!(value, Uint(1_000_000));
    }

    #[test]
    fn json_round_trip_beyond_u64() {
        let value = Uint::units(1_000_000);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"1000000000000000000000000\"");
        assert_eq!(serde_json::from_str::<Uint>(&json).unwrap(), value);
    }

    #[test]
    fn values_above_128_bits_are_rejected() {
        let max = u128::MAX.to_string();
        let over = "340282366920938463463374607431768211456";
        assert_eq!(max.parse::<Uint>().unwrap(), Uint::MAX);
        assert!(over.parse::<Uint>().is_err());
        assert!(serde_json::from_str::<Uint>(&format!("\"{over}\"")).is_err());
    }

    #[test]
    fn accepts_native_integers() {
        assert_eq!(serde_json::from_str::<Uint>("1800").unwrap(), Uint(1800));
        assert!(serde_json::from_str::<Uint>("-1").is_err());
    }
}
