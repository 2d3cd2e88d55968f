//! Account and program addresses
//!
//! Provides [`Address`], a strongly-typed 20-byte identifier used for
//! accounts, deployed programs and linked libraries.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account or program address
///
/// Parsing accepts any hex case with or without the `0x` prefix.
/// Display is always lower-case with the prefix, which is also the form
/// substituted into linked bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The zero address
    pub const ZERO: Self = Self([0; ADDRESS_LEN]);

    /// Create a new address from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Create address from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 20 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Lower-case hex without prefix (40 chars)
    #[inline]
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check if this is the zero address
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits)?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AddressVisitor;

        impl serde::de::Visitor<'_> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 20-byte address as a hex string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(AddressVisitor)
    }
}

/// Errors that can occur when parsing addresses
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// Invalid address length
    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_with_prefix() {
        let addr: Address = "0x84D626B2BB4D0F064067e4BF80FCe7055d8F3E7B".parse().unwrap();
        assert_eq!(addr.to_string(), "0x84d626b2bb4d0f064067e4bf80fce7055d8f3e7b");
    }

    #[test]
    fn parses_without_prefix() {
        let a: Address = "84d626b2bb4d0f064067e4bf80fce7055d8f3e7b".parse().unwrap();
        let b: Address = "0x84d626b2bb4d0f064067e4bf80fce7055d8f3e7b".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_short_address() {
        let result = "0x1234".parse::<Address>();
        assert!(matches!(
            result,
            Err(AddressError::InvalidLength { expected: 20, actual: 2 })
        ));
    }

    #[test]
    fn rejects_non_hex() {
        assert!("0xzz26b2bb4d0f064067e4bf80fce7055d8f3e7b".parse::<Address>().is_err());
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1; 20]).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address::new([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, addr);
    }
}
