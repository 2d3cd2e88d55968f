//! Fixed-size 32-byte names
//!
//! Resolver entries, storage records and asset keys are all 32-byte values
//! built from a short UTF-8 name right-padded with zeros.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte name (resolver key, setting name or asset key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes32([u8; 32]);

/// Asset keys are plain 32-byte names (`sBTC`, `sETH`, ...)
pub type AssetKey = Bytes32;

impl Bytes32 {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encode a UTF-8 name, right-padded with zeros
    ///
    /// # Errors
    /// Returns error if the name is longer than 32 bytes
    pub fn from_name(name: &str) -> Result<Self, NameError> {
        let raw = name.as_bytes();
        if raw.len() > 32 {
            return Err(NameError::TooLong {
                name: name.to_string(),
                len: raw.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    /// Encode a name known at compile time to fit
    ///
    /// Names longer than 32 bytes are truncated.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        let raw = name.as_bytes();
        let mut bytes = [0u8; 32];
        let mut i = 0;
        while i < raw.len() && i < 32 {
            bytes[i] = raw[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode back to the textual name, if it is one
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        if self.0[end..].iter().any(|b| *b != 0) {
            return None;
        }
        std::str::from_utf8(&self.0[..end]).ok()
    }
}

impl Display for Bytes32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.as_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl FromStr for Bytes32 {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix("0x") {
            if digits.len() == 64 {
                let raw = hex::decode(digits)?;
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&raw);
                return Ok(Self(bytes));
            }
        }
        Self::from_name(s)
    }
}

impl serde::Serialize for Bytes32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Bytes32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Bytes32Visitor;

        impl serde::de::Visitor<'_> for Bytes32Visitor {
            type Value = Bytes32;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a name of at most 32 bytes or a 0x-prefixed 32-byte hex string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(Bytes32Visitor)
    }
}

/// Errors for 32-byte names
#[derive(Debug, thiserror::Error)]
pub enum NameError {
    /// Name does not fit into 32 bytes
    #[error("name {name:?} is {len} bytes, at most 32 allowed")]
    TooLong { name: String, len: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
