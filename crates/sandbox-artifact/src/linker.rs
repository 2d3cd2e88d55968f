//! Library linking
//!
//! Resolves the library placeholders of a [`CompiledArtifact`] into a
//! deployable binary. Linking is a pure function of the artifact and the
//! [`LibraryBindingMap`]: the same inputs always produce the same bytes.

use crate::address::{Address, ADDRESS_LEN};
use crate::artifact::CompiledArtifact;
use crate::hash::ContentHash;
use std::collections::{BTreeMap, BTreeSet};

/// Library name to deployed library address
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LibraryBindingMap(BTreeMap<String, Address>);

impl LibraryBindingMap {
    /// Empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, library: impl Into<String>, address: Address) -> Self {
        self.0.insert(library.into(), address);
        self
    }

    /// Bind a library, returning the previous binding
    pub fn insert(&mut self, library: impl Into<String>, address: Address) -> Option<Address> {
        self.0.insert(library.into(), address)
    }

    /// Look up a library
    #[inline]
    #[must_use]
    pub fn get(&self, library: &str) -> Option<Address> {
        self.0.get(library).copied()
    }

    /// Iterate bindings in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.0.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    /// Number of bindings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no library is bound
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fully-resolved deployable binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedBytecode {
    bytes: Vec<u8>,
    hash: ContentHash,
}

impl LinkedBytecode {
    /// Wrap already-resolved bytes
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let hash = ContentHash::compute(&bytes);
        Self { bytes, hash }
    }

    /// Binary contents
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the raw bytes
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Fingerprint of the binary
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the binary is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Link an artifact against a set of library bindings
///
/// Every referenced library must be bound; the error lists all of the
/// missing ones at once. Each 20-byte placeholder is replaced by the
/// lower-case hex of the bound address.
///
/// # Errors
/// - [`LinkError::MissingLibraryBinding`] if any referenced library is unbound
/// - [`LinkError::InvalidLinkReference`] if a reference is out of range or not 20 bytes
/// - [`LinkError::OddLength`] if the hex object has an odd number of characters
/// - [`LinkError::UnresolvedPlaceholder`] if non-hex characters remain after substitution
pub fn link(
    artifact: &CompiledArtifact,
    libraries: &LibraryBindingMap,
) -> Result<LinkedBytecode, LinkError> {
    let missing: BTreeSet<&str> = artifact
        .libraries()
        .into_iter()
        .filter(|name| libraries.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(LinkError::MissingLibraryBinding {
            artifact: artifact.name().to_string(),
            names: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let object = artifact.object();
    if object.len() % 2 != 0 {
        return Err(LinkError::OddLength {
            artifact: artifact.name().to_string(),
            len: object.len(),
        });
    }
    let byte_len = object.len() / 2;

    let mut chars = object.as_bytes().to_vec();
    for reference in artifact.link_references() {
        let in_bounds = reference
            .start
            .checked_add(reference.length)
            .is_some_and(|end| end <= byte_len);
        if reference.length != ADDRESS_LEN || !in_bounds {
            return Err(LinkError::InvalidLinkReference {
                artifact: artifact.name().to_string(),
                library: reference.library.clone(),
                start: reference.start,
                length: reference.length,
            });
        }

        let Some(address) = libraries.get(&reference.library) else {
            // covered by the missing-binding check above
            continue;
        };
        let from = reference.start * 2;
        chars[from..from + ADDRESS_LEN * 2].copy_from_slice(address.to_hex().as_bytes());
    }

    if let Some(position) = chars.iter().position(|c| !c.is_ascii_hexdigit()) {
        return Err(LinkError::UnresolvedPlaceholder {
            artifact: artifact.name().to_string(),
            offset: position / 2,
        });
    }

    let bytes = hex::decode(&chars).map_err(|e| LinkError::Hex {
        artifact: artifact.name().to_string(),
        source: e,
    })?;

    Ok(LinkedBytecode::from_bytes(bytes))
}

/// Errors produced while linking
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// One or more referenced libraries have no binding
    #[error("missing link library name(s) for {artifact}: {}", names.join(", "))]
    MissingLibraryBinding { artifact: String, names: Vec<String> },

    /// Reference range is out of bounds or not address-sized
    #[error("invalid link reference in {artifact}: {library} at {start} (length {length})")]
    InvalidLinkReference {
        artifact: String,
        library: String,
        start: usize,
        length: usize,
    },

    /// Placeholder characters remain after substitution
    #[error("unresolved placeholder in {artifact} at byte {offset}")]
    UnresolvedPlaceholder { artifact: String, offset: usize },

    /// Hex object has an odd number of characters
    #[error("bytecode of {artifact} has odd hex length {len}")]
    OddLength { artifact: String, len: usize },

    /// Hex decoding failed
    #[error("bytecode of {artifact} is not valid hex: {source}")]
    Hex {
        artifact: String,
        source: hex::FromHexError,
    },
}
