//! Compiled program artifacts
//!
//! An artifact is the output of an external compilation step: the hex
//! bytecode (possibly containing library placeholders), the interface
//! description, and the [`LinkReference`]s locating each placeholder.
//!
//! Two on-disk layouts are understood:
//! - solc standard-JSON contract output (`evm.bytecode.object`,
//!   `evm.bytecode.linkReferences`)
//! - Hardhat artifacts (`bytecode`, `linkReferences` at the top level)

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Location of one library placeholder inside an artifact's bytecode
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkReference {
    /// Source file declaring the library
    pub source: String,
    /// Library name, the key used in a binding map
    pub library: String,
    /// Byte offset of the placeholder in the binary
    pub start: usize,
    /// Placeholder length in bytes (always 20 for well-formed artifacts)
    pub length: usize,
}

/// A compiled, possibly unlinked, program
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    name: String,
    abi: serde_json::Value,
    object: String,
    link_references: Vec<LinkReference>,
}

#[derive(Debug, Deserialize)]
struct RawOffset {
    start: usize,
    length: usize,
}

type RawLinkReferences = BTreeMap<String, BTreeMap<String, Vec<RawOffset>>>;

#[derive(Debug, Deserialize)]
struct RawBytecode {
    object: String,
    #[serde(default, rename = "linkReferences")]
    link_references: RawLinkReferences,
}

#[derive(Debug, Deserialize)]
struct RawEvm {
    bytecode: RawBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawArtifact {
    Solc {
        #[serde(default)]
        abi: serde_json::Value,
        evm: RawEvm,
    },
    #[serde(rename_all = "camelCase")]
    Hardhat {
        contract_name: Option<String>,
        #[serde(default)]
        abi: serde_json::Value,
        bytecode: String,
        #[serde(default)]
        link_references: RawLinkReferences,
    },
}

impl CompiledArtifact {
    /// Build an artifact directly from its parts
    ///
    /// A leading `0x` on `object` is stripped.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        object: impl AsRef<str>,
        link_references: Vec<LinkReference>,
    ) -> Self {
        let object = object.as_ref();
        let mut link_references = link_references;
        link_references.sort();
        Self {
            name: name.into(),
            abi: serde_json::Value::Array(Vec::new()),
            object: object.strip_prefix("0x").unwrap_or(object).to_string(),
            link_references,
        }
    }

    /// Parse an artifact from JSON
    ///
    /// `fallback_name` is used when the document does not carry its own
    /// contract name (solc output never does).
    ///
    /// # Errors
    /// Returns error if the JSON matches neither supported layout or the
    /// bytecode is empty
    pub fn from_json(fallback_name: &str, json: &str) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(json)?;
        let (name, abi, object, refs) = match raw {
            RawArtifact::Solc { abi, evm } => (
                fallback_name.to_string(),
                abi,
                evm.bytecode.object,
                evm.bytecode.link_references,
            ),
            RawArtifact::Hardhat {
                contract_name,
                abi,
                bytecode,
                link_references,
            } => (
                contract_name.unwrap_or_else(|| fallback_name.to_string()),
                abi,
                bytecode,
                link_references,
            ),
        };

        let object = object.strip_prefix("0x").unwrap_or(&object).to_string();
        if object.is_empty() {
            return Err(ArtifactError::EmptyBytecode(name));
        }

        let mut link_references = Vec::new();
        for (source, libraries) in refs {
            for (library, offsets) in libraries {
                for offset in offsets {
                    link_references.push(LinkReference {
                        source: source.clone(),
                        library: library.clone(),
                        start: offset.start,
                        length: offset.length,
                    });
                }
            }
        }
        link_references.sort();

        Ok(Self {
            name,
            abi,
            object,
            link_references,
        })
    }

    /// Load an artifact file, naming it after the file stem if needed
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self::from_json(stem, &json)
    }

    /// Program name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface description, kept opaque
    #[inline]
    #[must_use]
    pub fn abi(&self) -> &serde_json::Value {
        &self.abi
    }

    /// Raw hex object without `0x`, placeholders included
    #[inline]
    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// All link references, sorted
    #[inline]
    #[must_use]
    pub fn link_references(&self) -> &[LinkReference] {
        &self.link_references
    }

    /// Names of the libraries this artifact must be linked against
    #[must_use]
    pub fn libraries(&self) -> BTreeSet<&str> {
        self.link_references
            .iter()
            .map(|r| r.library.as_str())
            .collect()
    }

    /// Whether the artifact needs no linking
    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.link_references.is_empty()
    }
}

/// Errors loading artifacts
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// File could not be read
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON did not match a supported layout
    #[error("failed to parse artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Artifact has no bytecode (interface or abstract program)
    #[error("artifact {0} has no bytecode")]
    EmptyBytecode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLC: &str = r#"{
        "abi": [],
        "evm": {
            "bytecode": {
                "object": "6080__$3d8c5e2c2fba1f3ebfc51e1aa8b3e8ba7b$__00",
                "linkReferences": {
                    "contracts/SafeDecimalMath.sol": {
                        "SafeDecimalMath": [{ "start": 2, "length": 20 }]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_solc_output() {
        let artifact = CompiledArtifact::from_json("SystemSettings", SOLC).unwrap();
        assert_eq!(artifact.name(), "SystemSettings");
        assert_eq!(artifact.link_references().len(), 1);
        let reference = &artifact.link_references()[0];
        assert_eq!(reference.library, "SafeDecimalMath");
        assert_eq!(reference.source, "contracts/SafeDecimalMath.sol");
        assert_eq!((reference.start, reference.length), (2, 20));
        assert!(!artifact.is_linked());
    }

    #[test]
    fn parses_hardhat_artifact() {
        let json = r#"{
            "_format": "hh-sol-artifact-1",
            "contractName": "OwnedMulticall",
            "sourceName": "contracts/OwnedMulticall.sol",
            "abi": [],
            "bytecode": "0x60806040",
            "linkReferences": {}
        }"#;
        let artifact = CompiledArtifact::from_json("ignored", json).unwrap();
        assert_eq!(artifact.name(), "OwnedMulticall");
        assert_eq!(artifact.object(), "60806040");
        assert!(artifact.is_linked());
        assert!(artifact.libraries().is_empty());
    }

    #[test]
    fn rejects_empty_bytecode() {
        let json = r#"{ "contractName": "IIssuer", "abi": [], "bytecode": "0x" }"#;
        assert!(matches!(
            CompiledArtifact::from_json("IIssuer", json),
            Err(ArtifactError::EmptyBytecode(name)) if name == "IIssuer"
        ));
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(matches!(
            CompiledArtifact::from_json("x", r#"{ "abi": [] }"#),
            Err(ArtifactError::Parse(_))
        ));
    }
}
