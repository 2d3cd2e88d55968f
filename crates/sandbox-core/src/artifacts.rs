//! Compiled programs for a deployment
//!
//! Every program kind needs an artifact; all of them are linked before the
//! first transaction is sent, so a missing library binding never leaves a
//! half-deployed sandbox behind.

use crate::config::SandboxConfig;
use crate::error::ConfigurationError;
use sandbox_artifact::{link, CompiledArtifact, LibraryBindingMap, LinkError, LinkedBytecode};
use sandbox_chain::ProgramKind;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Name the shared math library is linked under
pub const SHARED_MATH_LIBRARY: &str = "SafeDecimalMath";

/// Library bindings implied by the configuration
#[must_use]
pub fn library_bindings(config: &SandboxConfig) -> LibraryBindingMap {
    LibraryBindingMap::new().with(SHARED_MATH_LIBRARY, config.production.shared_math_library)
}

/// One compiled artifact per program kind
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    artifacts: BTreeMap<ProgramKind, CompiledArtifact>,
}

impl ArtifactSet {
    /// Build from artifacts, requiring every kind
    ///
    /// # Errors
    /// Returns [`ConfigurationError::MissingArtifact`] for the first kind without one
    pub fn new(
        artifacts: impl IntoIterator<Item = (ProgramKind, CompiledArtifact)>,
    ) -> Result<Self, ConfigurationError> {
        let artifacts: BTreeMap<_, _> = artifacts.into_iter().collect();
        if let Some(kind) = ProgramKind::ALL
            .into_iter()
            .find(|kind| !artifacts.contains_key(kind))
        {
            return Err(ConfigurationError::MissingArtifact(kind));
        }
        Ok(Self { artifacts })
    }

    /// Load `<Kind>.json` for every kind from `dir`
    ///
    /// # Errors
    /// Returns error if any file is missing or unparseable
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let dir = dir.as_ref();
        let mut artifacts = BTreeMap::new();
        for kind in ProgramKind::ALL {
            let path = dir.join(format!("{}.json", kind.name()));
            let artifact = CompiledArtifact::load(&path)?;
            debug!(program = %kind, path = %path.display(), "loaded artifact");
            artifacts.insert(kind, artifact);
        }
        Self::new(artifacts)
    }

    /// Artifact for `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: ProgramKind) -> Option<&CompiledArtifact> {
        self.artifacts.get(&kind)
    }

    /// Link every artifact
    ///
    /// # Errors
    /// Returns the first artifact's [`LinkError`]
    pub fn link_all(&self, libraries: &LibraryBindingMap) -> Result<LinkedSet, LinkError> {
        let mut linked = BTreeMap::new();
        for (kind, artifact) in &self.artifacts {
            let code = link(artifact, libraries)?;
            debug!(program = %kind, bytes = code.len(), hash = %code.hash().short(), "linked");
            linked.insert(*kind, code);
        }
        Ok(LinkedSet { linked })
    }
}

/// Deployable bytecode per program kind
#[derive(Debug, Clone, Default)]
pub struct LinkedSet {
    linked: BTreeMap<ProgramKind, LinkedBytecode>,
}

impl LinkedSet {
    /// Bytecode for `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: ProgramKind) -> Option<&LinkedBytecode> {
        self.linked.get(&kind)
    }

    /// Number of linked programs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.linked.len()
    }

    /// Whether nothing was linked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }
}
