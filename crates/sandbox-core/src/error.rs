//! Error types for the deployment pipeline

use crate::sequencer::DeployedProgram;
use sandbox_artifact::{Address, ArtifactError, LinkError};
use sandbox_chain::{AbiError, NetworkError, ProgramKind, TxHash};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, DeployError>;

/// Top-level failure of a deployment run
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("linking error: {0}")]
    Linking(#[from] LinkError),

    #[error("deployment error: {0}")]
    Deployment(#[from] DeploymentError),

    /// The programs exist but are not configured
    #[error("aggregation error: {source}")]
    Aggregation {
        #[source]
        source: AggregationError,
        deployed: Vec<DeployedProgram>,
    },

    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),
}

impl DeployError {
    /// Whether the run must stop. Verification never stops it.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Verification(_))
    }

    /// Programs confirmed before the failure
    #[must_use]
    pub fn deployed(&self) -> &[DeployedProgram] {
        match self {
            Self::Deployment(e) => e.deployed(),
            Self::Aggregation { deployed, .. } => deployed,
            _ => &[],
        }
    }
}

impl From<AggregationError> for DeployError {
    fn from(source: AggregationError) -> Self {
        Self::Aggregation {
            source,
            deployed: Vec::new(),
        }
    }
}

/// Problems detected before any network-mutating call
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("wrong network: configuration targets chain {expected}, connected to chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("owner {0} is not a controllable account")]
    OwnerNotControllable(Address),

    #[error("no block explorer API key; set SANDBOX_EXPLORER_API_KEY")]
    MissingExplorerCredential,

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("no artifact for program {0}")]
    MissingArtifact(ProgramKind),

    #[error("network unavailable during pre-flight: {0}")]
    Network(#[source] NetworkError),
}

/// Problems in the deployment plan
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("program {0} is planned twice")]
    Duplicate(ProgramKind),

    #[error("program {program} references {missing}, which is not planned")]
    DanglingReference {
        program: ProgramKind,
        missing: ProgramKind,
    },

    #[error("deployment plan has a dependency cycle through {0}")]
    Cycle(ProgramKind),

    #[error("program {program} needs the address of {dependency}, which is not deployed")]
    Unresolved {
        program: ProgramKind,
        dependency: ProgramKind,
    },
}

/// Failure while deploying; carries what was already confirmed
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("no linked bytecode for {0}")]
    MissingBytecode(ProgramKind),

    #[error("submission of {program} rejected: {source}")]
    Submission {
        program: ProgramKind,
        #[source]
        source: NetworkError,
        deployed: Vec<DeployedProgram>,
    },

    #[error("no receipt for {program} ({tx_hash}): {source}")]
    Receipt {
        program: ProgramKind,
        tx_hash: TxHash,
        #[source]
        source: NetworkError,
        deployed: Vec<DeployedProgram>,
    },

    #[error("deployment of {program} reverted ({tx_hash}): {reason}")]
    Reverted {
        program: ProgramKind,
        tx_hash: TxHash,
        reason: String,
        deployed: Vec<DeployedProgram>,
    },

    #[error("receipt for {program} ({tx_hash}) has no program address")]
    MissingAddress {
        program: ProgramKind,
        tx_hash: TxHash,
        deployed: Vec<DeployedProgram>,
    },
}

impl DeploymentError {
    /// Programs confirmed before the failure
    #[must_use]
    pub fn deployed(&self) -> &[DeployedProgram] {
        match self {
            Self::Submission { deployed, .. }
            | Self::Receipt { deployed, .. }
            | Self::Reverted { deployed, .. }
            | Self::MissingAddress { deployed, .. } => deployed,
            Self::Plan(_) | Self::MissingBytecode(_) => &[],
        }
    }

    /// Same failure, reporting `programs` as deployed
    #[must_use]
    pub(crate) fn with_deployed(mut self, programs: Vec<DeployedProgram>) -> Self {
        match &mut self {
            Self::Submission { deployed, .. }
            | Self::Receipt { deployed, .. }
            | Self::Reverted { deployed, .. }
            | Self::MissingAddress { deployed, .. } => *deployed = programs,
            Self::Plan(_) | Self::MissingBytecode(_) => {}
        }
        self
    }

    /// The program whose deployment failed, if any got that far
    #[must_use]
    pub fn program(&self) -> Option<ProgramKind> {
        match self {
            Self::Submission { program, .. }
            | Self::Receipt { program, .. }
            | Self::Reverted { program, .. }
            | Self::MissingAddress { program, .. } => Some(*program),
            Self::MissingBytecode(program) => Some(*program),
            Self::Plan(_) => None,
        }
    }
}

/// Configuration builder failure
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration refers to {0}, which has not been deployed")]
    MissingProgram(ProgramKind),

    #[error("cannot encode call: {0}")]
    Encode(#[from] AbiError),
}

/// Failure of the atomic configuration batch
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("batch submission rejected: {0}")]
    Submission(#[source] NetworkError),

    #[error("no receipt for batch {tx_hash}: {source}")]
    Receipt {
        tx_hash: TxHash,
        #[source]
        source: NetworkError,
    },

    #[error("batch {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: TxHash, reason: String },
}

impl AggregationError {
    /// Index of the failing call, decoded from the multicall's revert reason
    #[must_use]
    pub fn failed_call_index(&self) -> Option<usize> {
        let Self::Reverted { reason, .. } = self else {
            return None;
        };
        let rest = reason.split("call ").nth(1)?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if rest[digits.len()..].starts_with(" failed") {
            digits.parse().ok()
        } else {
            None
        }
    }
}

/// Source verification failure for one program
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("verification unsupported: {0}")]
    Unsupported(String),

    #[error("verification of {address} rejected: {reason}")]
    Rejected { address: Address, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_verification_is_non_fatal() {
        let verification = DeployError::from(VerificationError::Unsupported("none".into()));
        assert!(!verification.is_fatal());

        let config = DeployError::from(ConfigurationError::MissingExplorerCredential);
        assert!(config.is_fatal());

        let agg = DeployError::from(AggregationError::Build(BuildError::MissingProgram(
            ProgramKind::SandboxAmm,
        )));
        assert!(agg.is_fatal());
    }

    #[test]
    fn failed_call_index_is_decoded() {
        let err = AggregationError::Reverted {
            tx_hash: TxHash::new([0; 32]),
            reason: "Multicall aggregate: call 12 failed: Atomic twap window under minimum 1 min"
                .into(),
        };
        assert_eq!(err.failed_call_index(), Some(12));

        let other = AggregationError::Reverted {
            tx_hash: TxHash::new([0; 32]),
            reason: "Only the contract owner may perform this action".into(),
        };
        assert_eq!(other.failed_call_index(), None);
    }

    #[test]
    fn plan_errors_carry_no_programs() {
        let err = DeploymentError::Plan(PlanError::Cycle(ProgramKind::AddressResolver));
        assert!(err.deployed().is_empty());
        assert_eq!(err.program(), None);
    }
}
