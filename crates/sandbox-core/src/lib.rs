//! Sandbox Core - deployment and configuration of the sandbox programs
//!
//! Deploys a small set of programs next to a production system and points
//! them at it, so new settings can be exercised without touching production.
//!
//! # Core Concepts
//!
//! - **Plan**: programs and their constructor references, split into stages
//! - **Sequencer**: submits a stage, confirms it, then moves on
//! - **Configuration batch**: pure list of calls built from confirmed addresses
//! - **Aggregation**: the batch runs as one owner-only transaction
//! - **Verification**: best effort, per program, never fatal
//!
//! # Example
//!
//! ```rust,ignore
//! use sandbox_core::{ArtifactSet, Orchestrator, SandboxConfig};
//! use std::sync::Arc;
//!
//! # async fn example(network: Arc<dyn sandbox_chain::Network>) -> sandbox_core::Result<()> {
//! let config = SandboxConfig::load("config/mainnet.toml")?;
//! let artifacts = ArtifactSet::load_dir("build/artifacts")?;
//!
//! let report = Orchestrator::new(network).deploy(&config, &artifacts).await?;
//! for program in report.programs.iter() {
//!     println!("{}: {}", program.kind(), program.address());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregate;
pub mod artifacts;
pub mod config;
pub mod configure;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod preflight;
pub mod rehearsal;
pub mod sequencer;
pub mod verify;

pub use aggregate::{aggregate, AggregationReceipt};
pub use artifacts::{library_bindings, ArtifactSet, LinkedSet, SHARED_MATH_LIBRARY};
pub use config::{AtomicSettings, Environment, ProductionSystem, SandboxConfig};
pub use configure::{
    build_configuration, outline, ConfigurationBatch, ConfigurationEntry, CONSUMERS, OVERRIDDEN,
};
pub use error::{
    AggregationError, BuildError, ConfigurationError, DeployError, DeploymentError, PlanError,
    Result, VerificationError,
};
pub use orchestrator::{DeploymentOptions, DeploymentReport, Orchestrator};
pub use plan::{DeploymentPlan, PlannedArg, PlannedProgram};
pub use preflight::{check_network, preflight};
pub use rehearsal::{rehearsal_genesis, rehearsal_network};
pub use sequencer::{DeployedProgram, DeployedSystem, PendingDeployment, Sequencer};
pub use verify::{
    verify_all, RecordingVerifier, SkipVerifier, SourceVerifier, VerificationOutcome,
    VerificationReport, DEFAULT_VERIFY_DELAY,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
