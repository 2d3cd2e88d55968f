//! Best-effort source verification
//!
//! Each verifiable program is submitted on its own; a failure is logged and
//! recorded, never propagated.

use crate::error::VerificationError;
use crate::sequencer::DeployedSystem;
use parking_lot::Mutex;
use sandbox_artifact::Address;
use sandbox_chain::{ConstructorArg, ProgramKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

/// Advisory wait before the explorer has indexed fresh programs
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(20);

/// Programs whose sources can be verified automatically
pub const VERIFIABLE: [ProgramKind; 4] = [
    ProgramKind::AddressResolver,
    ProgramKind::FlexibleStorage,
    ProgramKind::OwnedMulticall,
    ProgramKind::SandboxAmm,
];

/// Precompiled programs that need manual verification
pub const MANUAL: [ProgramKind; 2] = [ProgramKind::ExchangeRates, ProgramKind::SystemSettings];

/// Source verification backend
#[async_trait::async_trait]
pub trait SourceVerifier: Send + Sync {
    /// Verify the program at `address` deployed with `constructor_args`
    async fn verify(
        &self,
        address: Address,
        constructor_args: &[ConstructorArg],
    ) -> Result<(), VerificationError>;
}

/// For networks without an explorer: every program is skipped
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipVerifier;

#[async_trait::async_trait]
impl SourceVerifier for SkipVerifier {
    async fn verify(&self, _: Address, _: &[ConstructorArg]) -> Result<(), VerificationError> {
        Err(VerificationError::Unsupported(
            "network has no block explorer".to_string(),
        ))
    }
}

/// Records every request; rejects the addresses it is told to
#[derive(Debug, Default)]
pub struct RecordingVerifier {
    requests: Mutex<Vec<(Address, Vec<ConstructorArg>)>>,
    rejected: BTreeSet<Address>,
}

impl RecordingVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject requests for `address`
    #[must_use]
    pub fn rejecting(mut self, address: Address) -> Self {
        self.rejected.insert(address);
        self
    }

    /// Requests seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<(Address, Vec<ConstructorArg>)> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl SourceVerifier for RecordingVerifier {
    async fn verify(
        &self,
        address: Address,
        constructor_args: &[ConstructorArg],
    ) -> Result<(), VerificationError> {
        self.requests.lock().push((address, constructor_args.to_vec()));
        if self.rejected.contains(&address) {
            return Err(VerificationError::Rejected {
                address,
                reason: "bytecode does not match".to_string(),
            });
        }
        Ok(())
    }
}

/// What happened to one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Failed(String),
    Skipped(String),
    Manual,
}

/// Per-program verification results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    entries: Vec<(ProgramKind, VerificationOutcome)>,
}

impl VerificationReport {
    #[must_use]
    pub fn entries(&self) -> &[(ProgramKind, VerificationOutcome)] {
        &self.entries
    }

    /// Outcome for `kind`
    #[must_use]
    pub fn outcome(&self, kind: ProgramKind) -> Option<&VerificationOutcome> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }

    /// Whether every verifiable program was verified
    #[must_use]
    pub fn all_verified(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, o)| matches!(o, VerificationOutcome::Verified | VerificationOutcome::Manual))
    }
}

/// Verify every deployed verifiable program after `delay`
pub async fn verify_all(
    verifier: &dyn SourceVerifier,
    system: &DeployedSystem,
    delay: Duration,
) -> VerificationReport {
    if !delay.is_zero() {
        info!(seconds = delay.as_secs(), "waiting before verification");
        tokio::time::sleep(delay).await;
    }

    let mut report = VerificationReport::default();
    for kind in VERIFIABLE {
        let Some(program) = system.get(kind) else {
            continue;
        };
        let outcome = match verifier
            .verify(program.address(), program.constructor_args())
            .await
        {
            Ok(()) => {
                info!(program = %kind, address = %program.address(), "verified");
                VerificationOutcome::Verified
            }
            Err(VerificationError::Unsupported(reason)) => {
                info!(program = %kind, %reason, "verification skipped");
                VerificationOutcome::Skipped(reason)
            }
            Err(e) => {
                warn!(program = %kind, error = %e, "verification failed");
                VerificationOutcome::Failed(e.to_string())
            }
        };
        report.entries.push((kind, outcome));
    }

    for kind in MANUAL {
        if let Some(program) = system.get(kind) {
            warn!(program = %kind, address = %program.address(), "verify manually");
            report.entries.push((kind, VerificationOutcome::Manual));
        }
    }
    report
}
