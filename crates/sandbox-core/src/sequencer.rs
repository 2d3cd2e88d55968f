//! Staged deployment
//!
//! Every program of a stage is submitted in order, then every submission
//! is confirmed before the next stage starts. A [`PendingDeployment`] only
//! becomes a [`DeployedProgram`] once a successful receipt with an address
//! has been observed.

use crate::artifacts::LinkedSet;
use crate::error::DeploymentError;
use crate::plan::DeploymentPlan;
use sandbox_artifact::Address;
use sandbox_chain::{ConstructorArg, Network, ProgramKind, Receipt, TransactionRequest, TxHash};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info};

/// A submitted, unconfirmed deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    kind: ProgramKind,
    constructor_args: Vec<ConstructorArg>,
    tx_hash: TxHash,
}

impl PendingDeployment {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Turn into a confirmed program, if the receipt says so
    ///
    /// `deployed` is what the error reports as already confirmed.
    ///
    /// # Errors
    /// Returns error if the deployment reverted or produced no address
    pub fn confirm(
        self,
        receipt: &Receipt,
        deployed: &DeployedSystem,
    ) -> Result<DeployedProgram, DeploymentError> {
        if let Some(reason) = receipt.revert_reason() {
            return Err(DeploymentError::Reverted {
                program: self.kind,
                tx_hash: self.tx_hash,
                reason: reason.to_string(),
                deployed: deployed.to_vec(),
            });
        }
        let Some(address) = receipt.contract_address else {
            return Err(DeploymentError::MissingAddress {
                program: self.kind,
                tx_hash: self.tx_hash,
                deployed: deployed.to_vec(),
            });
        };
        Ok(DeployedProgram {
            kind: self.kind,
            address,
            constructor_args: self.constructor_args,
            tx_hash: self.tx_hash,
            block_number: receipt.block_number,
        })
    }
}

/// A confirmed program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedProgram {
    kind: ProgramKind,
    address: Address,
    constructor_args: Vec<ConstructorArg>,
    tx_hash: TxHash,
    block_number: u64,
}

impl DeployedProgram {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline]
    #[must_use]
    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }

    #[inline]
    #[must_use]
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    #[inline]
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.block_number
    }
}

/// Confirmed programs by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeployedSystem {
    programs: BTreeMap<ProgramKind, DeployedProgram>,
}

impl DeployedSystem {
    /// Record a confirmed program
    pub fn insert(&mut self, program: DeployedProgram) {
        self.programs.insert(program.kind, program);
    }

    /// Confirmed program of `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: ProgramKind) -> Option<&DeployedProgram> {
        self.programs.get(&kind)
    }

    /// Address of `kind`, if confirmed
    #[inline]
    #[must_use]
    pub fn address(&self, kind: ProgramKind) -> Option<Address> {
        self.programs.get(&kind).map(DeployedProgram::address)
    }

    /// Programs in kind order
    pub fn iter(&self) -> impl Iterator<Item = &DeployedProgram> {
        self.programs.values()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Snapshot for error reports
    #[must_use]
    pub fn to_vec(&self) -> Vec<DeployedProgram> {
        self.programs.values().cloned().collect()
    }
}

/// Deploys a plan from a single signer
pub struct Sequencer<'a> {
    network: &'a dyn Network,
    deployer: Address,
}

impl<'a> Sequencer<'a> {
    #[must_use]
    pub fn new(network: &'a dyn Network, deployer: Address) -> Self {
        Self { network, deployer }
    }

    /// Deploy every stage of `plan`
    ///
    /// A failure inside a stage does not abandon the stage: every
    /// submission already made is still confirmed, so the error reports
    /// everything that reached the chain.
    ///
    /// # Errors
    /// Returns the first failure; programs confirmed before or alongside it
    /// are carried in the error and stay deployed
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
        code: &LinkedSet,
    ) -> Result<DeployedSystem, DeploymentError> {
        let mut system = DeployedSystem::default();

        for (index, stage) in plan.stages().iter().enumerate() {
            info!(stage = index, programs = ?stage, "deploying stage");

            let mut failure = None;
            let mut pending = Vec::with_capacity(stage.len());
            for &kind in stage {
                match self.submit(plan, code, kind, &system).await {
                    Ok(deployment) => pending.push(deployment),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            for deployment in pending {
                match self.confirm(deployment, &system).await {
                    Ok(program) => system.insert(program),
                    Err(e) if failure.is_none() => failure = Some(e),
                    Err(_) => {}
                }
            }

            if let Some(e) = failure {
                return Err(e.with_deployed(system.to_vec()));
            }
        }

        Ok(system)
    }

    async fn confirm(
        &self,
        deployment: PendingDeployment,
        system: &DeployedSystem,
    ) -> Result<DeployedProgram, DeploymentError> {
        let kind = deployment.kind();
        let tx_hash = deployment.tx_hash();
        let receipt = self
            .network
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| {
                error!(program = %kind, tx = %tx_hash, error = %source, "no receipt");
                DeploymentError::Receipt {
                    program: kind,
                    tx_hash,
                    source,
                    deployed: system.to_vec(),
                }
            })?;
        let program = deployment.confirm(&receipt, system).map_err(|e| {
            error!(program = %kind, tx = %tx_hash, error = %e, "deployment failed");
            e
        })?;
        info!(
            program = %kind,
            address = %program.address(),
            block = program.block_number(),
            "deployed"
        );
        Ok(program)
    }

    async fn submit(
        &self,
        plan: &DeploymentPlan,
        code: &LinkedSet,
        kind: ProgramKind,
        system: &DeployedSystem,
    ) -> Result<PendingDeployment, DeploymentError> {
        let constructor_args = plan.resolve_args(kind, system)?;
        let bytecode = code
            .get(kind)
            .ok_or(DeploymentError::MissingBytecode(kind))?;

        let request = TransactionRequest::deploy(
            self.deployer,
            kind,
            bytecode.bytes().to_vec(),
            constructor_args.clone(),
        );
        let tx_hash = self.network.submit(request).await.map_err(|source| {
            error!(program = %kind, error = %source, "submission rejected");
            DeploymentError::Submission {
                program: kind,
                source,
                deployed: system.to_vec(),
            }
        })?;
        info!(program = %kind, tx = %tx_hash, code = %bytecode.hash().short(), "submitted");

        Ok(PendingDeployment {
            kind,
            constructor_args,
            tx_hash,
        })
    }
}
