//! Deployment orchestrator
//!
//! Runs the whole pipeline in one control flow: link, deploy stage by
//! stage, configure through one atomic batch, then verify.

use crate::aggregate::{aggregate, AggregationReceipt};
use crate::artifacts::{library_bindings, ArtifactSet};
use crate::config::SandboxConfig;
use crate::configure::build_configuration;
use crate::error::{AggregationError, BuildError, DeployError, DeploymentError};
use crate::plan::DeploymentPlan;
use crate::sequencer::{DeployedSystem, Sequencer};
use crate::verify::{
    verify_all, SkipVerifier, SourceVerifier, VerificationReport, DEFAULT_VERIFY_DELAY,
};
use sandbox_chain::{Network, ProgramKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentOptions {
    /// Wait before verification starts
    pub verify_delay: Duration,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            verify_delay: DEFAULT_VERIFY_DELAY,
        }
    }
}

impl DeploymentOptions {
    #[inline]
    #[must_use]
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub programs: DeployedSystem,
    pub configuration: AggregationReceipt,
    /// Descriptions of the applied calls, in order
    pub calls: Vec<String>,
    pub verification: VerificationReport,
}

/// Drives a deployment against one network
pub struct Orchestrator {
    network: Arc<dyn Network>,
    verifier: Arc<dyn SourceVerifier>,
    options: DeploymentOptions,
}

impl Orchestrator {
    /// Orchestrator that skips verification
    #[must_use]
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network,
            verifier: Arc::new(SkipVerifier),
            options: DeploymentOptions::default(),
        }
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn SourceVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: DeploymentOptions) -> Self {
        self.options = options;
        self
    }

    /// Deploy, configure and verify the sandbox
    ///
    /// # Workflow
    /// 1. Link every artifact against the shared library
    /// 2. Deploy the staged plan
    /// 3. Build and submit the configuration batch
    /// 4. Verify sources (never fatal)
    ///
    /// # Errors
    /// Returns the first fatal failure; see [`DeployError`]
    pub async fn deploy(
        &self,
        config: &SandboxConfig,
        artifacts: &ArtifactSet,
    ) -> Result<DeploymentReport, DeployError> {
        tracing::info!("Deploying sandbox on chain {}", config.chain_id);
        config.validate()?;

        let code = artifacts.link_all(&library_bindings(config))?;
        tracing::info!("Linked {} programs", code.len());

        let plan = DeploymentPlan::sandbox(config).map_err(DeploymentError::from)?;
        tracing::debug!("Deployment plan:\n{}", plan);

        let system = match Sequencer::new(self.network.as_ref(), config.owner)
            .run(&plan, &code)
            .await
        {
            Ok(system) => system,
            Err(e) => {
                tracing::error!("Deployment failed after {} programs: {}", e.deployed().len(), e);
                return Err(e.into());
            }
        };

        let (configuration, calls) = match self.configure(config, &system).await {
            Ok(applied) => applied,
            Err(source) => {
                tracing::error!("Configuration failed: {}", source);
                return Err(DeployError::Aggregation {
                    source,
                    deployed: system.to_vec(),
                });
            }
        };

        let verification =
            verify_all(self.verifier.as_ref(), &system, self.options.verify_delay).await;

        Ok(DeploymentReport {
            programs: system,
            configuration,
            calls,
            verification,
        })
    }

    async fn configure(
        &self,
        config: &SandboxConfig,
        system: &DeployedSystem,
    ) -> Result<(AggregationReceipt, Vec<String>), AggregationError> {
        let batch = build_configuration(config, system)?;
        tracing::info!("Configuration batch has {} calls", batch.len());

        let multicall = system
            .address(ProgramKind::OwnedMulticall)
            .ok_or(BuildError::MissingProgram(ProgramKind::OwnedMulticall))?;
        let receipt = aggregate(self.network.as_ref(), config.owner, multicall, &batch).await?;
        let calls = batch.entries().iter().map(|e| e.description.clone()).collect();
        Ok((receipt, calls))
    }
}
