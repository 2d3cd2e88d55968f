//! Checks run before anything is sent
//!
//! [`check_network`] is all a rehearsal needs. A live deployment also
//! submits sources to an explorer, so [`preflight`] additionally requires
//! its credential.

use crate::config::{Environment, SandboxConfig};
use crate::error::ConfigurationError;
use sandbox_chain::Network;
use tracing::info;

/// Confirm the network is the configured chain and the owner can sign
///
/// # Errors
/// - [`ConfigurationError::WrongNetwork`] if the chain id differs
/// - [`ConfigurationError::OwnerNotControllable`] if the owner cannot sign
pub async fn check_network(
    network: &dyn Network,
    config: &SandboxConfig,
) -> Result<(), ConfigurationError> {
    let actual = network.chain_id().await.map_err(ConfigurationError::Network)?;
    if actual != config.chain_id {
        return Err(ConfigurationError::WrongNetwork {
            expected: config.chain_id,
            actual,
        });
    }

    let accounts = network.accounts().await.map_err(ConfigurationError::Network)?;
    if !accounts.contains(&config.owner) {
        return Err(ConfigurationError::OwnerNotControllable(config.owner));
    }

    info!(chain_id = actual, owner = %config.owner, "network checks passed");
    Ok(())
}

/// Full pre-flight for a deployment that will be verified
///
/// # Errors
/// Everything [`check_network`] rejects, plus
/// [`ConfigurationError::MissingExplorerCredential`] without an explorer key
pub async fn preflight(
    network: &dyn Network,
    config: &SandboxConfig,
    env: &Environment,
) -> Result<(), ConfigurationError> {
    check_network(network, config).await?;
    if env.explorer_api_key.is_none() {
        return Err(ConfigurationError::MissingExplorerCredential);
    }
    Ok(())
}
