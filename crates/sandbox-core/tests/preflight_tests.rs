//! Checks made before any transaction is sent

use sandbox_artifact::Address;
use sandbox_chain::SimulatedNetwork;
use sandbox_core::{check_network, preflight, rehearsal_genesis, ConfigurationError, Environment};
use sandbox_test_utils::{mainnet_config, network};

fn env() -> Environment {
    Environment::default().with_explorer_api_key("test-key")
}

#[tokio::test]
async fn test_matching_network_passes() {
    let config = mainnet_config();
    preflight(&network(&config), &config, &env()).await.unwrap();
}

#[tokio::test]
async fn test_wrong_chain_is_rejected() {
    let mut config = mainnet_config();
    let network = network(&config);
    config.chain_id = 10;

    let err = preflight(&network, &config, &env()).await.unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::WrongNetwork {
            expected: 10,
            actual: 1
        }
    ));
}

#[tokio::test]
async fn test_locked_owner_is_rejected() {
    let mut config = mainnet_config();
    let network = network(&config);
    config.owner = Address::new([0x99; 20]);

    let err = preflight(&network, &config, &env()).await.unwrap_err();
    assert!(matches!(err, ConfigurationError::OwnerNotControllable(owner) if owner == config.owner));
}

#[tokio::test]
async fn test_missing_explorer_key_is_rejected() {
    let config = mainnet_config();
    let err = preflight(&network(&config), &config, &Environment::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingExplorerCredential));
}

#[tokio::test]
async fn test_network_checks_need_no_explorer_key() {
    let config = mainnet_config();
    check_network(&network(&config), &config).await.unwrap();

    let mut wrong = config.clone();
    wrong.chain_id = 5;
    assert!(matches!(
        check_network(&network(&config), &wrong).await,
        Err(ConfigurationError::WrongNetwork { expected: 5, .. })
    ));
}

#[tokio::test]
async fn test_rehearsal_network_mirrors_production() {
    let config = mainnet_config();
    let network: SimulatedNetwork = rehearsal_genesis(&config).build();

    assert!(network.has_program(config.production.fallback_resolver));
    assert!(network.has_program(config.production.fallback_settings_store));
    assert!(network.has_program(config.production.shared_math_library));
    for feed in config.price_feed_bindings.values() {
        assert!(network.has_program(*feed));
    }
    preflight(&network, &config, &env()).await.unwrap();
}
