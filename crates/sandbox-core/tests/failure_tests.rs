//! Fatal failures and what they leave behind

use sandbox_artifact::{Address, CompiledArtifact, LinkError, LinkReference, Uint};
use sandbox_chain::{create_address, names, AtomicSetting, ProgramClient, ProgramKind};
use sandbox_core::{
    aggregate, build_configuration, AggregationError, ArtifactSet, DeployError, DeploymentError,
    DeploymentOptions, Orchestrator, SandboxConfig,
};
use sandbox_test_utils::{
    fixture_artifact, fixture_artifacts, mainnet_config, minimal_config, network, BTC, STRANGER,
};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(network: Arc<sandbox_chain::SimulatedNetwork>) -> Orchestrator {
    Orchestrator::new(network)
        .with_options(DeploymentOptions::default().with_verify_delay(Duration::ZERO))
}

async fn deploy_expecting_failure(
    config: &SandboxConfig,
) -> (Arc<sandbox_chain::SimulatedNetwork>, DeployError) {
    let network = Arc::new(network(config));
    let err = orchestrator(network.clone())
        .deploy(config, &fixture_artifacts())
        .await
        .unwrap_err();
    (network, err)
}

#[tokio::test]
async fn test_failed_deployment_reports_confirmed_programs() {
    let config = mainnet_config();
    let network = Arc::new(network(&config));
    network.fail_deployments_of(ProgramKind::SystemSettings);

    let err = orchestrator(network.clone())
        .deploy(&config, &fixture_artifacts())
        .await
        .unwrap_err();
    assert!(err.is_fatal());

    let DeployError::Deployment(DeploymentError::Reverted { program, reason, deployed, .. }) = &err
    else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(*program, ProgramKind::SystemSettings);
    assert_eq!(reason, "SystemSettings: deployment rejected");

    // the rest of the failed stage was already submitted and is reported too
    let kinds: Vec<_> = deployed.iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ProgramKind::OwnedMulticall,
            ProgramKind::AddressResolver,
            ProgramKind::FlexibleStorage,
            ProgramKind::ExchangeRates,
            ProgramKind::SandboxAmm,
        ]
    );
    for program in deployed {
        assert!(network.has_program(program.address()));
    }
}

#[tokio::test]
async fn test_failed_stage_leaves_nothing_unreported() {
    let config = mainnet_config();
    let network = Arc::new(network(&config));
    network.fail_deployments_of(ProgramKind::SystemSettings);

    let err = orchestrator(network.clone())
        .deploy(&config, &fixture_artifacts())
        .await
        .unwrap_err();
    assert_eq!(network.pending_count(), 0);
    network.mine_all();

    let reported: Vec<_> = err.deployed().iter().map(|p| p.address()).collect();
    let on_chain: Vec<_> = (0..8)
        .map(|nonce| create_address(config.owner, nonce))
        .filter(|address| network.has_program(*address))
        .collect();
    assert_eq!(on_chain.len(), 5);
    for address in &on_chain {
        assert!(reported.contains(address), "{address} deployed but not reported");
    }
}

#[tokio::test]
async fn test_missing_library_binding_sends_nothing() {
    let config = mainnet_config();
    let network = Arc::new(network(&config));

    let mut artifacts: Vec<_> = ProgramKind::ALL
        .into_iter()
        .map(|kind| (kind, fixture_artifact(kind)))
        .collect();
    artifacts[5] = (
        ProgramKind::SandboxAmm,
        CompiledArtifact::new(
            "SandboxAmm",
            format!("73{}73{}", "_".repeat(40), "_".repeat(40)),
            vec![
                LinkReference {
                    source: "contracts/Math.sol".into(),
                    library: "Math".into(),
                    start: 1,
                    length: 20,
                },
                LinkReference {
                    source: "contracts/Oracle.sol".into(),
                    library: "OracleLib".into(),
                    start: 22,
                    length: 20,
                },
            ],
        ),
    );
    let artifacts = ArtifactSet::new(artifacts).unwrap();

    let err = orchestrator(network.clone())
        .deploy(&config, &artifacts)
        .await
        .unwrap_err();
    let DeployError::Linking(LinkError::MissingLibraryBinding { names, .. }) = err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(names, vec!["Math".to_string(), "OracleLib".to_string()]);
    assert_eq!(network.block_number(), 0);
    assert_eq!(network.pending_count(), 0);
}

#[tokio::test]
async fn test_rejected_batch_applies_nothing() {
    let mut config = minimal_config();
    config.atomic_settings.twap_window = Uint(59);
    let (network, err) = deploy_expecting_failure(&config).await;

    let DeployError::Aggregation { source: agg, .. } = &err else {
        panic!("unexpected error {err:?}");
    };
    // override, rebuild, dex aggregator, max volume, twap window
    assert_eq!(agg.failed_call_index(), Some(4));
    assert!(matches!(
        agg,
        AggregationError::Reverted { reason, .. } if reason.ends_with("Atomic twap window under minimum 1 min")
    ));
    // deployed but unconfigured programs are still reported
    assert_eq!(err.deployed().len(), 6);

    // none of the batch took effect; the owner deployed at nonces 0..6
    // in stage order
    let resolver = create_address(config.owner, 1);
    let settings = create_address(config.owner, 3);
    assert_eq!(network.program_label(resolver).as_deref(), Some("AddressResolver"));
    assert_eq!(network.program_label(settings).as_deref(), Some("SystemSettings"));

    let resolver = ProgramClient::new(network.as_ref(), resolver);
    assert_eq!(resolver.get_address(names::EXCHANGE_RATES).await.unwrap(), Address::ZERO);
    let settings = ProgramClient::new(network.as_ref(), settings);
    assert!(!settings.is_resolver_cached().await.unwrap());
}

#[tokio::test]
async fn test_fee_rate_above_maximum_is_rejected() {
    let mut config = minimal_config();
    config
        .atomic_settings
        .exchange_fee_rates
        .insert(BTC, Uint(100_000_000_000_000_001));
    let (_network, err) = deploy_expecting_failure(&config).await;

    assert!(matches!(
        err,
        DeployError::Aggregation {
            source: AggregationError::Reverted { ref reason, .. },
            ..
        }
            if reason.ends_with("MAX_EXCHANGE_FEE_RATE exceeded")
    ));
}

#[tokio::test]
async fn test_twap_window_above_maximum_is_rejected() {
    let mut config = minimal_config();
    config.atomic_settings.twap_window = Uint(86_401);
    let (_network, err) = deploy_expecting_failure(&config).await;

    assert!(matches!(
        err,
        DeployError::Aggregation {
            source: AggregationError::Reverted { ref reason, .. },
            ..
        }
            if reason.ends_with("Atomic twap window exceed maximum 1 day")
    ));
}

#[tokio::test]
async fn test_batch_from_non_owner_is_rejected() {
    let config = minimal_config();
    let network = Arc::new(network(&config));
    let report = orchestrator(network.clone())
        .deploy(&config, &fixture_artifacts())
        .await
        .unwrap();

    let mut changed = config.clone();
    changed.atomic_settings.twap_window = Uint(600);
    let batch = build_configuration(&changed, &report.programs).unwrap();
    let multicall = report.programs.address(ProgramKind::OwnedMulticall).unwrap();

    let err = aggregate(network.as_ref(), STRANGER, multicall, &batch)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregationError::Reverted { ref reason, .. }
            if reason == "Only the contract owner may perform this action"
    ));

    let settings = ProgramClient::new(
        network.as_ref(),
        report.programs.address(ProgramKind::SystemSettings).unwrap(),
    );
    assert_eq!(settings.atomic_uint(AtomicSetting::TwapWindow).await.unwrap(), Uint(1800));
}
