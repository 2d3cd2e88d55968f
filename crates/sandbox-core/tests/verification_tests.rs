//! Verification is best effort and independent per program

use sandbox_chain::{create_address, ConstructorArg, ProgramKind};
use sandbox_core::{
    verify_all, DeploymentOptions, Orchestrator, RecordingVerifier, VerificationOutcome,
};
use sandbox_test_utils::{fixture_artifacts, mainnet_config, network};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_rejected_program_does_not_affect_others() {
    let config = mainnet_config();
    let network = Arc::new(network(&config));
    // the resolver is the owner's second deployment
    let resolver = create_address(config.owner, 1);
    let verifier = Arc::new(RecordingVerifier::new().rejecting(resolver));

    let report = Orchestrator::new(network)
        .with_verifier(verifier.clone())
        .with_options(DeploymentOptions::default().with_verify_delay(Duration::ZERO))
        .deploy(&config, &fixture_artifacts())
        .await
        .unwrap();

    assert_eq!(report.programs.address(ProgramKind::AddressResolver), Some(resolver));
    assert!(matches!(
        report.verification.outcome(ProgramKind::AddressResolver),
        Some(VerificationOutcome::Failed(_))
    ));
    for kind in [ProgramKind::OwnedMulticall, ProgramKind::FlexibleStorage, ProgramKind::SandboxAmm] {
        assert_eq!(report.verification.outcome(kind), Some(&VerificationOutcome::Verified));
    }
    assert_eq!(
        report.verification.outcome(ProgramKind::SystemSettings),
        Some(&VerificationOutcome::Manual)
    );
    assert!(!report.verification.all_verified());

    // precompiled programs are never submitted
    let requests = verifier.requests();
    assert_eq!(requests.len(), 4);
    let multicall = report.programs.get(ProgramKind::OwnedMulticall).unwrap();
    assert!(requests.contains(&(
        multicall.address(),
        vec![ConstructorArg::Address(config.owner)]
    )));
}

#[tokio::test(start_paused = true)]
async fn test_delay_precedes_verification() {
    let config = mainnet_config();
    let network = Arc::new(network(&config));
    let report = Orchestrator::new(network)
        .with_options(DeploymentOptions::default().with_verify_delay(Duration::ZERO))
        .deploy(&config, &fixture_artifacts())
        .await
        .unwrap();

    let verifier = RecordingVerifier::new();
    let started = tokio::time::Instant::now();
    let verification = verify_all(&verifier, &report.programs, Duration::from_secs(20)).await;

    assert!(started.elapsed() >= Duration::from_secs(20));
    assert!(verification.all_verified());
    assert_eq!(verifier.requests().len(), 4);
}
