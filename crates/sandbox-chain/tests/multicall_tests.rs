//! Atomic aggregation through the simulated chain

mod common;

use common::*;
use sandbox_artifact::{Address, Uint};
use sandbox_chain::{names, AtomicSetting, Output, ProgramCall};

#[tokio::test]
async fn test_batch_applies_in_order() {
    let network = network();
    let sandbox = deploy_sandbox(&network).await;

    // the setter only works once the override and rebuild earlier in the batch took effect
    let batch = aggregate(vec![
        (sandbox.resolver, sandbox.override_call()),
        (sandbox.resolver, sandbox.rebuild_call()),
        (sandbox.settings, ProgramCall::SetAtomicTwapWindow { window: Uint(1800) }),
    ]);
    let receipt = send(&network, OWNER, sandbox.multicall, &batch).await;
    assert!(receipt.is_success(), "{:?}", receipt.status);

    let window = read(
        &network,
        sandbox.settings,
        &ProgramCall::AtomicSetting {
            setting: AtomicSetting::TwapWindow,
        },
    )
    .await;
    assert_eq!(window, Output::Uint(Uint(1800)));
}

#[tokio::test]
async fn test_failing_call_rolls_back_everything() {
    let network = network();
    let sandbox = deploy_sandbox(&network).await;
    let before = network.world();

    let batch = aggregate(vec![
        (sandbox.resolver, sandbox.override_call()),
        (sandbox.resolver, sandbox.rebuild_call()),
        (sandbox.settings, ProgramCall::SetAtomicMaxVolumePerBlock { max_volume: Uint::units(1) }),
        // below the one-minute minimum
        (sandbox.settings, ProgramCall::SetAtomicTwapWindow { window: Uint(59) }),
    ]);
    let receipt = send(&network, OWNER, sandbox.multicall, &batch).await;

    assert_eq!(
        receipt.revert_reason(),
        Some("Multicall aggregate: call 3 failed: Atomic twap window under minimum 1 min")
    );
    assert_eq!(network.world(), before);

    let rates = read(
        &network,
        sandbox.resolver,
        &ProgramCall::GetAddress {
            name: names::EXCHANGE_RATES,
        },
    )
    .await;
    assert_eq!(rates, Output::Address(PROD_RATES));
}

#[tokio::test]
async fn test_non_owner_cannot_aggregate() {
    let network = network();
    let sandbox = deploy_sandbox(&network).await;

    let batch = aggregate(vec![(sandbox.resolver, sandbox.override_call())]);
    let receipt = send(&network, STRANGER, sandbox.multicall, &batch).await;

    assert_eq!(
        receipt.revert_reason(),
        Some("Only the contract owner may perform this action")
    );
}

#[tokio::test]
async fn test_owner_cannot_bypass_multicall() {
    let network = network();
    let sandbox = deploy_sandbox(&network).await;

    // the resolver is owned by the multicall, not by the multicall's owner
    let receipt = send(&network, OWNER, sandbox.resolver, &sandbox.override_call()).await;
    assert_eq!(
        receipt.revert_reason(),
        Some("Only the contract owner may perform this action")
    );
}

#[tokio::test]
async fn test_call_to_missing_program_fails_batch() {
    let network = network();
    let sandbox = deploy_sandbox(&network).await;

    let batch = aggregate(vec![
        (sandbox.resolver, sandbox.override_call()),
        (Address::new([0xee; 20]), ProgramCall::RebuildCache),
    ]);
    let receipt = send(&network, OWNER, sandbox.multicall, &batch).await;
    assert!(receipt
        .revert_reason()
        .is_some_and(|r| r.starts_with("Multicall aggregate: call 1 failed")));
}
