//! Testing utilities for the sandbox workspace
//!
//! Shared fixtures: the shipped mainnet configuration, compiled artifacts
//! with library placeholders, and a simulated network mirroring production.

#![allow(missing_docs)]

use sandbox_artifact::{Address, AssetKey, Bytes32, CompiledArtifact, Uint};
use sandbox_chain::{exchange_fee_rate_record, names, ProgramKind, SimulatedNetwork};
use sandbox_core::{rehearsal_genesis, ArtifactSet, SandboxConfig, SHARED_MATH_LIBRARY};
use std::path::Path;

/// The shipped mainnet configuration
pub const MAINNET_TOML: &str = include_str!("../../../config/mainnet.toml");

pub const USD: AssetKey = Bytes32::from_static("sUSD");
pub const BTC: AssetKey = Bytes32::from_static("sBTC");
pub const ETH: AssetKey = Bytes32::from_static("sETH");
/// Never configured by the sandbox; only production has a fee for it
pub const LINK: AssetKey = Bytes32::from_static("sLINK");

/// Unlocked account that is not the owner
pub const STRANGER: Address = Address::new([0x22; 20]);

/// Base exchange fees already present in the production settings store
pub const PRODUCTION_FEES: [(AssetKey, Uint); 2] = [(BTC, Uint::bps(25)), (LINK, Uint::bps(40))];

/// Programs linked against the shared math library
pub const LINKED_PROGRAMS: [ProgramKind; 3] = [
    ProgramKind::SystemSettings,
    ProgramKind::ExchangeRates,
    ProgramKind::SandboxAmm,
];

pub fn mainnet_config() -> SandboxConfig {
    let config = SandboxConfig::from_toml_str(MAINNET_TOML).unwrap();
    config.validate().unwrap();
    config
}

/// Mainnet configuration without any per-asset settings or feeds
pub fn minimal_config() -> SandboxConfig {
    let mut config = mainnet_config();
    config.price_feed_bindings.clear();
    let atomic = &mut config.atomic_settings;
    atomic.synth_equivalents.clear();
    atomic.exchange_fee_rates.clear();
    atomic.price_buffers.clear();
    atomic.vol_windows.clear();
    atomic.vol_thresholds.clear();
    config
}

/// Hardhat-style artifact JSON for `kind`
pub fn artifact_json(kind: ProgramKind) -> String {
    let placeholder = format!("__${}$__", "7f3c8a".repeat(6).get(..34).unwrap());
    let (bytecode, link_references) = if LINKED_PROGRAMS.contains(&kind) {
        (
            format!("0x608060405273{placeholder}6000f3"),
            serde_json::json!({
                "contracts/SafeDecimalMath.sol": {
                    (SHARED_MATH_LIBRARY): [{ "start": 6, "length": 20 }]
                }
            }),
        )
    } else {
        ("0x60806040526000f3".to_string(), serde_json::json!({}))
    };

    serde_json::json!({
        "contractName": kind.name(),
        "abi": [],
        "bytecode": bytecode,
        "linkReferences": link_references,
    })
    .to_string()
}

pub fn fixture_artifact(kind: ProgramKind) -> CompiledArtifact {
    CompiledArtifact::from_json(kind.name(), &artifact_json(kind)).unwrap()
}

pub fn fixture_artifacts() -> ArtifactSet {
    ArtifactSet::new(ProgramKind::ALL.map(|kind| (kind, fixture_artifact(kind)))).unwrap()
}

/// Write `<Kind>.json` for every kind into `dir`
pub fn write_fixture_artifacts(dir: &Path) {
    for kind in ProgramKind::ALL {
        std::fs::write(dir.join(format!("{}.json", kind.name())), artifact_json(kind)).unwrap();
    }
}

/// Rehearsal network for `config` plus a stranger account and production fees
pub fn network(config: &SandboxConfig) -> SimulatedNetwork {
    rehearsal_genesis(config)
        .account(STRANGER)
        .production_storage(
            config.production.fallback_settings_store,
            PRODUCTION_FEES
                .map(|(key, fee)| (names::SYSTEM_SETTINGS, exchange_fee_rate_record(key), fee)),
        )
        .build()
}
