//! In-memory rehearsal of a deployment
//!
//! Mirrors the production system a configuration points at, closely
//! enough for the whole pipeline to run: the fallback resolver, the
//! settings store, and placeholder code at every external address.

use crate::artifacts::SHARED_MATH_LIBRARY;
use crate::config::SandboxConfig;
use sandbox_chain::{names, GenesisBuilder, SimulatedNetwork};

/// Genesis mirroring the production side of `config`, owner unlocked
#[must_use]
pub fn rehearsal_genesis(config: &SandboxConfig) -> GenesisBuilder {
    let production = &config.production;
    let mut genesis = SimulatedNetwork::builder(config.chain_id)
        .account(config.owner)
        .production_resolver(
            production.fallback_resolver,
            [
                (names::ISSUER, production.fallback_issuer),
                (names::FLEXIBLE_STORAGE, production.fallback_settings_store),
            ],
        )
        .production_storage(production.fallback_settings_store, [])
        .marker(production.fallback_issuer, "Issuer")
        .marker(production.shared_math_library, SHARED_MATH_LIBRARY)
        .marker(config.dex_price_aggregator, "DexPriceAggregator");

    for (key, feed) in &config.price_feed_bindings {
        genesis = genesis.marker(*feed, format!("PriceFeed({key})"));
    }
    for (key, token) in &config.atomic_settings.synth_equivalents {
        genesis = genesis.marker(*token, format!("Equivalent({key})"));
    }
    genesis
}

/// Rehearsal network for `config`
#[must_use]
pub fn rehearsal_network(config: &SandboxConfig) -> SimulatedNetwork {
    rehearsal_genesis(config).build()
}
