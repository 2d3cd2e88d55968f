//! Configuration batch builder
//!
//! Turns the configuration and the confirmed programs into the ordered list
//! of calls the multicall executes atomically. No I/O happens here.
//!
//! # Order
//!
//! 1. resolver overrides for pricing, storage and settings
//! 2. cache rebuild of every consumer
//! 3. DEX price aggregator, then one price feed per asset
//! 4. global atomic settings, then per-asset settings grouped by type

use crate::config::SandboxConfig;
use crate::error::BuildError;
use crate::sequencer::DeployedSystem;
use sandbox_artifact::{Address, AssetKey, Uint};
use sandbox_chain::{Call, ProgramCall, ProgramKind};
use std::fmt::{self, Display, Formatter};

/// Programs whose resolver entry the sandbox overrides
pub const OVERRIDDEN: [ProgramKind; 3] = [
    ProgramKind::ExchangeRates,
    ProgramKind::FlexibleStorage,
    ProgramKind::SystemSettings,
];

/// Consumers whose cache is rebuilt after the overrides
pub const CONSUMERS: [ProgramKind; 3] = [
    ProgramKind::ExchangeRates,
    ProgramKind::SandboxAmm,
    ProgramKind::SystemSettings,
];

/// One step of the configuration, independent of deployed addresses
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    OverrideAddresses,
    RebuildCaches,
    DexPriceAggregator(Address),
    AddAggregator(AssetKey, Address),
    MaxVolume(Uint),
    TwapWindow(Uint),
    Equivalent(AssetKey, Address),
    ExchangeFeeRate(AssetKey, Uint),
    PriceBuffer(AssetKey, Uint),
    VolatilityWindow(AssetKey, Uint),
    VolatilityThreshold(AssetKey, Uint),
}

fn steps(config: &SandboxConfig) -> Vec<Step> {
    let atomic = &config.atomic_settings;
    let mut steps = vec![
        Step::OverrideAddresses,
        Step::RebuildCaches,
        Step::DexPriceAggregator(config.dex_price_aggregator),
    ];
    steps.extend(
        config
            .price_feed_bindings
            .iter()
            .map(|(key, feed)| Step::AddAggregator(*key, *feed)),
    );
    steps.push(Step::MaxVolume(atomic.max_volume));
    steps.push(Step::TwapWindow(atomic.twap_window));
    steps.extend(atomic.synth_equivalents.iter().map(|(k, v)| Step::Equivalent(*k, *v)));
    steps.extend(atomic.exchange_fee_rates.iter().map(|(k, v)| Step::ExchangeFeeRate(*k, *v)));
    steps.extend(atomic.price_buffers.iter().map(|(k, v)| Step::PriceBuffer(*k, *v)));
    steps.extend(atomic.vol_windows.iter().map(|(k, v)| Step::VolatilityWindow(*k, *v)));
    steps.extend(atomic.vol_thresholds.iter().map(|(k, v)| Step::VolatilityThreshold(*k, *v)));
    steps
}

fn require(system: &DeployedSystem, kind: ProgramKind) -> Result<Address, BuildError> {
    system.address(kind).ok_or(BuildError::MissingProgram(kind))
}

impl Step {
    fn target(&self) -> ProgramKind {
        match self {
            Self::OverrideAddresses | Self::RebuildCaches => ProgramKind::AddressResolver,
            Self::DexPriceAggregator(_) | Self::AddAggregator(..) => ProgramKind::ExchangeRates,
            _ => ProgramKind::SystemSettings,
        }
    }

    fn call(&self, system: &DeployedSystem) -> Result<ProgramCall, BuildError> {
        Ok(match *self {
            Self::OverrideAddresses => {
                let mut names = Vec::with_capacity(OVERRIDDEN.len());
                let mut destinations = Vec::with_capacity(OVERRIDDEN.len());
                for kind in OVERRIDDEN {
                    if let Some(name) = kind.resolver_name() {
                        names.push(name);
                        destinations.push(require(system, kind)?);
                    }
                }
                ProgramCall::OverrideAddresses {
                    names,
                    destinations,
                }
            }
            Self::RebuildCaches => ProgramCall::RebuildCaches {
                destinations: CONSUMERS
                    .into_iter()
                    .map(|kind| require(system, kind))
                    .collect::<Result<_, _>>()?,
            },
            Self::DexPriceAggregator(aggregator) => ProgramCall::SetDexPriceAggregator { aggregator },
            Self::AddAggregator(currency_key, aggregator) => ProgramCall::AddAggregator {
                currency_key,
                aggregator,
            },
            Self::MaxVolume(max_volume) => ProgramCall::SetAtomicMaxVolumePerBlock { max_volume },
            Self::TwapWindow(window) => ProgramCall::SetAtomicTwapWindow { window },
            Self::Equivalent(currency_key, equivalent) => {
                ProgramCall::SetAtomicEquivalentForDexPricing {
                    currency_key,
                    equivalent,
                }
            }
            Self::ExchangeFeeRate(currency_key, exchange_fee_rate) => {
                ProgramCall::SetAtomicExchangeFeeRate {
                    currency_key,
                    exchange_fee_rate,
                }
            }
            Self::PriceBuffer(currency_key, buffer) => ProgramCall::SetAtomicPriceBuffer {
                currency_key,
                buffer,
            },
            Self::VolatilityWindow(currency_key, window) => {
                ProgramCall::SetAtomicVolatilityConsiderationWindow {
                    currency_key,
                    window,
                }
            }
            Self::VolatilityThreshold(currency_key, threshold) => {
                ProgramCall::SetAtomicVolatilityUpdateThreshold {
                    currency_key,
                    threshold,
                }
            }
        })
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.target())?;
        match self {
            Self::OverrideAddresses => {
                let names: Vec<_> = OVERRIDDEN.iter().map(|k| k.name()).collect();
                write!(f, "overrideAddresses({})", names.join(", "))
            }
            Self::RebuildCaches => {
                let names: Vec<_> = CONSUMERS.iter().map(|k| k.name()).collect();
                write!(f, "rebuildCaches({})", names.join(", "))
            }
            Self::DexPriceAggregator(a) => write!(f, "setDexPriceAggregator({a})"),
            Self::AddAggregator(k, a) => write!(f, "addAggregator({k}, {a})"),
            Self::MaxVolume(v) => write!(f, "setAtomicMaxVolumePerBlock({v})"),
            Self::TwapWindow(v) => write!(f, "setAtomicTwapWindow({v})"),
            Self::Equivalent(k, a) => write!(f, "setAtomicEquivalentForDexPricing({k}, {a})"),
            Self::ExchangeFeeRate(k, v) => write!(f, "setAtomicExchangeFeeRate({k}, {v})"),
            Self::PriceBuffer(k, v) => write!(f, "setAtomicPriceBuffer({k}, {v})"),
            Self::VolatilityWindow(k, v) => {
                write!(f, "setAtomicVolatilityConsiderationWindow({k}, {v})")
            }
            Self::VolatilityThreshold(k, v) => {
                write!(f, "setAtomicVolatilityUpdateThreshold({k}, {v})")
            }
        }
    }
}

/// A call plus what it does, for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationEntry {
    pub description: String,
    pub call: Call,
}

/// Ordered calls for the multicall
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationBatch {
    entries: Vec<ConfigurationEntry>,
}

impl ConfigurationBatch {
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ConfigurationEntry] {
        &self.entries
    }

    /// Calls in execution order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.entries.iter().map(|e| e.call.clone()).collect()
    }

    /// Decoded call `index`, mostly for inspection
    #[must_use]
    pub fn decoded(&self, index: usize) -> Option<ProgramCall> {
        let entry = self.entries.get(index)?;
        ProgramCall::decode(&entry.call.payload).ok()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the configuration batch
///
/// # Errors
/// - [`BuildError::MissingProgram`] if a needed program is not in `system`
/// - [`BuildError::Encode`] if a call cannot be encoded
pub fn build_configuration(
    config: &SandboxConfig,
    system: &DeployedSystem,
) -> Result<ConfigurationBatch, BuildError> {
    let mut entries = Vec::new();
    for step in steps(config) {
        let target = require(system, step.target())?;
        let call = Call::encode(target, &step.call(system)?)?;
        entries.push(ConfigurationEntry {
            description: step.to_string(),
            call,
        });
    }
    Ok(ConfigurationBatch { entries })
}

/// Describe the batch [`build_configuration`] would produce, without addresses
#[must_use]
pub fn outline(config: &SandboxConfig) -> Vec<String> {
    steps(config).iter().map(ToString::to_string).collect()
}
