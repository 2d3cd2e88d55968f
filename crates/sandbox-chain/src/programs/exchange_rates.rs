//! Pricing program
//!
//! Holds the external price-feed bindings and the DEX price aggregator, and
//! reads the pricing-related atomic settings through its cached storage.
//! Price computation itself is not modelled.

use super::mixin::{self, Consumer, ResolverCache};
use super::system_settings::read_setting;
use super::{only_owner, unsupported, ProgramModel, Revert, World};
use crate::abi::{names, AtomicSetting, Output, ProgramCall};
use sandbox_artifact::{Address, AssetKey, Bytes32, Uint};
use std::collections::BTreeMap;

const REQUIRED: [Bytes32; 1] = [names::FLEXIBLE_STORAGE];

/// Pricing program state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRatesState {
    pub owner: Address,
    pub oracle: Address,
    pub cache: ResolverCache,
    pub dex_price_aggregator: Address,
    pub aggregators: BTreeMap<AssetKey, Address>,
    pub rates: BTreeMap<AssetKey, Uint>,
}

impl ExchangeRatesState {
    pub(crate) fn new(
        owner: Address,
        oracle: Address,
        resolver: Address,
        currency_keys: &[AssetKey],
        rates: &[Uint],
    ) -> Result<Self, Revert> {
        if currency_keys.len() != rates.len() {
            return Err(Revert::new("Currency key length and rate length must match."));
        }
        Ok(Self {
            owner,
            oracle,
            cache: ResolverCache::new(resolver, &REQUIRED),
            dex_price_aggregator: Address::ZERO,
            aggregators: BTreeMap::new(),
            rates: currency_keys.iter().copied().zip(rates.iter().copied()).collect(),
        })
    }
}

impl Consumer for ExchangeRatesState {
    fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ResolverCache {
        &mut self.cache
    }
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    let owner = world.state::<ExchangeRatesState>(this)?.owner;
    match call {
        ProgramCall::Owner => Ok(Output::Address(owner)),
        ProgramCall::Resolver => mixin::resolver::<ExchangeRatesState>(world, this),
        ProgramCall::RebuildCache => mixin::rebuild_cache::<ExchangeRatesState>(world, this),
        ProgramCall::IsResolverCached => mixin::is_resolver_cached::<ExchangeRatesState>(world, this),
        ProgramCall::SetDexPriceAggregator { aggregator } => {
            only_owner(owner, sender)?;
            world.state_mut::<ExchangeRatesState>(this)?.dex_price_aggregator = aggregator;
            Ok(Output::Empty)
        }
        ProgramCall::DexPriceAggregator => Ok(Output::Address(
            world.state::<ExchangeRatesState>(this)?.dex_price_aggregator,
        )),
        ProgramCall::AddAggregator {
            currency_key,
            aggregator,
        } => {
            only_owner(owner, sender)?;
            if !world.has_program(aggregator) {
                return Err(Revert::new("Given Aggregator is invalid"));
            }
            world
                .state_mut::<ExchangeRatesState>(this)?
                .aggregators
                .insert(currency_key, aggregator);
            Ok(Output::Empty)
        }
        ProgramCall::Aggregator { currency_key } => Ok(Output::Address(
            world
                .state::<ExchangeRatesState>(this)?
                .aggregators
                .get(&currency_key)
                .copied()
                .unwrap_or(Address::ZERO),
        )),
        ProgramCall::AtomicSetting { setting } => match setting {
            AtomicSetting::MaxVolumePerBlock | AtomicSetting::ExchangeFeeRate(_) => Err(unsupported(
                ExchangeRatesState::LABEL,
                &ProgramCall::AtomicSetting { setting },
            )),
            _ => read_setting::<ExchangeRatesState>(world, this, setting),
        },
        other => Err(unsupported(ExchangeRatesState::LABEL, &other)),
    }
}
