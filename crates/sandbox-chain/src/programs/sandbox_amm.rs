//! Consumer AMM
//!
//! Only the wiring is modelled: which pricing, storage and issuer programs
//! it resolved, and the atomic settings it reads.

use super::mixin::{self, Consumer, ResolverCache};
use super::system_settings::read_setting;
use super::{unsupported, ProgramModel, Revert, World};
use crate::abi::{names, Output, ProgramCall};
use sandbox_artifact::{Address, Bytes32};

const REQUIRED: [Bytes32; 3] = [names::EXCHANGE_RATES, names::FLEXIBLE_STORAGE, names::ISSUER];

/// AMM state; `owner` is the depositor allowed to sweep funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmState {
    pub owner: Address,
    pub cache: ResolverCache,
}

impl AmmState {
    pub(crate) fn new(owner: Address, resolver: Address) -> Self {
        Self {
            owner,
            cache: ResolverCache::new(resolver, &REQUIRED),
        }
    }
}

impl Consumer for AmmState {
    fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ResolverCache {
        &mut self.cache
    }
}

fn cached(world: &World, this: Address, name: Bytes32) -> Result<Output, Revert> {
    world
        .state::<AmmState>(this)?
        .cache
        .require(name)
        .map(Output::Address)
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    _sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    match call {
        ProgramCall::Owner => Ok(Output::Address(world.state::<AmmState>(this)?.owner)),
        ProgramCall::Resolver => mixin::resolver::<AmmState>(world, this),
        ProgramCall::RebuildCache => mixin::rebuild_cache::<AmmState>(world, this),
        ProgramCall::IsResolverCached => mixin::is_resolver_cached::<AmmState>(world, this),
        ProgramCall::ExchangeRates => cached(world, this, names::EXCHANGE_RATES),
        ProgramCall::FlexibleStoragePublic => cached(world, this, names::FLEXIBLE_STORAGE),
        ProgramCall::Issuer => cached(world, this, names::ISSUER),
        ProgramCall::AtomicSetting { setting } => read_setting::<AmmState>(world, this, setting),
        other => Err(unsupported(AmmState::LABEL, &other)),
    }
}
