//! Resolver cache shared by consumer programs
//!
//! A consumer copies the addresses it depends on out of its resolver when
//! `rebuildCache` is called and keeps using those copies until the next
//! rebuild, even if the resolver changes in between.

use super::resolver::resolve;
use super::{ProgramModel, Revert, World};
use crate::abi::Output;
use sandbox_artifact::{Address, Bytes32};
use std::collections::BTreeMap;

/// Cached view of a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverCache {
    pub resolver: Address,
    pub required: Vec<Bytes32>,
    pub entries: BTreeMap<Bytes32, Address>,
}

impl ResolverCache {
    pub(crate) fn new(resolver: Address, required: &[Bytes32]) -> Self {
        Self {
            resolver,
            required: required.to_vec(),
            entries: BTreeMap::new(),
        }
    }

    /// Cached address for `name`, reverting when it was never cached
    pub(crate) fn require(&self, name: Bytes32) -> Result<Address, Revert> {
        self.entries
            .get(&name)
            .copied()
            .filter(|addr| !addr.is_zero())
            .ok_or_else(|| Revert::new(format!("Missing address: {name}")))
    }
}

/// Programs holding a [`ResolverCache`]
pub(crate) trait Consumer: ProgramModel {
    fn cache(&self) -> &ResolverCache;

    fn cache_mut(&mut self) -> &mut ResolverCache;
}

fn snapshot<T: Consumer>(world: &World, this: Address) -> Result<(Address, Vec<Bytes32>), Revert> {
    let cache = world.state::<T>(this)?.cache();
    Ok((cache.resolver, cache.required.clone()))
}

/// Re-read every required name; all must resolve to a non-zero address
pub(crate) fn rebuild_cache<T: Consumer>(world: &mut World, this: Address) -> Result<Output, Revert> {
    let (resolver, required) = snapshot::<T>(world, this)?;
    let mut fresh = BTreeMap::new();
    for name in required {
        let destination = resolve(world, this, resolver, name)?;
        if destination.is_zero() {
            return Err(Revert::new(format!("Resolver missing target: {name}")));
        }
        fresh.insert(name, destination);
    }
    world.state_mut::<T>(this)?.cache_mut().entries = fresh;
    Ok(Output::Empty)
}

/// Whether every cached entry still matches the resolver
pub(crate) fn is_resolver_cached<T: Consumer>(world: &mut World, this: Address) -> Result<Output, Revert> {
    let (resolver, required) = snapshot::<T>(world, this)?;
    for name in required {
        let live = resolve(world, this, resolver, name)?;
        let cached = world.state::<T>(this)?.cache().entries.get(&name).copied();
        if cached != Some(live) || live.is_zero() {
            return Ok(Output::Bool(false));
        }
    }
    Ok(Output::Bool(true))
}

/// Resolver address
pub(crate) fn resolver<T: Consumer>(world: &World, this: Address) -> Result<Output, Revert> {
    Ok(Output::Address(world.state::<T>(this)?.cache().resolver))
}
