//! Name to address registries
//!
//! [`ResolverState`] is the sandbox's overrideable resolver: a local
//! override map consulted first, then the fallback resolver. Writing the
//! zero address for a name removes its override. [`LegacyResolverState`]
//! models the production registry the sandbox falls back to.

use super::{only_owner, unsupported, ProgramModel, Revert, World};
use crate::abi::{Output, ProgramCall};
use sandbox_artifact::{Address, Bytes32};
use std::collections::BTreeMap;

/// Overrideable resolver with a fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverState {
    pub owner: Address,
    pub fallback: Address,
    pub overrides: BTreeMap<Bytes32, Address>,
}

impl ResolverState {
    pub(crate) fn new(owner: Address, fallback: Address) -> Self {
        Self {
            owner,
            fallback,
            overrides: BTreeMap::new(),
        }
    }
}

/// Production registry: fixed entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyResolverState {
    pub entries: BTreeMap<Bytes32, Address>,
}

/// Resolve `name` through the resolver at `resolver`, calling as `sender`
pub(crate) fn resolve(
    world: &mut World,
    sender: Address,
    resolver: Address,
    name: Bytes32,
) -> Result<Address, Revert> {
    if resolver.is_zero() {
        return Ok(Address::ZERO);
    }
    world
        .execute(sender, resolver, ProgramCall::GetAddress { name })?
        .into_address()
        .map_err(|e| Revert::new(e.to_string()))
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    match call {
        ProgramCall::Owner => Ok(Output::Address(world.state::<ResolverState>(this)?.owner)),
        ProgramCall::OverrideAddresses { names, destinations } => {
            let state = world.state_mut::<ResolverState>(this)?;
            only_owner(state.owner, sender)?;
            if names.len() != destinations.len() {
                return Err(Revert::new("Input lengths must match"));
            }
            for (name, destination) in names.into_iter().zip(destinations) {
                if destination.is_zero() {
                    state.overrides.remove(&name);
                } else {
                    state.overrides.insert(name, destination);
                }
            }
            Ok(Output::Empty)
        }
        ProgramCall::GetAddress { name } => {
            let (local, fallback) = {
                let state = world.state::<ResolverState>(this)?;
                (state.overrides.get(&name).copied(), state.fallback)
            };
            let resolved = match local {
                Some(addr) => addr,
                None => resolve(world, this, fallback, name)?,
            };
            Ok(Output::Address(resolved))
        }
        ProgramCall::RebuildCaches { destinations } => {
            for destination in destinations {
                world.execute(this, destination, ProgramCall::RebuildCache)?;
            }
            Ok(Output::Empty)
        }
        other => Err(unsupported(ResolverState::LABEL, &other)),
    }
}

pub(super) fn execute_legacy(
    world: &mut World,
    this: Address,
    _sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    let state = world.state::<LegacyResolverState>(this)?;
    match call {
        ProgramCall::GetAddress { name } => Ok(Output::Address(
            state.entries.get(&name).copied().unwrap_or(Address::ZERO),
        )),
        other => Err(unsupported(LegacyResolverState::LABEL, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::ProgramState;

    const RATES: Bytes32 = Bytes32::from_static("ExchangeRates");

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn world() -> World {
        let mut world = World::new();
        let mut legacy = LegacyResolverState::default();
        legacy.entries.insert(RATES, addr(0xaa));
        world.install(addr(1), ProgramState::LegacyResolver(legacy));
        world.install(addr(2), ProgramState::Resolver(ResolverState::new(addr(3), addr(1))));
        world
    }

    fn get(world: &mut World, name: Bytes32) -> Address {
        resolve(world, addr(9), addr(2), name).unwrap()
    }

    #[test]
    fn falls_back_without_override() {
        let mut world = world();
        assert_eq!(get(&mut world, RATES), addr(0xaa));
        assert_eq!(get(&mut world, Bytes32::from_static("Unknown")), Address::ZERO);
    }

    #[test]
    fn override_wins_and_zero_clears() {
        let mut world = world();
        let set = |dest| ProgramCall::OverrideAddresses {
            names: vec![RATES],
            destinations: vec![dest],
        };
        world.execute(addr(3), addr(2), set(addr(0xbb))).unwrap();
        assert_eq!(get(&mut world, RATES), addr(0xbb));

        world.execute(addr(3), addr(2), set(Address::ZERO)).unwrap();
        assert_eq!(get(&mut world, RATES), addr(0xaa));
    }

    #[test]
    fn override_is_owner_only() {
        let mut world = world();
        let err = world
            .execute(
                addr(4),
                addr(2),
                ProgramCall::OverrideAddresses {
                    names: vec![RATES],
                    destinations: vec![addr(5)],
                },
            )
            .unwrap_err();
        assert_eq!(err.reason(), "Only the contract owner may perform this action");
    }

    #[test]
    fn override_lengths_must_match() {
        let mut world = world();
        let err = world
            .execute(
                addr(3),
                addr(2),
                ProgramCall::OverrideAddresses {
                    names: vec![RATES],
                    destinations: vec![],
                },
            )
            .unwrap_err();
        assert_eq!(err.reason(), "Input lengths must match");
    }
}
