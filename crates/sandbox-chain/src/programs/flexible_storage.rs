//! Settings storage
//!
//! Values are keyed by (owning contract name, record). The sandbox store
//! reads its own value when one was written and otherwise defers to the
//! production store, so production settings remain visible to sandbox
//! programs. Writes land locally and are accepted only from the program the
//! resolver currently registers under the owning contract name.

use super::resolver::resolve;
use super::{unsupported, ProgramModel, Revert, World};
use crate::abi::{Output, ProgramCall, SettingKey};
use sandbox_artifact::{Address, Bytes32, Uint};
use std::collections::BTreeMap;

type Slot = (Bytes32, SettingKey);

/// Overrideable store with a production fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageState {
    pub resolver: Address,
    pub fallback: Address,
    pub uints: BTreeMap<Slot, Uint>,
    pub addresses: BTreeMap<Slot, Address>,
}

impl StorageState {
    pub(crate) fn new(resolver: Address, fallback: Address) -> Self {
        Self {
            resolver,
            fallback,
            uints: BTreeMap::new(),
            addresses: BTreeMap::new(),
        }
    }
}

/// Production store: read-only values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyStorageState {
    pub uints: BTreeMap<Slot, Uint>,
    pub addresses: BTreeMap<Slot, Address>,
}

fn authorize(
    world: &mut World,
    this: Address,
    sender: Address,
    contract_name: Bytes32,
) -> Result<(), Revert> {
    let resolver = world.state::<StorageState>(this)?.resolver;
    let registered = resolve(world, this, resolver, contract_name)?;
    if !registered.is_zero() && registered == sender {
        Ok(())
    } else {
        Err(Revert::new("Can only be invoked by the configured contract"))
    }
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    match call {
        ProgramCall::GetUIntValue {
            contract_name,
            record,
        } => {
            let (local, fallback) = {
                let state = world.state::<StorageState>(this)?;
                (state.uints.get(&(contract_name, record)).copied(), state.fallback)
            };
            match local {
                Some(value) => Ok(Output::Uint(value)),
                None if fallback.is_zero() => Ok(Output::Uint(Uint::ZERO)),
                None => world.execute(
                    this,
                    fallback,
                    ProgramCall::GetUIntValue {
                        contract_name,
                        record,
                    },
                ),
            }
        }
        ProgramCall::GetAddressValue {
            contract_name,
            record,
        } => {
            let (local, fallback) = {
                let state = world.state::<StorageState>(this)?;
                (
                    state.addresses.get(&(contract_name, record)).copied(),
                    state.fallback,
                )
            };
            match local {
                Some(value) => Ok(Output::Address(value)),
                None if fallback.is_zero() => Ok(Output::Address(Address::ZERO)),
                None => world.execute(
                    this,
                    fallback,
                    ProgramCall::GetAddressValue {
                        contract_name,
                        record,
                    },
                ),
            }
        }
        ProgramCall::SetUIntValue {
            contract_name,
            record,
            value,
        } => {
            authorize(world, this, sender, contract_name)?;
            world
                .state_mut::<StorageState>(this)?
                .uints
                .insert((contract_name, record), value);
            Ok(Output::Empty)
        }
        ProgramCall::SetAddressValue {
            contract_name,
            record,
            value,
        } => {
            authorize(world, this, sender, contract_name)?;
            world
                .state_mut::<StorageState>(this)?
                .addresses
                .insert((contract_name, record), value);
            Ok(Output::Empty)
        }
        other => Err(unsupported(StorageState::LABEL, &other)),
    }
}

pub(super) fn execute_legacy(
    world: &mut World,
    this: Address,
    _sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    let state = world.state::<LegacyStorageState>(this)?;
    match call {
        ProgramCall::GetUIntValue {
            contract_name,
            record,
        } => Ok(Output::Uint(
            state
                .uints
                .get(&(contract_name, record))
                .copied()
                .unwrap_or_default(),
        )),
        ProgramCall::GetAddressValue {
            contract_name,
            record,
        } => Ok(Output::Address(
            state
                .addresses
                .get(&(contract_name, record))
                .copied()
                .unwrap_or_default(),
        )),
        other => Err(unsupported(LegacyStorageState::LABEL, &other)),
    }
}
