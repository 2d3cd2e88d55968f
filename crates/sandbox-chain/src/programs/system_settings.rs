//! Settings program
//!
//! Owner-gated setters validate their input and write through to the
//! flexible storage cached from the resolver; getters read it back. All
//! values live under the `SystemSettings` contract name, which is also how
//! pricing and the AMM read them.

use super::mixin::{self, Consumer, ResolverCache};
use super::{only_owner, unsupported, ProgramModel, Revert, World};
use crate::abi::{exchange_fee_rate_record, names, AtomicSetting, Output, ProgramCall, SettingKey};
use sandbox_artifact::{Address, Bytes32, Uint, ONE_IN_EIGHTEEN};

/// Shortest accepted TWAP / volatility window (1 minute)
pub const MIN_ATOMIC_WINDOW: u128 = 60;

/// Longest accepted TWAP / volatility window (1 day)
pub const MAX_ATOMIC_WINDOW: u128 = 86_400;

/// Highest accepted exchange fee rate (10%)
pub const MAX_EXCHANGE_FEE_RATE: u128 = ONE_IN_EIGHTEEN / 10;

const REQUIRED: [Bytes32; 1] = [names::FLEXIBLE_STORAGE];

/// Settings program state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub owner: Address,
    pub cache: ResolverCache,
}

impl SettingsState {
    pub(crate) fn new(owner: Address, resolver: Address) -> Self {
        Self {
            owner,
            cache: ResolverCache::new(resolver, &REQUIRED),
        }
    }
}

impl Consumer for SettingsState {
    fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ResolverCache {
        &mut self.cache
    }
}

fn storage_of<T: Consumer>(world: &World, this: Address) -> Result<Address, Revert> {
    world.state::<T>(this)?.cache().require(names::FLEXIBLE_STORAGE)
}

/// Read an atomic setting through the consumer's cached storage
pub(crate) fn read_setting<T: Consumer>(
    world: &mut World,
    this: Address,
    setting: AtomicSetting,
) -> Result<Output, Revert> {
    let storage = storage_of::<T>(world, this)?;
    let contract_name = names::SYSTEM_SETTINGS;
    let record = setting.record();
    let call = if setting.is_address() {
        ProgramCall::GetAddressValue {
            contract_name,
            record,
        }
    } else {
        ProgramCall::GetUIntValue {
            contract_name,
            record,
        }
    };
    world.execute(this, storage, call)
}

fn write_uint(world: &mut World, this: Address, record: SettingKey, value: Uint) -> Result<Output, Revert> {
    let storage = storage_of::<SettingsState>(world, this)?;
    world.execute(
        this,
        storage,
        ProgramCall::SetUIntValue {
            contract_name: names::SYSTEM_SETTINGS,
            record,
            value,
        },
    )?;
    Ok(Output::Empty)
}

fn check_window(value: Uint, what: &str) -> Result<(), Revert> {
    if value.get() < MIN_ATOMIC_WINDOW {
        return Err(Revert::new(format!("{what} under minimum 1 min")));
    }
    if value.get() > MAX_ATOMIC_WINDOW {
        return Err(Revert::new(format!("{what} exceed maximum 1 day")));
    }
    Ok(())
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    let owner = world.state::<SettingsState>(this)?.owner;
    match call {
        ProgramCall::Owner => Ok(Output::Address(owner)),
        ProgramCall::Resolver => mixin::resolver::<SettingsState>(world, this),
        ProgramCall::RebuildCache => mixin::rebuild_cache::<SettingsState>(world, this),
        ProgramCall::IsResolverCached => mixin::is_resolver_cached::<SettingsState>(world, this),
        ProgramCall::AtomicSetting { setting } => read_setting::<SettingsState>(world, this, setting),
        ProgramCall::ExchangeFeeRate { currency_key } => {
            let storage = storage_of::<SettingsState>(world, this)?;
            world.execute(
                this,
                storage,
                ProgramCall::GetUIntValue {
                    contract_name: names::SYSTEM_SETTINGS,
                    record: exchange_fee_rate_record(currency_key),
                },
            )
        }
        ProgramCall::SetAtomicMaxVolumePerBlock { max_volume } => {
            only_owner(owner, sender)?;
            write_uint(world, this, AtomicSetting::MaxVolumePerBlock.record(), max_volume)
        }
        ProgramCall::SetAtomicTwapWindow { window } => {
            only_owner(owner, sender)?;
            check_window(window, "Atomic twap window")?;
            write_uint(world, this, AtomicSetting::TwapWindow.record(), window)
        }
        ProgramCall::SetAtomicEquivalentForDexPricing {
            currency_key,
            equivalent,
        } => {
            only_owner(owner, sender)?;
            if equivalent.is_zero() {
                return Err(Revert::new("Atomic equivalent is 0 address"));
            }
            let storage = storage_of::<SettingsState>(world, this)?;
            world.execute(
                this,
                storage,
                ProgramCall::SetAddressValue {
                    contract_name: names::SYSTEM_SETTINGS,
                    record: AtomicSetting::EquivalentForDexPricing(currency_key).record(),
                    value: equivalent,
                },
            )?;
            Ok(Output::Empty)
        }
        ProgramCall::SetAtomicExchangeFeeRate {
            currency_key,
            exchange_fee_rate,
        } => {
            only_owner(owner, sender)?;
            if exchange_fee_rate.get() > MAX_EXCHANGE_FEE_RATE {
                return Err(Revert::new("MAX_EXCHANGE_FEE_RATE exceeded"));
            }
            let record = AtomicSetting::ExchangeFeeRate(currency_key).record();
            write_uint(world, this, record, exchange_fee_rate)
        }
        ProgramCall::SetAtomicPriceBuffer {
            currency_key,
            buffer,
        } => {
            only_owner(owner, sender)?;
            write_uint(world, this, AtomicSetting::PriceBuffer(currency_key).record(), buffer)
        }
        ProgramCall::SetAtomicVolatilityConsiderationWindow {
            currency_key,
            window,
        } => {
            only_owner(owner, sender)?;
            // zero disables the volatility check
            if window != Uint::ZERO {
                check_window(window, "Atomic volatility consideration window")?;
            }
            let record = AtomicSetting::VolatilityConsiderationWindow(currency_key).record();
            write_uint(world, this, record, window)
        }
        ProgramCall::SetAtomicVolatilityUpdateThreshold {
            currency_key,
            threshold,
        } => {
            only_owner(owner, sender)?;
            let record = AtomicSetting::VolatilityUpdateThreshold(currency_key).record();
            write_uint(world, this, record, threshold)
        }
        other => Err(unsupported(SettingsState::LABEL, &other)),
    }
}
