//! Behavioural models of the hosted programs
//!
//! Only the deployment and configuration surface is modelled. Nested calls
//! re-enter [`World::execute`]; handlers copy what they need out of their
//! own state before calling out, so no borrow is held across a call.

mod exchange_rates;
mod flexible_storage;
mod mixin;
mod multicall;
mod resolver;
mod sandbox_amm;
mod system_settings;

pub use exchange_rates::ExchangeRatesState;
pub use flexible_storage::{LegacyStorageState, StorageState};
pub use mixin::ResolverCache;
pub use multicall::MulticallState;
pub use resolver::{LegacyResolverState, ResolverState};
pub use sandbox_amm::AmmState;
pub use system_settings::{SettingsState, MAX_ATOMIC_WINDOW, MAX_EXCHANGE_FEE_RATE, MIN_ATOMIC_WINDOW};

use crate::abi::{ConstructorArg, Output, ProgramCall, ProgramKind};
use sandbox_artifact::Address;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// A program-level revert with its reason string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revert(String);

impl Revert {
    /// Revert with a reason
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Reason string
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.0
    }

    /// Consume into the reason string
    #[inline]
    #[must_use]
    pub fn into_reason(self) -> String {
        self.0
    }
}

impl Display for Revert {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner-gated entry points share this check and message
pub(crate) fn only_owner(owner: Address, sender: Address) -> Result<(), Revert> {
    if owner == sender {
        Ok(())
    } else {
        Err(Revert::new("Only the contract owner may perform this action"))
    }
}

pub(crate) fn unsupported(label: &str, call: &ProgramCall) -> Revert {
    Revert::new(format!("{label}: unsupported method {}", call.method()))
}

/// State of one hosted program
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramState {
    Multicall(MulticallState),
    Resolver(ResolverState),
    LegacyResolver(LegacyResolverState),
    FlexibleStorage(StorageState),
    LegacyStorage(LegacyStorageState),
    SystemSettings(SettingsState),
    ExchangeRates(ExchangeRatesState),
    SandboxAmm(AmmState),
    /// Code with no modelled behaviour (libraries, feeds, tokens)
    Marker(String),
}

impl ProgramState {
    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Multicall(_) => "OwnedMulticall",
            Self::Resolver(_) => "AddressResolver",
            Self::LegacyResolver(_) => "ProductionAddressResolver",
            Self::FlexibleStorage(_) => "FlexibleStorage",
            Self::LegacyStorage(_) => "ProductionFlexibleStorage",
            Self::SystemSettings(_) => "SystemSettings",
            Self::ExchangeRates(_) => "ExchangeRates",
            Self::SandboxAmm(_) => "SandboxAmm",
            Self::Marker(label) => label,
        }
    }

    /// Instantiate a deployable program from its constructor arguments
    ///
    /// # Errors
    /// Reverts if the arguments do not match the constructor
    pub fn instantiate(kind: ProgramKind, args: &[ConstructorArg]) -> Result<Self, Revert> {
        let invalid = || Revert::new(format!("{kind}: invalid constructor arguments"));
        let expected = match kind {
            ProgramKind::OwnedMulticall => 1,
            ProgramKind::ExchangeRates => 5,
            _ => 2,
        };
        if args.len() != expected {
            return Err(invalid());
        }
        let addresses = |n: usize| -> Result<Vec<Address>, Revert> {
            args[..n]
                .iter()
                .map(|arg| arg.as_address().ok_or_else(invalid))
                .collect()
        };

        let state = match kind {
            ProgramKind::OwnedMulticall => {
                let a = addresses(1)?;
                Self::Multicall(MulticallState::new(a[0]))
            }
            ProgramKind::AddressResolver => {
                let a = addresses(2)?;
                Self::Resolver(ResolverState::new(a[0], a[1]))
            }
            ProgramKind::FlexibleStorage => {
                let a = addresses(2)?;
                Self::FlexibleStorage(StorageState::new(a[0], a[1]))
            }
            ProgramKind::SystemSettings => {
                let a = addresses(2)?;
                Self::SystemSettings(SettingsState::new(a[0], a[1]))
            }
            ProgramKind::ExchangeRates => {
                let a = addresses(3)?;
                let (keys, rates) = match args.get(3..) {
                    Some([ConstructorArg::Bytes32List(keys), ConstructorArg::UintList(rates)]) => {
                        (keys.clone(), rates.clone())
                    }
                    _ => return Err(invalid()),
                };
                Self::ExchangeRates(ExchangeRatesState::new(a[0], a[1], a[2], &keys, &rates)?)
            }
            ProgramKind::SandboxAmm => {
                let a = addresses(2)?;
                Self::SandboxAmm(AmmState::new(a[0], a[1]))
            }
        };

        Ok(state)
    }
}

/// Typed access to one variant of [`ProgramState`]
pub(crate) trait ProgramModel: Sized {
    const LABEL: &'static str;

    fn from_state(state: &ProgramState) -> Option<&Self>;

    fn from_state_mut(state: &mut ProgramState) -> Option<&mut Self>;
}

macro_rules! program_model {
    ($ty:ty, $variant:ident, $label:literal) => {
        impl ProgramModel for $ty {
            const LABEL: &'static str = $label;

            fn from_state(state: &ProgramState) -> Option<&Self> {
                match state {
                    ProgramState::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_state_mut(state: &mut ProgramState) -> Option<&mut Self> {
                match state {
                    ProgramState::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

program_model!(MulticallState, Multicall, "OwnedMulticall");
program_model!(ResolverState, Resolver, "AddressResolver");
program_model!(LegacyResolverState, LegacyResolver, "ProductionAddressResolver");
program_model!(StorageState, FlexibleStorage, "FlexibleStorage");
program_model!(LegacyStorageState, LegacyStorage, "ProductionFlexibleStorage");
program_model!(SettingsState, SystemSettings, "SystemSettings");
program_model!(ExchangeRatesState, ExchangeRates, "ExchangeRates");
program_model!(AmmState, SandboxAmm, "SandboxAmm");

type Handler = fn(&mut World, Address, Address, ProgramCall) -> Result<Output, Revert>;

/// All hosted programs, keyed by address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    programs: BTreeMap<Address, ProgramState>,
}

impl World {
    /// Empty world
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a program at an address, replacing whatever was there
    pub fn install(&mut self, at: Address, state: ProgramState) {
        self.programs.insert(at, state);
    }

    /// Whether any program lives at `at`
    #[inline]
    #[must_use]
    pub fn has_program(&self, at: Address) -> bool {
        self.programs.contains_key(&at)
    }

    /// Program state at `at`
    #[inline]
    #[must_use]
    pub fn program(&self, at: Address) -> Option<&ProgramState> {
        self.programs.get(&at)
    }

    pub(crate) fn state<T: ProgramModel>(&self, at: Address) -> Result<&T, Revert> {
        self.programs
            .get(&at)
            .and_then(T::from_state)
            .ok_or_else(|| Revert::new(format!("{at} is not a {}", T::LABEL)))
    }

    pub(crate) fn state_mut<T: ProgramModel>(&mut self, at: Address) -> Result<&mut T, Revert> {
        self.programs
            .get_mut(&at)
            .and_then(T::from_state_mut)
            .ok_or_else(|| Revert::new(format!("{at} is not a {}", T::LABEL)))
    }

    /// Execute `call` on the program at `to`, as `sender`
    ///
    /// Effects of a reverted call are not undone here; the caller restores
    /// its snapshot.
    ///
    /// # Errors
    /// Returns the revert raised by the program or any nested call
    pub fn execute(&mut self, sender: Address, to: Address, call: ProgramCall) -> Result<Output, Revert> {
        let handler: Handler = match self.programs.get(&to) {
            None => return Err(Revert::new(format!("call to {to}, which has no program"))),
            Some(ProgramState::Multicall(_)) => multicall::execute,
            Some(ProgramState::Resolver(_)) => resolver::execute,
            Some(ProgramState::LegacyResolver(_)) => resolver::execute_legacy,
            Some(ProgramState::FlexibleStorage(_)) => flexible_storage::execute,
            Some(ProgramState::LegacyStorage(_)) => flexible_storage::execute_legacy,
            Some(ProgramState::SystemSettings(_)) => system_settings::execute,
            Some(ProgramState::ExchangeRates(_)) => exchange_rates::execute,
            Some(ProgramState::SandboxAmm(_)) => sandbox_amm::execute,
            Some(ProgramState::Marker(label)) => return Err(unsupported(label, &call)),
        };
        handler(self, to, sender, call)
    }
}
