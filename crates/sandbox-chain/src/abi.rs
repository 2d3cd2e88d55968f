//! Program interface
//!
//! Calls travel as opaque [`Payload`] bytes. The builder encodes a
//! [`ProgramCall`] into a payload; the aggregator and the network carry it
//! unchanged; the program decodes it on arrival. The encoding is JSON, which
//! keeps payloads readable in logs and dry-run output.

use sandbox_artifact::{Address, AssetKey, Bytes32, Uint};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Opaque call data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap raw bytes
    #[inline]
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload size
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl serde::de::Visitor<'_> for PayloadVisitor {
            type Value = Payload;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("0x-prefixed hex call data")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let digits = value.strip_prefix("0x").unwrap_or(value);
                hex::decode(digits)
                    .map(Payload)
                    .map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(PayloadVisitor)
    }
}

/// A single call: target program plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub payload: Payload,
}

impl Call {
    /// Encode `call` for `target`
    ///
    /// # Errors
    /// Returns error if the call cannot be encoded
    pub fn encode(target: Address, call: &ProgramCall) -> Result<Self, AbiError> {
        Ok(Self {
            target,
            payload: call.encode()?,
        })
    }
}

/// The programs the orchestrator deploys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgramKind {
    OwnedMulticall,
    AddressResolver,
    FlexibleStorage,
    SystemSettings,
    ExchangeRates,
    SandboxAmm,
}

impl ProgramKind {
    /// Every deployable kind, in deployment order
    pub const ALL: [Self; 6] = [
        Self::OwnedMulticall,
        Self::AddressResolver,
        Self::FlexibleStorage,
        Self::SystemSettings,
        Self::ExchangeRates,
        Self::SandboxAmm,
    ];

    /// Artifact / display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OwnedMulticall => "OwnedMulticall",
            Self::AddressResolver => "AddressResolver",
            Self::FlexibleStorage => "FlexibleStorage",
            Self::SystemSettings => "SystemSettings",
            Self::ExchangeRates => "ExchangeRates",
            Self::SandboxAmm => "SandboxAmm",
        }
    }

    /// Name the program is registered under in the resolver, if overridden
    #[must_use]
    pub const fn resolver_name(self) -> Option<Bytes32> {
        match self {
            Self::FlexibleStorage => Some(names::FLEXIBLE_STORAGE),
            Self::SystemSettings => Some(names::SYSTEM_SETTINGS),
            Self::ExchangeRates => Some(names::EXCHANGE_RATES),
            _ => None,
        }
    }
}

impl Display for ProgramKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProgramKind {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| AbiError::UnknownProgram(s.to_string()))
    }
}

/// Well-known resolver names
pub mod names {
    use sandbox_artifact::Bytes32;

    pub const EXCHANGE_RATES: Bytes32 = Bytes32::from_static("ExchangeRates");
    pub const FLEXIBLE_STORAGE: Bytes32 = Bytes32::from_static("FlexibleStorage");
    pub const SYSTEM_SETTINGS: Bytes32 = Bytes32::from_static("SystemSettings");
    pub const ISSUER: Bytes32 = Bytes32::from_static("Issuer");
}

/// A resolved constructor argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstructorArg {
    Address(Address),
    AddressList(Vec<Address>),
    Bytes32List(Vec<Bytes32>),
    UintList(Vec<Uint>),
}

impl ConstructorArg {
    /// The address, if this is a single address argument
    #[inline]
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }
}

impl Display for ConstructorArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            Self::Address(addr) => write!(f, "{addr}"),
            Self::AddressList(items) => list(f, items),
            Self::Bytes32List(items) => list(f, items),
            Self::UintList(items) => list(f, items),
        }
    }
}

/// A storage record: setting name plus optional per-asset key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettingKey {
    pub name: Bytes32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetKey>,
}

impl SettingKey {
    /// Global setting
    #[must_use]
    pub const fn global(name: Bytes32) -> Self {
        Self { name, asset: None }
    }

    /// Per-asset setting
    #[must_use]
    pub const fn for_asset(name: Bytes32, asset: AssetKey) -> Self {
        Self {
            name,
            asset: Some(asset),
        }
    }
}

impl Display for SettingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.asset {
            Some(asset) => write!(f, "{}[{asset}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Atomic-exchange settings stored by the settings program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "setting", content = "currency_key", rename_all = "camelCase")]
pub enum AtomicSetting {
    MaxVolumePerBlock,
    TwapWindow,
    EquivalentForDexPricing(AssetKey),
    ExchangeFeeRate(AssetKey),
    PriceBuffer(AssetKey),
    VolatilityConsiderationWindow(AssetKey),
    VolatilityUpdateThreshold(AssetKey),
}

impl AtomicSetting {
    /// Storage record for this setting
    #[must_use]
    pub const fn record(self) -> SettingKey {
        match self {
            Self::MaxVolumePerBlock => {
                SettingKey::global(Bytes32::from_static("atomicMaxVolumePerBlock"))
            }
            Self::TwapWindow => SettingKey::global(Bytes32::from_static("atomicTwapWindow")),
            Self::EquivalentForDexPricing(key) => {
                SettingKey::for_asset(Bytes32::from_static("atomicEquivalentForDexPricing"), key)
            }
            Self::ExchangeFeeRate(key) => {
                SettingKey::for_asset(Bytes32::from_static("atomicExchangeFeeRate"), key)
            }
            Self::PriceBuffer(key) => {
                SettingKey::for_asset(Bytes32::from_static("atomicPriceBuffer"), key)
            }
            Self::VolatilityConsiderationWindow(key) => {
                SettingKey::for_asset(Bytes32::from_static("atomicVolConsiderationWindow"), key)
            }
            Self::VolatilityUpdateThreshold(key) => {
                SettingKey::for_asset(Bytes32::from_static("atomicVolUpdateThreshold"), key)
            }
        }
    }

    /// Whether the value is an address rather than an integer
    #[inline]
    #[must_use]
    pub const fn is_address(self) -> bool {
        matches!(self, Self::EquivalentForDexPricing(_))
    }
}

/// Record holding the production (non-atomic) exchange fee rate
#[must_use]
pub const fn exchange_fee_rate_record(key: AssetKey) -> SettingKey {
    SettingKey::for_asset(Bytes32::from_static("exchangeFeeRate"), key)
}

/// Every method the hosted programs understand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "camelCase")]
pub enum ProgramCall {
    // Owned programs
    Owner,

    // OwnedMulticall
    Aggregate {
        calls: Vec<Call>,
    },

    // Resolvers
    OverrideAddresses {
        names: Vec<Bytes32>,
        destinations: Vec<Address>,
    },
    GetAddress {
        name: Bytes32,
    },
    RebuildCaches {
        destinations: Vec<Address>,
    },

    // Resolver consumers
    RebuildCache,
    IsResolverCached,
    Resolver,

    // Flexible storage
    GetUIntValue {
        contract_name: Bytes32,
        record: SettingKey,
    },
    SetUIntValue {
        contract_name: Bytes32,
        record: SettingKey,
        value: Uint,
    },
    GetAddressValue {
        contract_name: Bytes32,
        record: SettingKey,
    },
    SetAddressValue {
        contract_name: Bytes32,
        record: SettingKey,
        value: Address,
    },

    // System settings
    SetAtomicMaxVolumePerBlock {
        max_volume: Uint,
    },
    SetAtomicTwapWindow {
        window: Uint,
    },
    SetAtomicEquivalentForDexPricing {
        currency_key: AssetKey,
        equivalent: Address,
    },
    SetAtomicExchangeFeeRate {
        currency_key: AssetKey,
        exchange_fee_rate: Uint,
    },
    SetAtomicPriceBuffer {
        currency_key: AssetKey,
        buffer: Uint,
    },
    SetAtomicVolatilityConsiderationWindow {
        currency_key: AssetKey,
        window: Uint,
    },
    SetAtomicVolatilityUpdateThreshold {
        currency_key: AssetKey,
        threshold: Uint,
    },
    AtomicSetting {
        setting: AtomicSetting,
    },
    ExchangeFeeRate {
        currency_key: AssetKey,
    },

    // Exchange rates
    SetDexPriceAggregator {
        aggregator: Address,
    },
    DexPriceAggregator,
    AddAggregator {
        currency_key: AssetKey,
        aggregator: Address,
    },
    Aggregator {
        currency_key: AssetKey,
    },

    // Sandbox AMM
    ExchangeRates,
    FlexibleStoragePublic,
    Issuer,
}

impl ProgramCall {
    /// Encode into call data
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn encode(&self) -> Result<Payload, AbiError> {
        serde_json::to_vec(self)
            .map(Payload)
            .map_err(AbiError::Encode)
    }

    /// Decode call data
    ///
    /// # Errors
    /// Returns error if the payload is not a known method
    pub fn decode(payload: &Payload) -> Result<Self, AbiError> {
        serde_json::from_slice(payload.as_bytes()).map_err(AbiError::Decode)
    }

    /// Method name, for logs
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Aggregate { .. } => "aggregate",
            Self::OverrideAddresses { .. } => "overrideAddresses",
            Self::GetAddress { .. } => "getAddress",
            Self::RebuildCaches { .. } => "rebuildCaches",
            Self::RebuildCache => "rebuildCache",
            Self::IsResolverCached => "isResolverCached",
            Self::Resolver => "resolver",
            Self::GetUIntValue { .. } => "getUIntValue",
            Self::SetUIntValue { .. } => "setUIntValue",
            Self::GetAddressValue { .. } => "getAddressValue",
            Self::SetAddressValue { .. } => "setAddressValue",
            Self::SetAtomicMaxVolumePerBlock { .. } => "setAtomicMaxVolumePerBlock",
            Self::SetAtomicTwapWindow { .. } => "setAtomicTwapWindow",
            Self::SetAtomicEquivalentForDexPricing { .. } => "setAtomicEquivalentForDexPricing",
            Self::SetAtomicExchangeFeeRate { .. } => "setAtomicExchangeFeeRate",
            Self::SetAtomicPriceBuffer { .. } => "setAtomicPriceBuffer",
            Self::SetAtomicVolatilityConsiderationWindow { .. } => {
                "setAtomicVolatilityConsiderationWindow"
            }
            Self::SetAtomicVolatilityUpdateThreshold { .. } => "setAtomicVolatilityUpdateThreshold",
            Self::AtomicSetting { .. } => "atomicSetting",
            Self::ExchangeFeeRate { .. } => "exchangeFeeRate",
            Self::SetDexPriceAggregator { .. } => "setDexPriceAggregator",
            Self::DexPriceAggregator => "dexPriceAggregator",
            Self::AddAggregator { .. } => "addAggregator",
            Self::Aggregator { .. } => "aggregators",
            Self::ExchangeRates => "exchangeRates",
            Self::FlexibleStoragePublic => "flexibleStoragePublic",
            Self::Issuer => "issuer",
        }
    }
}

/// Return data of a program call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Output {
    Empty,
    Address(Address),
    Uint(Uint),
    Bool(bool),
    Results(Vec<Output>),
}

impl Output {
    /// Encode into return data
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn encode(&self) -> Result<Payload, AbiError> {
        serde_json::to_vec(self)
            .map(Payload)
            .map_err(AbiError::Encode)
    }

    /// Decode return data
    ///
    /// # Errors
    /// Returns error if the payload is not an encoded output
    pub fn decode(payload: &Payload) -> Result<Self, AbiError> {
        serde_json::from_slice(payload.as_bytes()).map_err(AbiError::Decode)
    }

    /// Expect an address
    ///
    /// # Errors
    /// Returns error for any other output shape
    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Self::Address(addr) => Ok(addr),
            other => Err(AbiError::UnexpectedOutput {
                expected: "address",
                found: other.shape(),
            }),
        }
    }

    /// Expect an integer
    ///
    /// # Errors
    /// Returns error for any other output shape
    pub fn into_uint(self) -> Result<Uint, AbiError> {
        match self {
            Self::Uint(value) => Ok(value),
            other => Err(AbiError::UnexpectedOutput {
                expected: "uint",
                found: other.shape(),
            }),
        }
    }

    /// Expect a boolean
    ///
    /// # Errors
    /// Returns error for any other output shape
    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Self::Bool(value) => Ok(value),
            other => Err(AbiError::UnexpectedOutput {
                expected: "bool",
                found: other.shape(),
            }),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Address(_) => "address",
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Results(_) => "results",
        }
    }
}

/// Interface encoding errors
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("failed to encode call: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("expected {expected} output, found {found}")]
    UnexpectedOutput {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown program kind: {0}")]
    UnknownProgram(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_call_unchanged() {
        let call = ProgramCall::SetAtomicTwapWindow {
            window: Uint(1800),
        };
        let encoded = Call::encode(Address::new([7; 20]), &call).unwrap();
        assert_eq!(ProgramCall::decode(&encoded.payload).unwrap(), call);
    }

    #[test]
    fn unknown_method_fails_to_decode() {
        let payload = Payload::new(br#"{"method":"selfDestruct"}"#.to_vec());
        assert!(matches!(ProgramCall::decode(&payload), Err(AbiError::Decode(_))));
    }

    #[test]
    fn payload_serializes_as_hex() {
        let json = serde_json::to_string(&Payload::new(vec![0xde, 0xad])).unwrap();
        assert_eq!(json, "\"0xdead\"");
    }

    #[test]
    fn program_kind_names_round_trip() {
        for kind in ProgramKind::ALL {
            assert_eq!(kind.name().parse::<ProgramKind>().unwrap(), kind);
        }
        assert!("Exchanger".parse::<ProgramKind>().is_err());
    }

    #[test]
    fn only_settings_consumers_are_overridden() {
        assert_eq!(ProgramKind::OwnedMulticall.resolver_name(), None);
        assert_eq!(ProgramKind::SandboxAmm.resolver_name(), None);
        assert_eq!(
            ProgramKind::ExchangeRates.resolver_name(),
            Some(names::EXCHANGE_RATES)
        );
    }

    #[test]
    fn per_asset_records_are_distinct() {
        let btc = Bytes32::from_static("sBTC");
        let eth = Bytes32::from_static("sETH");
        assert_ne!(
            AtomicSetting::PriceBuffer(btc).record(),
            AtomicSetting::PriceBuffer(eth).record()
        );
        assert_ne!(
            AtomicSetting::PriceBuffer(btc).record(),
            AtomicSetting::ExchangeFeeRate(btc).record()
        );
        assert_eq!(AtomicSetting::TwapWindow.record().asset, None);
    }

    #[test]
    fn output_shape_mismatch() {
        assert!(matches!(
            Output::Bool(true).into_address(),
            Err(AbiError::UnexpectedOutput { expected: "address", found: "bool" })
        ));
    }
}
