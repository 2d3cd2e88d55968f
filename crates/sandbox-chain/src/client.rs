//! Typed read helpers over any [`Network`]

use crate::abi::{AtomicSetting, Output, ProgramCall};
use crate::network::{Network, NetworkError};
use sandbox_artifact::{Address, AssetKey, Bytes32, Uint};

/// Read-only view of one program
#[derive(Clone, Copy)]
pub struct ProgramClient<'a> {
    network: &'a dyn Network,
    address: Address,
}

impl<'a> ProgramClient<'a> {
    /// View the program at `address`
    #[must_use]
    pub fn new(network: &'a dyn Network, address: Address) -> Self {
        Self { network, address }
    }

    /// Program address
    #[inline]
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Issue a read-only call
    ///
    /// # Errors
    /// Returns error if the call reverts or the output cannot be decoded
    pub async fn query(&self, call: &ProgramCall) -> Result<Output, NetworkError> {
        let payload = call.encode()?;
        let raw = self.network.call(self.address, &payload).await?;
        Ok(Output::decode(&raw)?)
    }

    async fn address_of(&self, call: ProgramCall) -> Result<Address, NetworkError> {
        Ok(self.query(&call).await?.into_address()?)
    }

    /// Owner of an owned program
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn owner(&self) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::Owner).await
    }

    /// Resolver lookup
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn get_address(&self, name: Bytes32) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::GetAddress { name }).await
    }

    /// Whether a consumer's cache matches its resolver
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn is_resolver_cached(&self) -> Result<bool, NetworkError> {
        Ok(self.query(&ProgramCall::IsResolverCached).await?.into_bool()?)
    }

    /// Integer atomic setting
    ///
    /// # Errors
    /// Returns error if the call fails or the setting is an address
    pub async fn atomic_uint(&self, setting: AtomicSetting) -> Result<Uint, NetworkError> {
        Ok(self
            .query(&ProgramCall::AtomicSetting { setting })
            .await?
            .into_uint()?)
    }

    /// Address atomic setting (DEX pricing equivalents)
    ///
    /// # Errors
    /// Returns error if the call fails or the setting is an integer
    pub async fn atomic_address(&self, setting: AtomicSetting) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::AtomicSetting { setting }).await
    }

    /// Production exchange fee rate, as seen by the settings program
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn exchange_fee_rate(&self, currency_key: AssetKey) -> Result<Uint, NetworkError> {
        Ok(self
            .query(&ProgramCall::ExchangeFeeRate { currency_key })
            .await?
            .into_uint()?)
    }

    /// Configured DEX price aggregator
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn dex_price_aggregator(&self) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::DexPriceAggregator).await
    }

    /// Price feed bound to `currency_key`
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn aggregator(&self, currency_key: AssetKey) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::Aggregator { currency_key }).await
    }

    /// Pricing program the AMM resolved
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn exchange_rates(&self) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::ExchangeRates).await
    }

    /// Storage the AMM resolved
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn flexible_storage(&self) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::FlexibleStoragePublic).await
    }

    /// Issuer the AMM resolved
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn issuer(&self) -> Result<Address, NetworkError> {
        self.address_of(ProgramCall::Issuer).await
    }
}
