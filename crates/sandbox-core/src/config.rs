//! Deployment configuration
//!
//! [`SandboxConfig`] is loaded from TOML and passed explicitly to every
//! stage. [`Environment`] carries the process environment the same way.

use crate::error::ConfigurationError;
use sandbox_artifact::{Address, AssetKey, Uint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Variable holding the RPC endpoint
pub const RPC_URL_VAR: &str = "SANDBOX_RPC_URL";

/// Variable holding the block explorer API key
pub const EXPLORER_API_KEY_VAR: &str = "SANDBOX_EXPLORER_API_KEY";

/// Addresses of the production system the sandbox extends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionSystem {
    /// Resolver consulted for names without an override
    pub fallback_resolver: Address,
    /// Settings store read for values the sandbox never wrote
    pub fallback_settings_store: Address,
    /// Issuer, resolved through the fallback
    pub fallback_issuer: Address,
    /// Shared math library linked into the settings, pricing and AMM programs
    pub shared_math_library: Address,
}

/// Atomic-exchange parameters applied in the configuration batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicSettings {
    pub max_volume: Uint,
    pub twap_window: Uint,
    #[serde(default)]
    pub synth_equivalents: BTreeMap<AssetKey, Address>,
    #[serde(default)]
    pub exchange_fee_rates: BTreeMap<AssetKey, Uint>,
    #[serde(default)]
    pub price_buffers: BTreeMap<AssetKey, Uint>,
    #[serde(default)]
    pub vol_windows: BTreeMap<AssetKey, Uint>,
    #[serde(default)]
    pub vol_thresholds: BTreeMap<AssetKey, Uint>,
}

/// Complete deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Network the deployment is meant for
    pub chain_id: u64,
    /// Owner of the multicall; the only account that can reconfigure
    pub owner: Address,
    /// Owner of the AMM, allowed to sweep its funds
    pub depositor: Address,
    pub dex_price_aggregator: Address,
    pub production: ProductionSystem,
    /// Asset key to external price feed
    #[serde(default)]
    pub price_feed_bindings: BTreeMap<AssetKey, Address>,
    pub atomic_settings: AtomicSettings,
}

impl SandboxConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(text)?)
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render back to TOML, for display
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_toml_string(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    /// Reject zero addresses where a real program or account is required
    ///
    /// # Errors
    /// Returns [`ConfigurationError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("owner", self.owner),
            ("depositor", self.depositor),
            ("dex_price_aggregator", self.dex_price_aggregator),
            ("production.fallback_resolver", self.production.fallback_resolver),
            ("production.fallback_settings_store", self.production.fallback_settings_store),
            ("production.fallback_issuer", self.production.fallback_issuer),
            ("production.shared_math_library", self.production.shared_math_library),
        ];
        for (field, address) in required {
            if address.is_zero() {
                return Err(ConfigurationError::Invalid(format!("{field} is the zero address")));
            }
        }

        for (key, feed) in &self.price_feed_bindings {
            if feed.is_zero() {
                return Err(ConfigurationError::Invalid(format!(
                    "price feed for {key} is the zero address"
                )));
            }
        }
        for (key, equivalent) in &self.atomic_settings.synth_equivalents {
            if equivalent.is_zero() {
                return Err(ConfigurationError::Invalid(format!(
                    "synth equivalent for {key} is the zero address"
                )));
            }
        }
        Ok(())
    }
}

/// Process environment relevant to a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub rpc_url: Option<String>,
    pub explorer_api_key: Option<String>,
}

impl Environment {
    /// Read from the process environment; empty values count as unset
    #[must_use]
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            rpc_url: read(RPC_URL_VAR),
            explorer_api_key: read(EXPLORER_API_KEY_VAR),
        }
    }

    /// With an explorer credential
    #[inline]
    #[must_use]
    pub fn with_explorer_api_key(mut self, key: impl Into<String>) -> Self {
        self.explorer_api_key = Some(key.into());
        self
    }

    /// With an RPC endpoint
    #[inline]
    #[must_use]
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }
}
