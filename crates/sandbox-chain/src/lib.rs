//! Sandbox Chain Access
//!
//! Everything the orchestrator needs to talk to a chain.
//!
//! # Core Concepts
//!
//! - [`Network`]: async seam for submitting transactions and reading state
//! - [`ProgramCall`] / [`Payload`]: call encoding carried opaquely by [`Call`]
//! - [`SimulatedNetwork`]: deterministic in-memory chain with models of the
//!   aggregator, resolvers, storage, settings, pricing and AMM programs
//! - [`ProgramClient`]: typed read helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use sandbox_chain::{Network, ProgramClient, SimulatedNetwork};
//!
//! let network = SimulatedNetwork::builder(1).account(owner).build();
//! let resolver = ProgramClient::new(&network, resolver_address);
//! let rates = resolver.get_address(names::EXCHANGE_RATES).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod abi;
mod client;
mod network;
pub mod programs;
mod simulated;

pub use abi::{
    exchange_fee_rate_record, names, AbiError, AtomicSetting, Call, ConstructorArg, Output, Payload,
    ProgramCall, ProgramKind, SettingKey,
};
pub use client::ProgramClient;
pub use network::{Network, NetworkError, Receipt, TransactionRequest, TxHash, TxKind, TxStatus};
pub use simulated::{create_address, GenesisBuilder, SimulatedNetwork};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
