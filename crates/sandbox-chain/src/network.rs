//! Network seam
//!
//! The orchestrator talks to a chain only through [`Network`]: submit a
//! transaction, wait for its receipt, make a read-only call, and ask which
//! chain and accounts are available. [`crate::SimulatedNetwork`] is the
//! in-process implementation.

use crate::abi::{AbiError, ConstructorArg, Payload, ProgramKind};
use sandbox_artifact::Address;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// A 32-byte transaction hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for TxHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// What a transaction does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    /// Create a program from linked bytecode
    ///
    /// `program` names the model a simulated chain instantiates; a live
    /// chain only needs the bytecode and encoded arguments.
    Deploy {
        program: ProgramKind,
        bytecode: Vec<u8>,
        constructor_args: Vec<ConstructorArg>,
    },
    /// Invoke a program
    Call { to: Address, payload: Payload },
}

/// A transaction to sign and submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub kind: TxKind,
}

impl TransactionRequest {
    /// Deployment transaction
    #[must_use]
    pub fn deploy(
        from: Address,
        program: ProgramKind,
        bytecode: Vec<u8>,
        constructor_args: Vec<ConstructorArg>,
    ) -> Self {
        Self {
            from,
            kind: TxKind::Deploy {
                program,
                bytecode,
                constructor_args,
            },
        }
    }

    /// Call transaction
    #[must_use]
    pub fn call(from: Address, to: Address, payload: Payload) -> Self {
        Self {
            from,
            kind: TxKind::Call { to, payload },
        }
    }
}

/// Execution outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Reverted(String),
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    /// Created program, for successful deployments
    pub contract_address: Option<Address>,
    pub block_number: u64,
}

impl Receipt {
    /// Whether the transaction succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, TxStatus::Success)
    }

    /// Revert reason, if the transaction reverted
    #[must_use]
    pub fn revert_reason(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Reverted(reason) => Some(reason),
            TxStatus::Success => None,
        }
    }
}

/// Chain access
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Chain identity
    async fn chain_id(&self) -> Result<u64, NetworkError>;

    /// Accounts this network can sign for
    async fn accounts(&self) -> Result<Vec<Address>, NetworkError>;

    /// Sign and submit a transaction; it is mined later
    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, NetworkError>;

    /// Wait until a submitted transaction is mined
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, NetworkError>;

    /// Read-only call against current state
    async fn call(&self, to: Address, payload: &Payload) -> Result<Payload, NetworkError>;
}

/// Errors talking to the network
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Sender is not controllable by this network
    #[error("account {0} is locked")]
    AccountLocked(Address),

    /// Hash was never submitted
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),

    /// Read-only call reverted
    #[error("call reverted: {0}")]
    CallReverted(String),

    /// Payload or return data could not be decoded
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Transport failure
    #[error("rpc error: {0}")]
    Rpc(String),
}
