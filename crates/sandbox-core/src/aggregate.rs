//! Submission of the configuration batch
//!
//! The whole batch goes out as one transaction from the owner to the
//! multicall; either every call takes effect or none does.

use crate::configure::ConfigurationBatch;
use crate::error::AggregationError;
use sandbox_artifact::Address;
use sandbox_chain::{Network, ProgramCall, TransactionRequest, TxHash};
use serde::Serialize;
use tracing::{debug, error, info};

/// Outcome of a mined batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub calls: usize,
}

/// Run `batch` through the multicall at `multicall`
///
/// # Errors
/// - [`AggregationError::Reverted`] with the raw reason if any call failed
/// - [`AggregationError::Submission`] or [`AggregationError::Receipt`] on network failure
pub async fn aggregate(
    network: &dyn Network,
    owner: Address,
    multicall: Address,
    batch: &ConfigurationBatch,
) -> Result<AggregationReceipt, AggregationError> {
    for (i, entry) in batch.entries().iter().enumerate() {
        debug!(index = i, target = %entry.call.target, "{}", entry.description);
    }

    let payload = ProgramCall::Aggregate {
        calls: batch.calls(),
    }
    .encode()
    .map_err(|e| AggregationError::Build(e.into()))?;

    let tx_hash = network
        .submit(TransactionRequest::call(owner, multicall, payload))
        .await
        .map_err(AggregationError::Submission)?;
    info!(tx = %tx_hash, calls = batch.len(), "submitted configuration batch");

    let receipt = network
        .wait_for_receipt(tx_hash)
        .await
        .map_err(|source| AggregationError::Receipt { tx_hash, source })?;

    if let Some(reason) = receipt.revert_reason() {
        error!(tx = %tx_hash, reason, "configuration batch reverted");
        return Err(AggregationError::Reverted {
            tx_hash,
            reason: reason.to_string(),
        });
    }

    info!(tx = %tx_hash, block = receipt.block_number, "configuration applied");
    Ok(AggregationReceipt {
        tx_hash,
        block_number: receipt.block_number,
        calls: batch.len(),
    })
}
