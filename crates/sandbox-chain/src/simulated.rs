//! In-memory chain
//!
//! [`SimulatedNetwork`] hosts the program models from [`crate::programs`]
//! behind the [`Network`] trait. Submitted transactions wait in a queue and
//! are mined one per block, strictly in submission order, when a receipt is
//! requested. Every transaction runs against a snapshot of the world and is
//! rolled back in full if it reverts.

use crate::abi::{Output, Payload, ProgramCall, ProgramKind, SettingKey};
use crate::network::{Network, NetworkError, Receipt, TransactionRequest, TxHash, TxKind, TxStatus};
use crate::programs::{LegacyResolverState, LegacyStorageState, ProgramState, World};
use parking_lot::Mutex;
use sandbox_artifact::{Address, Bytes32, Uint};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

#[derive(Debug)]
struct PendingTx {
    hash: TxHash,
    nonce: u64,
    request: TransactionRequest,
}

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    unlocked: BTreeSet<Address>,
    nonces: BTreeMap<Address, u64>,
    world: World,
    pending: VecDeque<PendingTx>,
    receipts: HashMap<TxHash, Receipt>,
    block_number: u64,
    failing_deployments: BTreeSet<ProgramKind>,
}

fn derive(tag: &[u8], from: Address, nonce: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(from.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Address of the program created by `from` at `nonce`
#[must_use]
pub fn create_address(from: Address, nonce: u64) -> Address {
    let digest = derive(b"create", from, nonce);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::new(bytes)
}

impl ChainState {
    fn mine_next(&mut self) -> Option<TxHash> {
        let tx = self.pending.pop_front()?;
        self.block_number += 1;
        let (status, contract_address) = self.apply(&tx);

        match &status {
            TxStatus::Success => tracing::debug!(tx = %tx.hash, block = self.block_number, "mined"),
            TxStatus::Reverted(reason) => {
                tracing::debug!(tx = %tx.hash, block = self.block_number, %reason, "reverted");
            }
        }

        self.receipts.insert(
            tx.hash,
            Receipt {
                tx_hash: tx.hash,
                status,
                contract_address,
                block_number: self.block_number,
            },
        );
        Some(tx.hash)
    }

    fn apply(&mut self, tx: &PendingTx) -> (TxStatus, Option<Address>) {
        match &tx.request.kind {
            TxKind::Deploy {
                program,
                bytecode,
                constructor_args,
            } => {
                if bytecode.is_empty() {
                    return (TxStatus::Reverted(format!("{program}: empty bytecode")), None);
                }
                if self.failing_deployments.contains(program) {
                    return (
                        TxStatus::Reverted(format!("{program}: deployment rejected")),
                        None,
                    );
                }
                match ProgramState::instantiate(*program, constructor_args) {
                    Ok(state) => {
                        let address = create_address(tx.request.from, tx.nonce);
                        self.world.install(address, state);
                        (TxStatus::Success, Some(address))
                    }
                    Err(revert) => (TxStatus::Reverted(revert.into_reason()), None),
                }
            }
            TxKind::Call { to, payload } => {
                let call = match ProgramCall::decode(payload) {
                    Ok(call) => call,
                    Err(e) => return (TxStatus::Reverted(e.to_string()), None),
                };
                let snapshot = self.world.clone();
                match self.world.execute(tx.request.from, *to, call) {
                    Ok(_) => (TxStatus::Success, None),
                    Err(revert) => {
                        self.world = snapshot;
                        (TxStatus::Reverted(revert.into_reason()), None)
                    }
                }
            }
        }
    }
}

/// Deterministic in-process chain
#[derive(Debug)]
pub struct SimulatedNetwork {
    state: Mutex<ChainState>,
}

impl SimulatedNetwork {
    /// Start describing the genesis state
    #[must_use]
    pub fn builder(chain_id: u64) -> GenesisBuilder {
        GenesisBuilder::new(chain_id)
    }

    /// Make every later deployment of `kind` revert
    pub fn fail_deployments_of(&self, kind: ProgramKind) {
        self.state.lock().failing_deployments.insert(kind);
    }

    /// Allow signing for `account`
    pub fn unlock(&self, account: Address) {
        self.state.lock().unlocked.insert(account);
    }

    /// Whether a program lives at `at`
    #[must_use]
    pub fn has_program(&self, at: Address) -> bool {
        self.state.lock().world.has_program(at)
    }

    /// Label of the program at `at`
    #[must_use]
    pub fn program_label(&self, at: Address) -> Option<String> {
        self.state
            .lock()
            .world
            .program(at)
            .map(|p| p.label().to_string())
    }

    /// Copy of the current world state
    #[must_use]
    pub fn world(&self) -> World {
        self.state.lock().world.clone()
    }

    /// Latest mined block
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// Transactions submitted but not yet mined
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Mine everything pending
    pub fn mine_all(&self) {
        let mut state = self.state.lock();
        while state.mine_next().is_some() {}
    }
}

#[async_trait::async_trait]
impl Network for SimulatedNetwork {
    async fn chain_id(&self) -> Result<u64, NetworkError> {
        Ok(self.state.lock().chain_id)
    }

    async fn accounts(&self) -> Result<Vec<Address>, NetworkError> {
        Ok(self.state.lock().unlocked.iter().copied().collect())
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, NetworkError> {
        let mut state = self.state.lock();
        if !state.unlocked.contains(&tx.from) {
            return Err(NetworkError::AccountLocked(tx.from));
        }
        let nonce = {
            let next = state.nonces.entry(tx.from).or_insert(0);
            let nonce = *next;
            *next += 1;
            nonce
        };
        let hash = TxHash::new(derive(b"tx", tx.from, nonce));
        state.pending.push_back(PendingTx {
            hash,
            nonce,
            request: tx,
        });
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, NetworkError> {
        let mut state = self.state.lock();
        if !state.receipts.contains_key(&tx_hash) && !state.pending.iter().any(|tx| tx.hash == tx_hash) {
            return Err(NetworkError::UnknownTransaction(tx_hash));
        }
        while !state.receipts.contains_key(&tx_hash) {
            if state.mine_next().is_none() {
                return Err(NetworkError::UnknownTransaction(tx_hash));
            }
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(NetworkError::UnknownTransaction(tx_hash))
    }

    async fn call(&self, to: Address, payload: &Payload) -> Result<Payload, NetworkError> {
        let call = ProgramCall::decode(payload)?;
        let mut scratch = self.state.lock().world.clone();
        let output: Output = scratch
            .execute(Address::ZERO, to, call)
            .map_err(|revert| NetworkError::CallReverted(revert.into_reason()))?;
        Ok(output.encode()?)
    }
}

/// Genesis state for a [`SimulatedNetwork`]
#[derive(Debug)]
pub struct GenesisBuilder {
    chain_id: u64,
    unlocked: BTreeSet<Address>,
    world: World,
}

impl GenesisBuilder {
    /// Empty genesis for `chain_id`
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            unlocked: BTreeSet::new(),
            world: World::new(),
        }
    }

    /// Add a controllable account
    #[must_use]
    pub fn account(mut self, account: Address) -> Self {
        self.unlocked.insert(account);
        self
    }

    /// Install the production resolver with fixed entries
    #[must_use]
    pub fn production_resolver(
        mut self,
        at: Address,
        entries: impl IntoIterator<Item = (Bytes32, Address)>,
    ) -> Self {
        let state = LegacyResolverState {
            entries: entries.into_iter().collect(),
        };
        self.world.install(at, ProgramState::LegacyResolver(state));
        self
    }

    /// Install the production settings store with fixed integer values
    #[must_use]
    pub fn production_storage(
        mut self,
        at: Address,
        values: impl IntoIterator<Item = (Bytes32, SettingKey, Uint)>,
    ) -> Self {
        let state = LegacyStorageState {
            uints: values
                .into_iter()
                .map(|(contract, record, value)| ((contract, record), value))
                .collect(),
            addresses: BTreeMap::new(),
        };
        self.world.install(at, ProgramState::LegacyStorage(state));
        self
    }

    /// Install code without modelled behaviour (library, feed, token)
    #[must_use]
    pub fn marker(mut self, at: Address, label: impl Into<String>) -> Self {
        self.world.install(at, ProgramState::Marker(label.into()));
        self
    }

    /// Install an arbitrary program
    #[must_use]
    pub fn program(mut self, at: Address, state: ProgramState) -> Self {
        self.world.install(at, state);
        self
    }

    /// Finish the genesis
    #[must_use]
    pub fn build(self) -> SimulatedNetwork {
        SimulatedNetwork {
            state: Mutex::new(ChainState {
                chain_id: self.chain_id,
                unlocked: self.unlocked,
                nonces: BTreeMap::new(),
                world: self.world,
                pending: VecDeque::new(),
                receipts: HashMap::new(),
                block_number: 0,
                failing_deployments: BTreeSet::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ConstructorArg;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn deploy_multicall(owner: Address) -> TransactionRequest {
        TransactionRequest::deploy(
            owner,
            ProgramKind::OwnedMulticall,
            vec![0x60, 0x80],
            vec![ConstructorArg::Address(owner)],
        )
    }

    #[tokio::test]
    async fn locked_sender_is_rejected() {
        let network = SimulatedNetwork::builder(1).build();
        let err = network.submit(deploy_multicall(addr(1))).await.unwrap_err();
        assert!(matches!(err, NetworkError::AccountLocked(a) if a == addr(1)));
    }

    #[tokio::test]
    async fn mines_in_submission_order() {
        let network = SimulatedNetwork::builder(1).account(addr(1)).build();
        let first = network.submit(deploy_multicall(addr(1))).await.unwrap();
        let second = network.submit(deploy_multicall(addr(1))).await.unwrap();
        assert_eq!(network.pending_count(), 2);

        let second_receipt = network.wait_for_receipt(second).await.unwrap();
        let first_receipt = network.wait_for_receipt(first).await.unwrap();
        assert_eq!(first_receipt.block_number, 1);
        assert_eq!(second_receipt.block_number, 2);
        assert_eq!(first_receipt.contract_address, Some(create_address(addr(1), 0)));
        assert_eq!(second_receipt.contract_address, Some(create_address(addr(1), 1)));
        assert_eq!(network.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_hash() {
        let network = SimulatedNetwork::builder(1).build();
        let err = network.wait_for_receipt(TxHash::new([7; 32])).await.unwrap_err();
        assert!(matches!(err, NetworkError::UnknownTransaction(_)));
    }

    #[tokio::test]
    async fn injected_failure_reverts_deployment() {
        let network = SimulatedNetwork::builder(1).account(addr(1)).build();
        network.fail_deployments_of(ProgramKind::OwnedMulticall);
        let hash = network.submit(deploy_multicall(addr(1))).await.unwrap();
        let receipt = network.wait_for_receipt(hash).await.unwrap();
        assert!(!receipt.is_success());
        assert_eq!(receipt.contract_address, None);
    }

    #[tokio::test]
    async fn read_call_does_not_mutate() {
        let network = SimulatedNetwork::builder(1).account(addr(1)).build();
        let hash = network.submit(deploy_multicall(addr(1))).await.unwrap();
        let multicall = network
            .wait_for_receipt(hash)
            .await
            .unwrap()
            .contract_address
            .unwrap();

        let before = network.world();
        let out = network
            .call(multicall, &ProgramCall::Owner.encode().unwrap())
            .await
            .unwrap();
        assert_eq!(Output::decode(&out).unwrap(), Output::Address(addr(1)));
        assert_eq!(network.world(), before);
    }
}
