//! Shared harness for chain integration tests
#![allow(dead_code)]

use sandbox_artifact::{Address, Bytes32, Uint};
use sandbox_chain::{
    exchange_fee_rate_record, names, ConstructorArg, Network, Output, ProgramCall, ProgramKind,
    Receipt, SimulatedNetwork, TransactionRequest,
};

pub const OWNER: Address = Address::new([0x11; 20]);
pub const STRANGER: Address = Address::new([0x22; 20]);
pub const PROD_RESOLVER: Address = Address::new([0xa1; 20]);
pub const PROD_STORAGE: Address = Address::new([0xa2; 20]);
pub const ISSUER: Address = Address::new([0xa3; 20]);
pub const PROD_RATES: Address = Address::new([0xa4; 20]);
pub const FEED: Address = Address::new([0xa5; 20]);

pub const BTC: Bytes32 = Bytes32::from_static("sBTC");
pub const ETH: Bytes32 = Bytes32::from_static("sETH");

pub fn network() -> SimulatedNetwork {
    SimulatedNetwork::builder(1)
        .account(OWNER)
        .account(STRANGER)
        .production_resolver(
            PROD_RESOLVER,
            [
                (names::ISSUER, ISSUER),
                (names::EXCHANGE_RATES, PROD_RATES),
                (names::FLEXIBLE_STORAGE, PROD_STORAGE),
            ],
        )
        .production_storage(
            PROD_STORAGE,
            [
                (names::SYSTEM_SETTINGS, exchange_fee_rate_record(BTC), Uint::bps(30)),
                (names::SYSTEM_SETTINGS, exchange_fee_rate_record(ETH), Uint::bps(25)),
            ],
        )
        .marker(ISSUER, "Issuer")
        .marker(PROD_RATES, "ProductionExchangeRates")
        .marker(FEED, "ChainlinkFeed")
        .build()
}

pub async fn deploy(network: &SimulatedNetwork, kind: ProgramKind, args: Vec<ConstructorArg>) -> Address {
    let hash = network
        .submit(TransactionRequest::deploy(OWNER, kind, vec![0x60, 0x80], args))
        .await
        .unwrap();
    let receipt = network.wait_for_receipt(hash).await.unwrap();
    assert!(receipt.is_success(), "{kind} deployment reverted: {:?}", receipt.status);
    receipt.contract_address.unwrap()
}

pub async fn send(network: &SimulatedNetwork, from: Address, to: Address, call: &ProgramCall) -> Receipt {
    let hash = network
        .submit(TransactionRequest::call(from, to, call.encode().unwrap()))
        .await
        .unwrap();
    network.wait_for_receipt(hash).await.unwrap()
}

pub async fn read(network: &SimulatedNetwork, to: Address, call: &ProgramCall) -> Output {
    let raw = network.call(to, &call.encode().unwrap()).await.unwrap();
    Output::decode(&raw).unwrap()
}

/// Sandbox programs deployed with the multicall as owner, not yet configured
pub struct Sandbox {
    pub multicall: Address,
    pub resolver: Address,
    pub storage: Address,
    pub settings: Address,
    pub rates: Address,
    pub amm: Address,
}

pub async fn deploy_sandbox(network: &SimulatedNetwork) -> Sandbox {
    use ConstructorArg::Address as A;

    let multicall = deploy(network, ProgramKind::OwnedMulticall, vec![A(OWNER)]).await;
    let resolver = deploy(network, ProgramKind::AddressResolver, vec![A(multicall), A(PROD_RESOLVER)]).await;
    let storage = deploy(network, ProgramKind::FlexibleStorage, vec![A(resolver), A(PROD_STORAGE)]).await;
    let settings = deploy(network, ProgramKind::SystemSettings, vec![A(multicall), A(resolver)]).await;
    let rates = deploy(
        network,
        ProgramKind::ExchangeRates,
        vec![
            A(multicall),
            A(Address::ZERO),
            A(resolver),
            ConstructorArg::Bytes32List(vec![]),
            ConstructorArg::UintList(vec![]),
        ],
    )
    .await;
    let amm = deploy(network, ProgramKind::SandboxAmm, vec![A(STRANGER), A(resolver)]).await;

    Sandbox {
        multicall,
        resolver,
        storage,
        settings,
        rates,
        amm,
    }
}

impl Sandbox {
    pub fn override_call(&self) -> ProgramCall {
        ProgramCall::OverrideAddresses {
            names: vec![names::EXCHANGE_RATES, names::FLEXIBLE_STORAGE, names::SYSTEM_SETTINGS],
            destinations: vec![self.rates, self.storage, self.settings],
        }
    }

    pub fn rebuild_call(&self) -> ProgramCall {
        ProgramCall::RebuildCaches {
            destinations: vec![self.rates, self.amm, self.settings],
        }
    }
}

pub fn aggregate(calls: Vec<(Address, ProgramCall)>) -> ProgramCall {
    ProgramCall::Aggregate {
        calls: calls
            .into_iter()
            .map(|(target, call)| sandbox_chain::Call::encode(target, &call).unwrap())
            .collect(),
    }
}
