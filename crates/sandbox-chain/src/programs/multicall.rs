//! Owner-gated atomic call aggregator

use super::{only_owner, unsupported, ProgramModel, Revert, World};
use crate::abi::{Output, ProgramCall};
use sandbox_artifact::Address;

/// Aggregator bound to a single owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticallState {
    pub owner: Address,
}

impl MulticallState {
    pub(crate) fn new(owner: Address) -> Self {
        Self { owner }
    }
}

pub(super) fn execute(
    world: &mut World,
    this: Address,
    sender: Address,
    call: ProgramCall,
) -> Result<Output, Revert> {
    let owner = world.state::<MulticallState>(this)?.owner;
    match call {
        ProgramCall::Owner => Ok(Output::Address(owner)),
        ProgramCall::Aggregate { calls } => {
            only_owner(owner, sender)?;
            let mut results = Vec::with_capacity(calls.len());
            for (i, sub) in calls.into_iter().enumerate() {
                let failed = |reason: &str| {
                    Revert::new(format!("Multicall aggregate: call {i} failed: {reason}"))
                };
                let decoded =
                    ProgramCall::decode(&sub.payload).map_err(|e| failed(&e.to_string()))?;
                let output = world
                    .execute(this, sub.target, decoded)
                    .map_err(|revert| failed(revert.reason()))?;
                results.push(output);
            }
            Ok(Output::Results(results))
        }
        other => Err(unsupported(MulticallState::LABEL, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Call;
    use crate::programs::ProgramState;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn rejects_non_owner() {
        let mut world = World::new();
        world.install(addr(1), ProgramState::Multicall(MulticallState::new(addr(2))));
        let err = world
            .execute(addr(3), addr(1), ProgramCall::Aggregate { calls: vec![] })
            .unwrap_err();
        assert_eq!(err.reason(), "Only the contract owner may perform this action");
    }

    #[test]
    fn attributes_failing_index() {
        let mut world = World::new();
        world.install(addr(1), ProgramState::Multicall(MulticallState::new(addr(2))));
        let calls = vec![
            Call::encode(addr(1), &ProgramCall::Owner).unwrap(),
            Call::encode(addr(9), &ProgramCall::Owner).unwrap(),
        ];
        let err = world
            .execute(addr(2), addr(1), ProgramCall::Aggregate { calls })
            .unwrap_err();
        assert!(err.reason().starts_with("Multicall aggregate: call 1 failed: "));
    }

    #[test]
    fn returns_results_in_order() {
        let mut world = World::new();
        world.install(addr(1), ProgramState::Multicall(MulticallState::new(addr(2))));
        let calls = vec![Call::encode(addr(1), &ProgramCall::Owner).unwrap()];
        let out = world
            .execute(addr(2), addr(1), ProgramCall::Aggregate { calls })
            .unwrap();
        assert_eq!(out, Output::Results(vec![Output::Address(addr(2))]));
    }
}
