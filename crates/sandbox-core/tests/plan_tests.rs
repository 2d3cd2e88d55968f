//! Staging of deployment plans

use proptest::prelude::*;
use sandbox_chain::ProgramKind;
use sandbox_core::{DeploymentPlan, PlanError, PlannedArg, PlannedProgram};
use sandbox_test_utils::mainnet_config;

use ProgramKind::{
    AddressResolver, ExchangeRates, FlexibleStorage, OwnedMulticall, SandboxAmm, SystemSettings,
};

#[test]
fn test_sandbox_plan_stages() {
    let plan = DeploymentPlan::sandbox(&mainnet_config()).unwrap();

    assert_eq!(plan.len(), 6);
    assert_eq!(
        plan.stages(),
        &[
            vec![OwnedMulticall],
            vec![AddressResolver],
            vec![FlexibleStorage, SystemSettings, ExchangeRates, SandboxAmm],
        ]
    );
}

#[test]
fn test_cycle_is_rejected() {
    let err = DeploymentPlan::new([
        PlannedProgram::new(OwnedMulticall, vec![PlannedArg::Program(AddressResolver)]),
        PlannedProgram::new(AddressResolver, vec![PlannedArg::Program(OwnedMulticall)]),
    ])
    .unwrap_err();
    assert!(matches!(err, PlanError::Cycle(_)));
}

#[test]
fn test_dangling_reference_is_rejected() {
    let err = DeploymentPlan::new([PlannedProgram::new(
        SandboxAmm,
        vec![PlannedArg::Program(AddressResolver)],
    )])
    .unwrap_err();
    assert_eq!(
        err,
        PlanError::DanglingReference {
            program: SandboxAmm,
            missing: AddressResolver,
        }
    );
}

proptest! {
    /// Any acyclic plan: dependencies land in strictly earlier stages, and
    /// every later-stage program depends on something in the stage just before
    #[test]
    fn prop_stages_respect_dependencies(
        edges in proptest::collection::vec(proptest::collection::vec(any::<bool>(), 6), 6),
    ) {
        // only reference kinds declared earlier, so the plan is acyclic
        let programs: Vec<_> = ProgramKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let args = (0..i)
                    .filter(|&j| edges[i][j])
                    .map(|j| PlannedArg::Program(ProgramKind::ALL[j]))
                    .collect();
                PlannedProgram::new(*kind, args)
            })
            .collect();

        let plan = DeploymentPlan::new(programs.clone()).unwrap();
        let total: usize = plan.stages().iter().map(Vec::len).sum();
        prop_assert_eq!(total, 6);

        for program in &programs {
            let stage = plan.stage_of(program.kind).unwrap();
            let deps: Vec<_> = program.dependencies().collect();
            for dep in &deps {
                prop_assert!(plan.stage_of(*dep).unwrap() < stage);
            }
            if stage > 0 {
                prop_assert!(deps.iter().any(|d| plan.stage_of(*d) == Some(stage - 1)));
            } else {
                prop_assert!(deps.is_empty());
            }
        }
    }
}
