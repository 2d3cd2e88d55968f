//! Deployment plan
//!
//! Programs form a DAG whose edges come from constructor arguments that
//! name other programs. The plan is split into stages (topological layers):
//! a program's stage is one past the latest stage of anything it references,
//! so nothing reads an address produced in its own stage.

use crate::config::SandboxConfig;
use crate::error::PlanError;
use crate::sequencer::DeployedSystem;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use sandbox_artifact::Address;
use sandbox_chain::{ConstructorArg, ProgramKind};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// A constructor argument before deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedArg {
    /// Known up front
    Fixed(ConstructorArg),
    /// Address of another planned program, known once it is confirmed
    Program(ProgramKind),
}

impl Display for PlannedArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(arg) => write!(f, "{arg}"),
            Self::Program(kind) => write!(f, "<{kind}>"),
        }
    }
}

/// One program to deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedProgram {
    pub kind: ProgramKind,
    pub args: Vec<PlannedArg>,
}

impl PlannedProgram {
    #[must_use]
    pub fn new(kind: ProgramKind, args: Vec<PlannedArg>) -> Self {
        Self { kind, args }
    }

    /// Programs this one references
    pub fn dependencies(&self) -> impl Iterator<Item = ProgramKind> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            PlannedArg::Program(kind) => Some(*kind),
            PlannedArg::Fixed(_) => None,
        })
    }
}

impl Display for PlannedProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// Validated, staged deployment plan
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    programs: BTreeMap<ProgramKind, PlannedProgram>,
    stages: Vec<Vec<ProgramKind>>,
}

impl DeploymentPlan {
    /// Validate programs and compute stages
    ///
    /// # Errors
    /// - [`PlanError::Duplicate`] if a kind appears twice
    /// - [`PlanError::DanglingReference`] if an argument names an unplanned program
    /// - [`PlanError::Cycle`] if the references form a cycle
    pub fn new(programs: impl IntoIterator<Item = PlannedProgram>) -> Result<Self, PlanError> {
        let mut by_kind = BTreeMap::new();
        for program in programs {
            let kind = program.kind;
            if by_kind.insert(kind, program).is_some() {
                return Err(PlanError::Duplicate(kind));
            }
        }

        // edges point from dependency to dependent
        let mut graph: DiGraphMap<ProgramKind, ()> = DiGraphMap::new();
        for (kind, program) in &by_kind {
            graph.add_node(*kind);
            for dependency in program.dependencies() {
                if !by_kind.contains_key(&dependency) {
                    return Err(PlanError::DanglingReference {
                        program: *kind,
                        missing: dependency,
                    });
                }
                graph.add_edge(dependency, *kind, ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| PlanError::Cycle(cycle.node_id()))?;

        let mut layer: BTreeMap<ProgramKind, usize> = BTreeMap::new();
        for kind in order {
            let depth = graph
                .neighbors_directed(kind, Direction::Incoming)
                .filter_map(|dep| layer.get(&dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            layer.insert(kind, depth);
        }

        let mut stages: Vec<Vec<ProgramKind>> = Vec::new();
        // BTreeMap iteration keeps each stage in kind order, which is also nonce order
        for (kind, depth) in layer {
            if stages.len() <= depth {
                stages.resize_with(depth + 1, Vec::new);
            }
            stages[depth].push(kind);
        }

        Ok(Self {
            programs: by_kind,
            stages,
        })
    }

    /// The sandbox topology for `config`
    ///
    /// # Errors
    /// Never fails for the built-in topology; kept fallible for [`Self::new`]
    pub fn sandbox(config: &SandboxConfig) -> Result<Self, PlanError> {
        use PlannedArg::{Fixed, Program};
        use ProgramKind::{
            AddressResolver, ExchangeRates, FlexibleStorage, OwnedMulticall, SandboxAmm,
            SystemSettings,
        };

        let address = |a: Address| Fixed(ConstructorArg::Address(a));

        Self::new([
            PlannedProgram::new(OwnedMulticall, vec![address(config.owner)]),
            PlannedProgram::new(
                AddressResolver,
                vec![Program(OwnedMulticall), address(config.production.fallback_resolver)],
            ),
            PlannedProgram::new(
                FlexibleStorage,
                vec![
                    Program(AddressResolver),
                    address(config.production.fallback_settings_store),
                ],
            ),
            PlannedProgram::new(SystemSettings, vec![Program(OwnedMulticall), Program(AddressResolver)]),
            PlannedProgram::new(
                ExchangeRates,
                vec![
                    Program(OwnedMulticall),
                    address(Address::ZERO),
                    Program(AddressResolver),
                    Fixed(ConstructorArg::Bytes32List(Vec::new())),
                    Fixed(ConstructorArg::UintList(Vec::new())),
                ],
            ),
            PlannedProgram::new(SandboxAmm, vec![address(config.depositor), Program(AddressResolver)]),
        ])
    }

    /// Stages in deployment order
    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[Vec<ProgramKind>] {
        &self.stages
    }

    /// Stage index of `kind`
    #[must_use]
    pub fn stage_of(&self, kind: ProgramKind) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(&kind))
    }

    /// Planned program for `kind`
    #[inline]
    #[must_use]
    pub fn program(&self, kind: ProgramKind) -> Option<&PlannedProgram> {
        self.programs.get(&kind)
    }

    /// Number of planned programs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing is planned
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Constructor arguments of `kind` with program references replaced by
    /// confirmed addresses
    ///
    /// # Errors
    /// Returns [`PlanError::Unresolved`] if a referenced program is not in `deployed`
    pub fn resolve_args(
        &self,
        kind: ProgramKind,
        deployed: &DeployedSystem,
    ) -> Result<Vec<ConstructorArg>, PlanError> {
        let Some(program) = self.programs.get(&kind) else {
            return Ok(Vec::new());
        };
        program
            .args
            .iter()
            .map(|arg| match arg {
                PlannedArg::Fixed(value) => Ok(value.clone()),
                PlannedArg::Program(dependency) => deployed
                    .address(*dependency)
                    .map(ConstructorArg::Address)
                    .ok_or(PlanError::Unresolved {
                        program: kind,
                        dependency: *dependency,
                    }),
            })
            .collect()
    }
}

impl Display for DeploymentPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            writeln!(f, "stage {i}:")?;
            for kind in stage {
                if let Some(program) = self.programs.get(kind) {
                    writeln!(f, "  {program}")?;
                }
            }
        }
        Ok(())
    }
}
