pub mod builder;
pub mod config;
pub mod graph;
pub mod instance;
pub mod plan;
pub mod solver;

use thiserror::Error;

pub use builder::{LsgBuilder, LsgLayout, NetworkBuilder};
pub use config::{ConfigError, SolverConfig};
pub use graph::{Arc, ArcId, ArcKind, FlowNetwork, FlowPath, FlowSolution, VertexId};
pub use instance::Instance;
pub use plan::ToolPlan;
pub use solver::{FlowReport, FlowSolver, Solver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("forward arcs contain a directed cycle")]
    Cyclic,
    #[error("infeasible: routed {achieved} of {required} required units")]
    Infeasible { required: i64, achieved: i64 },
    #[error("flow invariant violated: {0}")]
    InvariantViolation(String),
}

/// Minimum tool switch cost of `instance` using the layered slot graph with
/// an automatically derived penalty.
pub fn minimum_switch_cost(instance: &Instance) -> Result<i64, FlowError> {
    FlowSolver::new(LsgBuilder).compute_solution(instance)
}
