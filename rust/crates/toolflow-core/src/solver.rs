use tracing::{debug, info_span, warn};

use crate::builder::NetworkBuilder;
use crate::graph::FlowSolution;
use crate::{FlowError, Instance, SolverConfig};

/// Common contract of every tool switching strategy.
pub trait Solver {
    fn name(&self) -> &str;

    fn compute_solution(&self, instance: &Instance) -> Result<i64, FlowError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    /// Switch cost with the mandatory-arc discount added back.
    pub total_cost: i64,
    pub penalty: i64,
    pub solution: FlowSolution,
}

/// Builds a network with `B` and solves it with the min-cost flow engine.
#[derive(Debug, Clone, Default)]
pub struct FlowSolver<B> {
    builder: B,
    config: SolverConfig,
}

impl<B: NetworkBuilder> FlowSolver<B> {
    pub fn new(builder: B) -> Self {
        Self::with_config(builder, SolverConfig::default())
    }

    pub fn with_config(builder: B, config: SolverConfig) -> Self {
        Self { builder, config }
    }

    pub fn with_penalty(mut self, penalty: i64) -> Self {
        self.config.penalty = penalty;
        self
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn solve(&self, instance: &Instance) -> Result<FlowReport, FlowError> {
        let span = info_span!(
            "solve",
            solver = self.builder.name(),
            jobs = instance.job_count,
            tools = instance.tool_count,
            capacity = instance.capacity
        );
        let _guard = span.enter();

        let mut network = self
            .builder
            .build_from_instance(instance, self.config.penalty)?;
        let solution = network.compute_max_flow_min_cost()?;
        if self.config.verify {
            network.check_flow()?;
        }

        let (required, covered) = network
            .mandatory_arcs()
            .iter()
            .fold((0_i64, 0_i64), |(required, covered), &arc| {
                (required + network.capacity(arc), covered + network.flow(arc))
            });
        if covered < required {
            warn!(required, covered, "mandatory arcs left unsaturated");
            return Err(FlowError::Infeasible {
                required,
                achieved: covered,
            });
        }

        let penalty = network.penalty();
        let total_cost = penalty
            .checked_mul(covered)
            .and_then(|discount| solution.cost.checked_add(discount))
            .ok_or_else(|| FlowError::InvalidInput("reported cost overflows i64".to_string()))?;
        if self.config.verify && total_cost != network.objective_cost() {
            return Err(FlowError::InvariantViolation(format!(
                "reported cost {} differs from objective arcs {}",
                total_cost,
                network.objective_cost()
            )));
        }

        debug!(
            total_cost,
            penalty,
            flow_value = solution.flow_value,
            augmentations = solution.augmentations,
            "solved"
        );
        Ok(FlowReport {
            total_cost,
            penalty,
            solution,
        })
    }
}

impl<B: NetworkBuilder> Solver for FlowSolver<B> {
    fn name(&self) -> &str {
        self.builder.name()
    }

    fn compute_solution(&self, instance: &Instance) -> Result<i64, FlowError> {
        self.solve(instance).map(|report| report.total_cost)
    }
}
