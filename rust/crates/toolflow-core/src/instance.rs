use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::FlowError;

/// A tool switching problem over a fixed job order.
///
/// Tools are numbered from 1 to `tool_count`; `tool_costs[t - 1]` is paid
/// every time tool `t` is loaded after the first job has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub job_count: usize,
    pub tool_count: usize,
    pub capacity: usize,
    pub requirements: Vec<BTreeSet<usize>>,
    pub tool_costs: Vec<i64>,
}

impl Instance {
    /// Builds and validates an instance. Job and tool counts are taken from
    /// the lengths of `requirements` and `tool_costs`.
    pub fn new(
        capacity: usize,
        tool_costs: Vec<i64>,
        requirements: Vec<Vec<usize>>,
    ) -> Result<Self, FlowError> {
        let instance = Self {
            job_count: requirements.len(),
            tool_count: tool_costs.len(),
            capacity,
            requirements: requirements
                .into_iter()
                .map(|tools| tools.into_iter().collect())
                .collect(),
            tool_costs,
        };
        instance.validate()?;
        Ok(instance)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.job_count == 0 {
            return Err(FlowError::InvalidInput(
                "instance has no jobs".to_string(),
            ));
        }
        if self.tool_count == 0 {
            return Err(FlowError::InvalidInput(
                "instance has no tools".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(FlowError::InvalidInput(
                "magazine capacity must be positive".to_string(),
            ));
        }
        if self.requirements.len() != self.job_count {
            return Err(FlowError::InvalidInput(format!(
                "expected {} requirement sets, found {}",
                self.job_count,
                self.requirements.len()
            )));
        }
        if self.tool_costs.len() != self.tool_count {
            return Err(FlowError::InvalidInput(format!(
                "expected {} tool costs, found {}",
                self.tool_count,
                self.tool_costs.len()
            )));
        }
        if let Some(tool) = self.tool_costs.iter().position(|&cost| cost < 0) {
            return Err(FlowError::InvalidInput(format!(
                "tool {} has a negative switch cost",
                tool + 1
            )));
        }
        for (job, tools) in self.requirements.iter().enumerate() {
            if let Some(&tool) = tools
                .iter()
                .find(|&&tool| tool == 0 || tool > self.tool_count)
            {
                return Err(FlowError::InvalidInput(format!(
                    "job {} requires tool {} outside 1..={}",
                    job + 1,
                    tool,
                    self.tool_count
                )));
            }
        }
        Ok(())
    }

    pub fn tool_cost(&self, tool: usize) -> Option<i64> {
        tool.checked_sub(1)
            .and_then(|idx| self.tool_costs.get(idx))
            .copied()
    }

    /// Total number of (job, tool) requirements.
    pub fn occurrence_count(&self) -> usize {
        self.requirements.iter().map(BTreeSet::len).sum()
    }

    /// Largest requirement set; the instance is only solvable when this does
    /// not exceed the capacity.
    pub fn max_requirement(&self) -> usize {
        self.requirements
            .iter()
            .map(BTreeSet::len)
            .max()
            .unwrap_or(0)
    }
}
