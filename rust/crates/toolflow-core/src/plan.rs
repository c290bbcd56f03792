use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Instance;

/// Magazine contents for every job of an instance, in job order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPlan {
    pub magazines: Vec<BTreeSet<usize>>,
}

impl ToolPlan {
    /// Tools loaded before job `job` that were not in the magazine for the
    /// previous job. The first job's magazine is loaded for free.
    pub fn loaded_at(&self, job: usize) -> Vec<usize> {
        match job {
            0 => Vec::new(),
            _ => match (self.magazines.get(job - 1), self.magazines.get(job)) {
                (Some(before), Some(now)) => now.difference(before).copied().collect(),
                _ => Vec::new(),
            },
        }
    }

    pub fn switch_count(&self) -> usize {
        (1..self.magazines.len())
            .map(|job| self.loaded_at(job).len())
            .sum()
    }

    pub fn switch_cost(&self, instance: &Instance) -> i64 {
        (1..self.magazines.len())
            .flat_map(|job| self.loaded_at(job))
            .filter_map(|tool| instance.tool_cost(tool))
            .sum()
    }

    /// One magazine per job, never above capacity, always holding the job's
    /// required tools.
    pub fn is_feasible(&self, instance: &Instance) -> bool {
        self.magazines.len() == instance.job_count
            && self
                .magazines
                .iter()
                .zip(&instance.requirements)
                .all(|(magazine, required)| {
                    magazine.len() <= instance.capacity && required.is_subset(magazine)
                })
    }
}
