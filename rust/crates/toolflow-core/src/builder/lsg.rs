use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::NetworkBuilder;
use crate::graph::{FlowNetwork, FlowSolution, VertexId, COST_LIMIT};
use crate::plan::ToolPlan;
use crate::{FlowError, Instance};

/// Layered slot graph.
///
/// Each unit of flow is one magazine slot travelling through the job
/// sequence. A slot either waits unused on the blank chain, holds a tool
/// through one of its required occurrences, keeps that tool until its next
/// occurrence, or is emptied onto the released chain from which loading a
/// tool costs its switch cost. All slots meet in a final vertex before the
/// sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsgBuilder;

/// One (job, tool) requirement and the two vertices bracketing its
/// mandatory arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub job: usize,
    pub tool: usize,
    pub enter: VertexId,
    pub leave: VertexId,
    /// Index of the next occurrence of the same tool.
    pub next: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRole {
    Source,
    Sink,
    Final,
    /// Slot never loaded before job `j`.
    Blank(usize),
    /// Slot emptied after job `j - 1`.
    Released(usize),
    Enter(usize),
    Leave(usize),
}

const SOURCE: usize = 0;
const SINK: usize = 1;
const FINAL: usize = 2;
const BLANK_BASE: usize = 3;

/// Vertex numbering of the layered slot graph. It depends on the instance
/// only, so a solved network can be read back without extra bookkeeping.
#[derive(Debug, Clone)]
pub struct LsgLayout {
    job_count: usize,
    occurrences: Vec<Occurrence>,
    job_offsets: Vec<usize>,
}

impl LsgLayout {
    pub fn new(instance: &Instance) -> Self {
        let job_count = instance.requirements.len();
        let occurrence_base = BLANK_BASE + 2 * job_count + 1;
        let mut occurrences = Vec::with_capacity(instance.occurrence_count());
        let mut job_offsets = Vec::with_capacity(job_count + 1);
        for (job, tools) in instance.requirements.iter().enumerate() {
            job_offsets.push(occurrences.len());
            for &tool in tools {
                let index = occurrences.len();
                occurrences.push(Occurrence {
                    job,
                    tool,
                    enter: VertexId(occurrence_base + 2 * index),
                    leave: VertexId(occurrence_base + 2 * index + 1),
                    next: None,
                });
            }
        }
        job_offsets.push(occurrences.len());

        let mut upcoming: HashMap<usize, usize> = HashMap::new();
        for index in (0..occurrences.len()).rev() {
            let tool = occurrences[index].tool;
            occurrences[index].next = upcoming.insert(tool, index);
        }

        Self {
            job_count,
            occurrences,
            job_offsets,
        }
    }

    pub fn vertex_count(&self) -> usize {
        BLANK_BASE + 2 * self.job_count + 1 + 2 * self.occurrences.len()
    }

    pub fn source(&self) -> VertexId {
        VertexId(SOURCE)
    }

    pub fn sink(&self) -> VertexId {
        VertexId(SINK)
    }

    pub fn final_vertex(&self) -> VertexId {
        VertexId(FINAL)
    }

    /// `job` ranges over `0..=job_count`.
    pub fn blank(&self, job: usize) -> VertexId {
        debug_assert!(job <= self.job_count);
        VertexId(BLANK_BASE + job)
    }

    /// `job` ranges over `1..=job_count`.
    pub fn released(&self, job: usize) -> VertexId {
        debug_assert!(job >= 1 && job <= self.job_count);
        VertexId(BLANK_BASE + self.job_count + job)
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn occurrence(&self, index: usize) -> Option<&Occurrence> {
        self.occurrences.get(index)
    }

    pub fn job_occurrences(&self, job: usize) -> &[Occurrence] {
        match (self.job_offsets.get(job), self.job_offsets.get(job + 1)) {
            (Some(&start), Some(&end)) => &self.occurrences[start..end],
            _ => &[],
        }
    }

    pub fn role(&self, vertex: VertexId) -> Option<VertexRole> {
        let v = vertex.0;
        let released_base = BLANK_BASE + self.job_count;
        let occurrence_base = released_base + self.job_count + 1;
        match v {
            SOURCE => Some(VertexRole::Source),
            SINK => Some(VertexRole::Sink),
            FINAL => Some(VertexRole::Final),
            _ if v <= released_base => Some(VertexRole::Blank(v - BLANK_BASE)),
            _ if v < occurrence_base => Some(VertexRole::Released(v - released_base)),
            _ if v < self.vertex_count() => {
                let offset = v - occurrence_base;
                if offset % 2 == 0 {
                    Some(VertexRole::Enter(offset / 2))
                } else {
                    Some(VertexRole::Leave(offset / 2))
                }
            }
            _ => None,
        }
    }
}

impl NetworkBuilder for LsgBuilder {
    fn name(&self) -> &str {
        "LSG"
    }

    fn build_from_instance(
        &self,
        instance: &Instance,
        penalty: i64,
    ) -> Result<FlowNetwork, FlowError> {
        instance.validate()?;
        let penalty = self.resolve_penalty(instance, penalty)?;
        let occurrences = i64::try_from(instance.occurrence_count())
            .map_err(|_| FlowError::InvalidInput("too many requirements".to_string()))?;
        let discount = penalty
            .checked_mul(occurrences)
            .filter(|&total| total <= COST_LIMIT)
            .ok_or_else(|| {
                FlowError::InvalidInput(format!(
                    "penalty {} over {} requirements exceeds the cost range",
                    penalty, occurrences
                ))
            })?;
        let capacity = i64::try_from(instance.capacity)
            .map_err(|_| FlowError::InvalidInput("capacity exceeds i64".to_string()))?;

        let layout = LsgLayout::new(instance);
        let jobs = instance.job_count;
        let mut network = FlowNetwork::with_vertices(layout.vertex_count());
        network.set_source(layout.source())?;
        network.set_sink(layout.sink())?;
        network.set_penalty(penalty);

        network.add_edge(layout.source(), layout.blank(0), 0, capacity, false, None)?;
        for job in 0..jobs {
            network.add_edge(
                layout.blank(job),
                layout.blank(job + 1),
                0,
                capacity,
                false,
                None,
            )?;
        }
        network.add_edge(
            layout.blank(jobs),
            layout.final_vertex(),
            0,
            capacity,
            false,
            None,
        )?;
        for job in 1..jobs {
            network.add_edge(
                layout.released(job),
                layout.released(job + 1),
                0,
                capacity,
                false,
                None,
            )?;
        }
        network.add_edge(
            layout.released(jobs),
            layout.final_vertex(),
            0,
            capacity,
            false,
            None,
        )?;

        for occurrence in layout.occurrences() {
            let tool = Some(occurrence.tool);
            let switch_cost = instance.tool_cost(occurrence.tool).ok_or_else(|| {
                FlowError::InvalidInput(format!("unknown tool {}", occurrence.tool))
            })?;

            network.add_edge(
                layout.blank(occurrence.job),
                occurrence.enter,
                0,
                1,
                true,
                tool,
            )?;
            if occurrence.job > 0 {
                network.add_edge(
                    layout.released(occurrence.job),
                    occurrence.enter,
                    switch_cost,
                    1,
                    true,
                    tool,
                )?;
            }
            network.add_mandatory_edge(occurrence.enter, occurrence.leave, -penalty, 1, tool)?;
            if let Some(next) = occurrence.next.and_then(|idx| layout.occurrence(idx)) {
                network.add_edge(occurrence.leave, next.enter, 0, 1, true, tool)?;
            }
            network.add_edge(
                occurrence.leave,
                layout.released(occurrence.job + 1),
                0,
                1,
                false,
                None,
            )?;
        }

        network.add_edge(
            layout.final_vertex(),
            layout.sink(),
            0,
            capacity,
            false,
            None,
        )?;

        debug!(
            builder = self.name(),
            jobs,
            tools = instance.tool_count,
            capacity = instance.capacity,
            vertices = network.vertex_count(),
            arcs = network.forward_arc_count(),
            penalty,
            discount,
            "built layered slot graph"
        );
        Ok(network)
    }
}

impl LsgBuilder {
    /// Reads the per-job magazine contents off a solved layered slot graph.
    ///
    /// A tool picked up from the blank chain is treated as loaded before the
    /// first job, a retained tool stays between its two occurrences, and a
    /// tool loaded from the released chain is present from its own job.
    pub fn extract_plan(
        &self,
        instance: &Instance,
        solution: &FlowSolution,
    ) -> Result<ToolPlan, FlowError> {
        let layout = LsgLayout::new(instance);
        let mut magazines = vec![BTreeSet::new(); instance.job_count];

        for path in &solution.paths {
            for pair in path.vertices.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(from_role), Some(to_role)) = (layout.role(from), layout.role(to)) else {
                    return Err(FlowError::InvalidInput(format!(
                        "path vertex outside the layout of {} vertices",
                        layout.vertex_count()
                    )));
                };
                let VertexRole::Enter(index) = to_role else {
                    continue;
                };
                let Some(occurrence) = layout.occurrence(index) else {
                    continue;
                };
                let held_from = match from_role {
                    VertexRole::Blank(_) => 0,
                    VertexRole::Leave(previous) => layout
                        .occurrence(previous)
                        .map_or(occurrence.job, |prev| prev.job),
                    _ => occurrence.job,
                };
                if held_from > occurrence.job {
                    return Err(FlowError::InvalidInput(format!(
                        "tool {} retained backwards into job {}",
                        occurrence.tool, occurrence.job
                    )));
                }
                for magazine in &mut magazines[held_from..=occurrence.job] {
                    magazine.insert(occurrence.tool);
                }
            }
        }

        Ok(ToolPlan { magazines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_job_instance() -> Instance {
        Instance::new(1, vec![1, 1], vec![vec![1], vec![2]]).unwrap()
    }

    #[test]
    fn layout_numbers_vertices_in_construction_order() {
        let inst = Instance::new(2, vec![1, 1, 1], vec![vec![1, 3], vec![2], vec![3]]).unwrap();
        let layout = LsgLayout::new(&inst);
        // source, sink, final, 4 blank, 3 released, 4 occurrences x 2
        assert_eq!(layout.vertex_count(), 3 + 4 + 3 + 8);
        assert_eq!(layout.role(VertexId(0)), Some(VertexRole::Source));
        assert_eq!(layout.role(layout.blank(3)), Some(VertexRole::Blank(3)));
        assert_eq!(
            layout.role(layout.released(1)),
            Some(VertexRole::Released(1))
        );
        let occurrences = layout.job_occurrences(0);
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[1].tool, 3);
        assert_eq!(occurrences[1].next, Some(3));
        assert_eq!(occurrences[0].next, None);
        assert_eq!(layout.role(occurrences[1].leave), Some(VertexRole::Leave(1)));
        assert_eq!(layout.role(VertexId(layout.vertex_count())), None);
    }

    #[test]
    fn builds_expected_arc_counts() {
        let inst = two_job_instance();
        let network = LsgBuilder.build_from_instance(&inst, 0).unwrap();
        let layout = LsgLayout::new(&inst);
        assert_eq!(network.vertex_count(), layout.vertex_count());
        // structural: source, 2 blank steps, blank->final, 1 released step,
        // released->final, final->sink = 7
        // occurrence 1: initial load, mandatory, release = 3
        // occurrence 2: initial load, load, mandatory, release = 4
        assert_eq!(network.forward_arc_count(), 14);
        assert_eq!(network.mandatory_arcs().len(), 2);
        assert_eq!(network.penalty(), 3);
        assert!(network.is_acyclic());
    }

    #[test]
    fn explicit_penalty_is_applied_to_mandatory_arcs() {
        let inst = two_job_instance();
        let network = LsgBuilder.build_from_instance(&inst, 50).unwrap();
        assert_eq!(network.penalty(), 50);
        for &arc in network.mandatory_arcs() {
            assert_eq!(network.cost(arc), -50);
            assert!(!network.arc(arc).unwrap().in_objective());
        }
    }

    #[test]
    fn rejects_invalid_instances() {
        let mut inst = two_job_instance();
        inst.requirements[1].insert(9);
        assert!(matches!(
            LsgBuilder.build_from_instance(&inst, 0),
            Err(FlowError::InvalidInput(_))
        ));

        let inst = Instance {
            job_count: 0,
            tool_count: 1,
            capacity: 1,
            requirements: Vec::new(),
            tool_costs: vec![1],
        };
        assert!(LsgBuilder.build_from_instance(&inst, 0).is_err());
    }

    #[test]
    fn rejects_penalty_outside_cost_range() {
        let inst = two_job_instance();
        assert!(matches!(
            LsgBuilder.build_from_instance(&inst, i64::MAX / 2),
            Err(FlowError::InvalidInput(_))
        ));
    }

    #[test]
    fn extracted_plan_follows_the_slot() {
        let inst = two_job_instance();
        let mut network = LsgBuilder.build_from_instance(&inst, 0).unwrap();
        let solution = network.compute_max_flow_min_cost().unwrap();
        let plan = LsgBuilder.extract_plan(&inst, &solution).unwrap();
        assert_eq!(plan.magazines.len(), 2);
        assert!(plan.magazines[0].contains(&1));
        assert!(plan.magazines[1].contains(&2));
        assert_eq!(plan.switch_cost(&inst), 1);
    }

    #[test]
    fn plan_from_a_foreign_solution_is_rejected() {
        let inst = Instance::new(1, vec![1], vec![vec![1], vec![1]]).unwrap();
        let layout = LsgLayout::new(&inst);
        let (first, second) = (layout.occurrences()[0], layout.occurrences()[1]);
        let solution = FlowSolution {
            flow_value: 1,
            cost: 0,
            augmentations: 1,
            paths: vec![crate::graph::FlowPath {
                vertices: vec![second.leave, first.enter],
                arcs: Vec::new(),
                flow: 1,
            }],
        };
        assert!(matches!(
            LsgBuilder.extract_plan(&inst, &solution),
            Err(FlowError::InvalidInput(_))
        ));
    }
}
