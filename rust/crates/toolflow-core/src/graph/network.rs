use std::collections::VecDeque;

use super::{Arc, ArcId, ArcKind, COST_LIMIT};
use crate::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

/// Directed network whose arcs live in a single arena. Every forward arc is
/// immediately followed by its backward mate, so `ArcId(2k)` is forward and
/// `ArcId(2k + 1)` is its residual twin.
#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    pub(super) arcs: Vec<Arc>,
    pub(super) adjacency: Vec<Vec<ArcId>>,
    source: Option<VertexId>,
    sink: Option<VertexId>,
    mandatory: Vec<ArcId>,
    penalty: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertices(vertex_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertex_count],
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of arcs in the arena, backward arcs included.
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn forward_arc_count(&self) -> usize {
        self.arcs.len() / 2
    }

    pub fn add_vertex(&mut self) -> VertexId {
        let vertex = VertexId(self.adjacency.len());
        self.adjacency.push(Vec::new());
        vertex
    }

    fn check_vertex(&self, vertex: VertexId) -> Result<(), FlowError> {
        if vertex.0 >= self.vertex_count() {
            return Err(FlowError::InvalidInput(format!(
                "vertex {} outside 0..{}",
                vertex.0,
                self.vertex_count()
            )));
        }
        Ok(())
    }

    /// Adds a forward arc together with its backward mate and returns the
    /// forward id.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: i64,
        capacity: i64,
        in_objective: bool,
        tool: Option<usize>,
    ) -> Result<ArcId, FlowError> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        if capacity < 0 {
            return Err(FlowError::InvalidInput(format!(
                "negative capacity {} on arc {} -> {}",
                capacity, from.0, to.0
            )));
        }
        if weight.unsigned_abs() > COST_LIMIT.unsigned_abs() {
            return Err(FlowError::InvalidInput(format!(
                "weight {} on arc {} -> {} exceeds the cost range",
                weight, from.0, to.0
            )));
        }
        let forward = ArcId(self.arcs.len());
        let backward = ArcId(forward.0 + 1);
        self.arcs.push(Arc {
            from,
            to,
            mate: backward,
            kind: ArcKind::Forward {
                flow: 0,
                capacity,
                weight,
                in_objective,
                tool,
            },
        });
        self.arcs.push(Arc {
            from: to,
            to: from,
            mate: forward,
            kind: ArcKind::Backward,
        });
        self.adjacency[from.0].push(forward);
        self.adjacency[to.0].push(backward);
        Ok(forward)
    }

    /// Adds an arc that every feasible flow has to saturate. Mandatory arcs
    /// never count towards the objective.
    pub fn add_mandatory_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: i64,
        capacity: i64,
        tool: Option<usize>,
    ) -> Result<ArcId, FlowError> {
        let arc = self.add_edge(from, to, weight, capacity, false, tool)?;
        self.mandatory.push(arc);
        Ok(arc)
    }

    pub fn mandatory_arcs(&self) -> &[ArcId] {
        &self.mandatory
    }

    pub fn set_source(&mut self, source: VertexId) -> Result<(), FlowError> {
        self.check_vertex(source)?;
        self.source = Some(source);
        Ok(())
    }

    pub fn set_sink(&mut self, sink: VertexId) -> Result<(), FlowError> {
        self.check_vertex(sink)?;
        self.sink = Some(sink);
        Ok(())
    }

    pub fn source(&self) -> Option<VertexId> {
        self.source
    }

    pub fn sink(&self) -> Option<VertexId> {
        self.sink
    }

    /// Records the discount applied to each unit on a mandatory arc.
    pub fn set_penalty(&mut self, penalty: i64) {
        self.penalty = penalty;
    }

    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    pub fn arc(&self, arc: ArcId) -> Option<&Arc> {
        self.arcs.get(arc.0)
    }

    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &Arc)> {
        self.arcs
            .iter()
            .enumerate()
            .map(|(idx, arc)| (ArcId(idx), arc))
    }

    pub fn forward_arcs(&self) -> impl Iterator<Item = (ArcId, &Arc)> {
        self.arcs().filter(|(_, arc)| arc.is_forward())
    }

    pub fn flow(&self, arc: ArcId) -> i64 {
        let entry = &self.arcs[arc.0];
        match entry.kind {
            ArcKind::Forward { flow, .. } => flow,
            ArcKind::Backward => self.flow(entry.mate),
        }
    }

    pub fn capacity(&self, arc: ArcId) -> i64 {
        let entry = &self.arcs[arc.0];
        match entry.kind {
            ArcKind::Forward { capacity, .. } => capacity,
            ArcKind::Backward => self.capacity(entry.mate),
        }
    }

    pub fn residual_capacity(&self, arc: ArcId) -> i64 {
        let entry = &self.arcs[arc.0];
        match entry.kind {
            ArcKind::Forward { flow, capacity, .. } => capacity - flow,
            ArcKind::Backward => self.flow(entry.mate),
        }
    }

    pub fn cost(&self, arc: ArcId) -> i64 {
        let entry = &self.arcs[arc.0];
        match entry.kind {
            ArcKind::Forward { weight, .. } => weight,
            ArcKind::Backward => -self.cost(entry.mate),
        }
    }

    /// Pushes `amount` units along `arc`; on a backward arc this cancels flow
    /// on the mate.
    pub(crate) fn augment(&mut self, arc: ArcId, amount: i64) {
        let entry = &self.arcs[arc.0];
        let (target, delta) = match entry.kind {
            ArcKind::Forward { .. } => (arc, amount),
            ArcKind::Backward => (entry.mate, -amount),
        };
        if let ArcKind::Forward { flow, .. } = &mut self.arcs[target.0].kind {
            *flow += delta;
        }
    }

    pub fn carries_flow(&self) -> bool {
        self.forward_arcs().any(|(id, _)| self.flow(id) != 0)
    }

    /// Σ flow × weight over forward arcs.
    pub fn total_cost(&self) -> i64 {
        self.forward_arcs()
            .map(|(id, _)| self.flow(id) * self.cost(id))
            .sum()
    }

    /// Σ flow × weight over forward arcs flagged as part of the objective.
    pub fn objective_cost(&self) -> i64 {
        self.forward_arcs()
            .filter(|(_, arc)| arc.in_objective())
            .map(|(id, _)| self.flow(id) * self.cost(id))
            .sum()
    }

    /// Flow leaving `vertex` minus flow entering it.
    pub fn net_outflow(&self, vertex: VertexId) -> i64 {
        self.adjacency
            .get(vertex.0)
            .map(|arcs| {
                arcs.iter()
                    .map(|&id| {
                        if self.arcs[id.0].is_forward() {
                            self.flow(id)
                        } else {
                            -self.flow(id)
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn flow_value(&self) -> i64 {
        self.source.map(|s| self.net_outflow(s)).unwrap_or(0)
    }

    /// Depth-first search over forward arcs; false as soon as an arc closes
    /// back onto the current search path.
    pub fn is_acyclic(&self) -> bool {
        let n = self.vertex_count();
        let mut marks = vec![Mark::Unvisited; n];
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for root in 0..n {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnStack;
            stack.push((root, 0));
            while let Some(top) = stack.last_mut() {
                let (vertex, cursor) = *top;
                let Some(&id) = self.adjacency[vertex].get(cursor) else {
                    marks[vertex] = Mark::Done;
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                let arc = &self.arcs[id.0];
                if !arc.is_forward() {
                    continue;
                }
                match marks[arc.to.0] {
                    Mark::OnStack => return false,
                    Mark::Unvisited => {
                        marks[arc.to.0] = Mark::OnStack;
                        stack.push((arc.to.0, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        true
    }

    /// Topological order of the forward-arc subgraph, `None` if it has a
    /// cycle.
    pub fn topological_order(&self) -> Option<Vec<VertexId>> {
        let n = self.vertex_count();
        let mut indegree = vec![0usize; n];
        for (_, arc) in self.forward_arcs() {
            indegree[arc.to.0] += 1;
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(vertex) = queue.pop_front() {
            order.push(VertexId(vertex));
            for &id in &self.adjacency[vertex] {
                let arc = &self.arcs[id.0];
                if !arc.is_forward() {
                    continue;
                }
                indegree[arc.to.0] -= 1;
                if indegree[arc.to.0] == 0 {
                    queue.push_back(arc.to.0);
                }
            }
        }
        (order.len() == n).then_some(order)
    }

    /// Checks capacity bounds on every forward arc and conservation at every
    /// vertex other than the source and sink.
    pub fn check_flow(&self) -> Result<(), FlowError> {
        for (id, arc) in self.forward_arcs() {
            let flow = self.flow(id);
            if flow < 0 || flow > self.capacity(id) {
                return Err(FlowError::InvariantViolation(format!(
                    "arc {} -> {} carries {} outside 0..={}",
                    arc.from.0,
                    arc.to.0,
                    flow,
                    self.capacity(id)
                )));
            }
        }
        for vertex in (0..self.vertex_count()).map(VertexId) {
            if Some(vertex) == self.source || Some(vertex) == self.sink {
                continue;
            }
            let excess = self.net_outflow(vertex);
            if excess != 0 {
                return Err(FlowError::InvariantViolation(format!(
                    "vertex {} has net outflow {}",
                    vertex.0, excess
                )));
            }
        }
        if let (Some(source), Some(sink)) = (self.source, self.sink) {
            if self.net_outflow(source) != -self.net_outflow(sink) {
                return Err(FlowError::InvariantViolation(
                    "source outflow differs from sink inflow".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> FlowNetwork {
        let mut network = FlowNetwork::with_vertices(n);
        for v in 0..n - 1 {
            network
                .add_edge(VertexId(v), VertexId(v + 1), 1, 2, true, None)
                .unwrap();
        }
        network
    }

    #[test]
    fn arcs_come_in_mated_pairs() {
        let mut network = FlowNetwork::new();
        let a = network.add_vertex();
        let b = network.add_vertex();
        let forward = network.add_edge(a, b, 3, 5, true, Some(2)).unwrap();
        let backward = network.arc(forward).unwrap().mate;

        assert_eq!(network.arc_count(), 2);
        assert_eq!(network.forward_arc_count(), 1);
        assert_eq!(network.arc(backward).unwrap().mate, forward);
        assert_eq!(network.cost(backward), -3);
        assert_eq!(network.residual_capacity(forward), 5);
        assert_eq!(network.residual_capacity(backward), 0);
        assert_eq!(network.arc(forward).unwrap().tool(), Some(2));
        assert_eq!(network.arc(backward).unwrap().tool(), None);
    }

    #[test]
    fn augmenting_backward_cancels_forward_flow() {
        let mut network = chain(2);
        let forward = ArcId(0);
        let backward = ArcId(1);
        network.augment(forward, 2);
        assert_eq!(network.residual_capacity(forward), 0);
        assert_eq!(network.residual_capacity(backward), 2);
        network.augment(backward, 1);
        assert_eq!(network.flow(forward), 1);
        assert_eq!(
            network.residual_capacity(forward) + network.flow(backward),
            network.capacity(forward)
        );
    }

    #[test]
    fn rejects_unknown_vertices_and_negative_capacity() {
        let mut network = FlowNetwork::with_vertices(2);
        let err = network
            .add_edge(VertexId(0), VertexId(2), 0, 1, true, None)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        let err = network
            .add_edge(VertexId(0), VertexId(1), 0, -1, true, None)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert!(network.set_source(VertexId(5)).is_err());
        assert_eq!(network.arc_count(), 0);
    }

    #[test]
    fn rejects_weights_outside_the_cost_range() {
        let mut network = FlowNetwork::with_vertices(2);
        for weight in [i64::MAX / 4, COST_LIMIT + 1, -COST_LIMIT - 1, i64::MIN] {
            let err = network
                .add_edge(VertexId(0), VertexId(1), weight, 1, true, None)
                .unwrap_err();
            assert!(matches!(err, FlowError::InvalidInput(_)));
        }
        assert_eq!(network.arc_count(), 0);
        network
            .add_edge(VertexId(0), VertexId(1), -COST_LIMIT, 1, true, None)
            .unwrap();
        assert_eq!(network.arc_count(), 2);
    }

    #[test]
    fn detects_cycles_among_forward_arcs_only() {
        let mut network = chain(4);
        assert!(network.is_acyclic());
        assert_eq!(network.topological_order().unwrap().len(), 4);

        // Backward arcs already point from 3 to 0 along the chain; they must
        // not count as cycles.
        network
            .add_edge(VertexId(3), VertexId(1), 0, 1, false, None)
            .unwrap();
        assert!(!network.is_acyclic());
        assert!(network.topological_order().is_none());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut network = FlowNetwork::with_vertices(1);
        network
            .add_edge(VertexId(0), VertexId(0), 0, 1, false, None)
            .unwrap();
        assert!(!network.is_acyclic());
    }

    #[test]
    fn conservation_check_spots_unbalanced_vertices() {
        let mut network = chain(3);
        network.set_source(VertexId(0)).unwrap();
        network.set_sink(VertexId(2)).unwrap();
        network.augment(ArcId(0), 1);
        assert!(matches!(
            network.check_flow(),
            Err(FlowError::InvariantViolation(_))
        ));
        network.augment(ArcId(2), 1);
        assert!(network.check_flow().is_ok());
        assert_eq!(network.flow_value(), 1);
        assert_eq!(network.total_cost(), 2);
    }
}
