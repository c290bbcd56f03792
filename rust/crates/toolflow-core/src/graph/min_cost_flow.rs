use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use super::{ArcId, ArcKind, FlowNetwork, VertexId};
use crate::FlowError;

const UNREACHABLE: i64 = i64::MAX / 4;

/// Largest absolute arc weight sum a network may carry; keeps potentials and
/// reduced costs clear of the unreachable sentinel.
pub const COST_LIMIT: i64 = i64::MAX / 16;

/// One source-to-sink path of the flow decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPath {
    pub vertices: Vec<VertexId>,
    pub arcs: Vec<ArcId>,
    pub flow: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSolution {
    pub flow_value: i64,
    pub cost: i64,
    pub augmentations: usize,
    pub paths: Vec<FlowPath>,
}

impl FlowNetwork {
    /// Maximum flow of minimum cost from source to sink by successive
    /// shortest augmenting paths.
    pub fn compute_max_flow_min_cost(&mut self) -> Result<FlowSolution, FlowError> {
        MinCostFlow::new(self)?.run(None)
    }

    /// Cheapest flow of exactly `required` units.
    pub fn compute_min_cost_flow(&mut self, required: i64) -> Result<FlowSolution, FlowError> {
        if required < 0 {
            return Err(FlowError::InvalidInput(format!(
                "required flow {} is negative",
                required
            )));
        }
        MinCostFlow::new(self)?.run(Some(required))
    }

    /// Splits the forward flow into source-to-sink paths.
    pub fn decompose_paths(&self) -> Vec<FlowPath> {
        let (Some(source), Some(sink)) = (self.source(), self.sink()) else {
            return Vec::new();
        };
        if source == sink {
            return Vec::new();
        }
        let mut remaining: Vec<i64> = self
            .arcs
            .iter()
            .map(|arc| match arc.kind {
                ArcKind::Forward { flow, .. } => flow,
                ArcKind::Backward => 0,
            })
            .collect();
        let mut cursor = vec![0usize; self.vertex_count()];
        let mut paths = Vec::new();

        loop {
            let mut vertex = source;
            let mut vertices = vec![source];
            let mut arcs = Vec::new();
            while vertex != sink {
                let outgoing = &self.adjacency[vertex.0];
                let mut next = None;
                while let Some(&id) = outgoing.get(cursor[vertex.0]) {
                    if self.arcs[id.0].is_forward() && remaining[id.0] > 0 {
                        next = Some(id);
                        break;
                    }
                    cursor[vertex.0] += 1;
                }
                let Some(id) = next else {
                    break;
                };
                arcs.push(id);
                vertex = self.arcs[id.0].to;
                vertices.push(vertex);
            }
            if vertex != sink {
                break;
            }
            let flow = arcs.iter().map(|id| remaining[id.0]).min().unwrap_or(0);
            for id in &arcs {
                remaining[id.0] -= flow;
            }
            paths.push(FlowPath {
                vertices,
                arcs,
                flow,
            });
        }
        paths
    }
}

#[derive(Debug)]
struct MinCostFlow<'a> {
    network: &'a mut FlowNetwork,
    source: VertexId,
    sink: VertexId,
    potentials: Vec<i64>,
}

impl<'a> MinCostFlow<'a> {
    fn new(network: &'a mut FlowNetwork) -> Result<Self, FlowError> {
        let source = network
            .source()
            .ok_or_else(|| FlowError::InvalidInput("network has no source".to_string()))?;
        let sink = network
            .sink()
            .ok_or_else(|| FlowError::InvalidInput("network has no sink".to_string()))?;
        if source == sink {
            return Err(FlowError::InvalidInput(
                "source and sink coincide".to_string(),
            ));
        }
        if network.carries_flow() {
            return Err(FlowError::InvalidInput(
                "network already carries flow".to_string(),
            ));
        }
        let potentials = initial_potentials(network, source)?;
        Ok(Self {
            network,
            source,
            sink,
            potentials,
        })
    }

    fn run(mut self, limit: Option<i64>) -> Result<FlowSolution, FlowError> {
        let mut flow_value = 0_i64;
        let mut cost = 0_i64;
        let mut augmentations = 0_usize;

        loop {
            let wanted = match limit {
                Some(required) if flow_value >= required => break,
                Some(required) => required - flow_value,
                None => i64::MAX,
            };

            let (dist, parent) = self.shortest_paths_dijkstra();
            if dist[self.sink.0] >= UNREACHABLE {
                break;
            }
            let path = self.trace_path(&parent)?;

            let bottleneck = path
                .iter()
                .map(|&arc| self.network.residual_capacity(arc))
                .fold(wanted, i64::min);
            let path_cost: i64 = path.iter().map(|&arc| self.network.cost(arc)).sum();
            for &arc in &path {
                self.network.augment(arc, bottleneck);
            }
            for (potential, &d) in self.potentials.iter_mut().zip(&dist) {
                if d < UNREACHABLE {
                    *potential += d;
                }
            }

            cost = bottleneck
                .checked_mul(path_cost)
                .and_then(|delta| cost.checked_add(delta))
                .ok_or_else(|| FlowError::InvalidInput("flow cost overflows i64".to_string()))?;
            flow_value += bottleneck;
            augmentations += 1;
            trace!(
                augmentation = augmentations,
                bottleneck,
                path_cost,
                path_len = path.len(),
                "augmented"
            );
        }

        if let Some(required) = limit {
            if flow_value < required {
                return Err(FlowError::Infeasible {
                    required,
                    achieved: flow_value,
                });
            }
        }
        debug_assert_eq!(cost, self.network.total_cost());
        debug!(
            vertices = self.network.vertex_count(),
            arcs = self.network.forward_arc_count(),
            flow_value,
            cost,
            augmentations,
            "min-cost flow finished"
        );

        Ok(FlowSolution {
            flow_value,
            cost,
            augmentations,
            paths: self.network.decompose_paths(),
        })
    }

    /// Dijkstra over residual arcs with reduced costs.
    fn shortest_paths_dijkstra(&self) -> (Vec<i64>, Vec<Option<ArcId>>) {
        let n = self.network.vertex_count();
        let mut dist = vec![UNREACHABLE; n];
        let mut parent = vec![None; n];
        let mut heap = BinaryHeap::new();
        dist[self.source.0] = 0;
        heap.push(Reverse((0_i64, self.source.0)));

        while let Some(Reverse((du, u))) = heap.pop() {
            if du > dist[u] {
                continue;
            }
            for &id in &self.network.adjacency[u] {
                if self.network.residual_capacity(id) <= 0 {
                    continue;
                }
                let v = self.network.arcs[id.0].to.0;
                if self.potentials[v] >= UNREACHABLE {
                    continue;
                }
                let reduced = self.network.cost(id) + self.potentials[u] - self.potentials[v];
                debug_assert!(reduced >= 0, "negative reduced cost {reduced} on arc {}", id.0);
                let nd = du + reduced;
                if nd < dist[v] {
                    dist[v] = nd;
                    parent[v] = Some(id);
                    heap.push(Reverse((nd, v)));
                }
            }
        }
        (dist, parent)
    }

    fn trace_path(&self, parent: &[Option<ArcId>]) -> Result<Vec<ArcId>, FlowError> {
        let mut path = Vec::new();
        let mut vertex = self.sink;
        while vertex != self.source {
            let arc = parent[vertex.0].ok_or_else(|| {
                FlowError::InvariantViolation(format!(
                    "vertex {} reached without predecessor",
                    vertex.0
                ))
            })?;
            path.push(arc);
            vertex = self.network.arcs[arc.0].from;
        }
        path.reverse();
        Ok(path)
    }
}

/// Shortest forward-arc distances from `source`, relaxed in topological
/// order. Vertices the source cannot reach keep the sentinel; a reachable
/// distance outside `COST_LIMIT` is an error.
fn initial_potentials(network: &FlowNetwork, source: VertexId) -> Result<Vec<i64>, FlowError> {
    if !network.is_acyclic() {
        return Err(FlowError::Cyclic);
    }
    let order = network.topological_order().ok_or(FlowError::Cyclic)?;
    let mut potentials = vec![UNREACHABLE; network.vertex_count()];
    potentials[source.0] = 0;
    for vertex in order {
        let base = potentials[vertex.0];
        if base >= UNREACHABLE {
            continue;
        }
        for &id in &network.adjacency[vertex.0] {
            let arc = &network.arcs[id.0];
            if let ArcKind::Forward {
                weight, capacity, ..
            } = arc.kind
            {
                if capacity <= 0 {
                    continue;
                }
                let candidate = base
                    .checked_add(weight)
                    .filter(|distance| distance.unsigned_abs() <= COST_LIMIT.unsigned_abs())
                    .ok_or_else(|| {
                        FlowError::InvalidInput(format!(
                            "distance to vertex {} exceeds the cost range",
                            arc.to.0
                        ))
                    })?;
                if candidate < potentials[arc.to.0] {
                    potentials[arc.to.0] = candidate;
                }
            }
        }
    }
    Ok(potentials)
}
