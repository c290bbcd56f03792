mod arc;
mod min_cost_flow;
mod network;

pub use arc::{Arc, ArcId, ArcKind};
pub use min_cost_flow::{FlowPath, FlowSolution, COST_LIMIT};
pub use network::{FlowNetwork, VertexId};
