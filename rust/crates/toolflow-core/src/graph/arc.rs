use super::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcId(pub usize);

/// Forward arcs carry all labels; a backward arc reads everything through
/// its mate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcKind {
    Forward {
        flow: i64,
        capacity: i64,
        weight: i64,
        in_objective: bool,
        tool: Option<usize>,
    },
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arc {
    pub from: VertexId,
    pub to: VertexId,
    pub mate: ArcId,
    pub kind: ArcKind,
}

impl Arc {
    pub fn is_forward(&self) -> bool {
        matches!(self.kind, ArcKind::Forward { .. })
    }

    pub fn tool(&self) -> Option<usize> {
        match self.kind {
            ArcKind::Forward { tool, .. } => tool,
            ArcKind::Backward => None,
        }
    }

    pub fn in_objective(&self) -> bool {
        matches!(
            self.kind,
            ArcKind::Forward {
                in_objective: true,
                ..
            }
        )
    }
}
