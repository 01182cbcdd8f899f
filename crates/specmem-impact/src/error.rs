//! Error types for the impact graph.

use specmem_core::{CoreError, ErrorKind, NodeId, NodeKind, StoreError};

use crate::edge::EdgeKind;

/// Errors from graph construction, mutation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ImpactError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate edge {from} -[{kind}]-> {to}")]
    DuplicateEdge {
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
    },

    #[error("invalid confidence {confidence} for {kind} edge")]
    InvalidConfidence { kind: EdgeKind, confidence: f64 },

    #[error("node {id} declares kind {declared} but its prefix says {actual}")]
    KindMismatch {
        id: NodeId,
        declared: NodeKind,
        actual: NodeKind,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImpactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImpactError::NodeNotFound(_) => ErrorKind::NotFound,
            ImpactError::DuplicateNode(_)
            | ImpactError::DuplicateEdge { .. }
            | ImpactError::InvalidConfidence { .. }
            | ImpactError::KindMismatch { .. } => ErrorKind::InvalidInput,
            ImpactError::Core(e) => e.kind(),
            ImpactError::Store(e) => e.kind(),
        }
    }
}

/// Result type alias for impact graph operations.
pub type Result<T> = std::result::Result<T, ImpactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let id = NodeId::spec("S1").unwrap();
        assert_eq!(ImpactError::NodeNotFound(id).kind(), ErrorKind::NotFound);
        let err: ImpactError = StoreError::corrupt("g.json", "bad").into();
        assert_eq!(err.kind(), ErrorKind::CorruptStore);
    }
}
