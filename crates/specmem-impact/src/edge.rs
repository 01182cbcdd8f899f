//! Directed, confidence-weighted relations between nodes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::NodeId;

use crate::error::{ImpactError, Result};

/// Confidence carried by explicitly declared links.
pub const EXPLICIT_CONFIDENCE: f64 = 1.0;

/// Relation between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Code file realizes a spec.
    Implements,
    /// Test file verifies a spec.
    Tests,
    /// Spec refers to another spec.
    References,
    /// Heuristic, lexically inferred link.
    Suggested,
}

impl EdgeKind {
    /// Explicit kinds are declared by the spec author and carry confidence 1.0.
    pub fn is_explicit(&self) -> bool {
        !matches!(self, EdgeKind::Suggested)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Implements => write!(f, "IMPLEMENTS"),
            EdgeKind::Tests => write!(f, "TESTS"),
            EdgeKind::References => write!(f, "REFERENCES"),
            EdgeKind::Suggested => write!(f, "SUGGESTED"),
        }
    }
}

/// An edge in the impact graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Weight in [0, 1]; exactly 1.0 for explicit kinds, below 1.0 for
    /// suggestions.
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GraphEdge {
    /// An explicit edge with confidence 1.0.
    pub fn explicit(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
            confidence: EXPLICIT_CONFIDENCE,
            extra: BTreeMap::new(),
        }
    }

    /// A suggested edge with the given confidence.
    pub fn suggested(source: NodeId, target: NodeId, confidence: f64) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Suggested,
            confidence,
            extra: BTreeMap::new(),
        }
    }

    /// Check the confidence rules for this edge's kind.
    pub fn validate(&self) -> Result<()> {
        let c = self.confidence;
        let ok = if self.kind.is_explicit() {
            c == EXPLICIT_CONFIDENCE
        } else {
            c.is_finite() && (0.0..1.0).contains(&c)
        };
        if ok {
            Ok(())
        } else {
            Err(ImpactError::InvalidConfidence {
                kind: self.kind,
                confidence: c,
            })
        }
    }

    /// Uniqueness key: no two edges share (source, target, kind).
    pub fn key(&self) -> (NodeId, NodeId, EdgeKind) {
        (self.source.clone(), self.target.clone(), self.kind)
    }

    /// The endpoint opposite `id`, treating the edge as undirected.
    pub fn other_end(&self, id: &NodeId) -> &NodeId {
        if &self.source == id {
            &self.target
        } else {
            &self.source
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (NodeId, NodeId) {
        (NodeId::code("a.py").unwrap(), NodeId::spec("S1").unwrap())
    }

    #[test]
    fn explicit_edges_have_full_confidence() {
        let (a, s) = ids();
        let e = GraphEdge::explicit(a, s, EdgeKind::Implements);
        assert_eq!(e.confidence, 1.0);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn confidence_rules() {
        let (a, s) = ids();
        assert!(GraphEdge::suggested(a.clone(), s.clone(), 0.6).validate().is_ok());
        assert!(GraphEdge::suggested(a.clone(), s.clone(), 1.0).validate().is_err());
        assert!(GraphEdge::suggested(a.clone(), s.clone(), f64::NAN).validate().is_err());

        let mut e = GraphEdge::explicit(a.clone(), s.clone(), EdgeKind::Tests);
        e.confidence = 0.5;
        assert!(e.validate().is_err());

        // an explicit constructor with the suggested kind still gets 1.0
        assert!(GraphEdge::explicit(a, s, EdgeKind::Suggested).validate().is_err());
    }

    #[test]
    fn other_end_is_symmetric() {
        let (a, s) = ids();
        let e = GraphEdge::explicit(a.clone(), s.clone(), EdgeKind::Implements);
        assert_eq!(e.other_end(&a), &s);
        assert_eq!(e.other_end(&s), &a);
    }

    #[test]
    fn serde_kind_names() {
        let json = serde_json::to_string(&EdgeKind::References).unwrap();
        assert_eq!(json, "\"REFERENCES\"");
    }
}
