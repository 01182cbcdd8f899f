//! Persisted graph format.
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "nodes": [ { "id": "spec:S1", "kind": "SPEC", "metadata": {...} }, ... ],
//!   "edges": [ { "source": "code:a.py", "target": "spec:S1",
//!                "kind": "IMPLEMENTS", "confidence": 1.0 }, ... ]
//! }
//! ```
//!
//! Unknown top-level, node and edge fields are carried through a load/save
//! cycle untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::FORMAT_VERSION;

use crate::edge::GraphEdge;
use crate::node::GraphNode;

/// Owned form of the graph file, used when loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub format_version: u32,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Borrowed form of the graph file, used when saving.
#[derive(Debug, Serialize)]
pub(crate) struct GraphFileRef<'a> {
    pub format_version: u32,
    pub nodes: &'a [GraphNode],
    pub edges: &'a [GraphEdge],
    #[serde(flatten)]
    pub extra: &'a BTreeMap<String, Value>,
}

impl<'a> GraphFileRef<'a> {
    pub(crate) fn new(
        nodes: &'a [GraphNode],
        edges: &'a [GraphEdge],
        extra: &'a BTreeMap<String, Value>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            nodes,
            edges,
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_file() {
        let file: GraphFile = serde_json::from_str(r#"{"format_version":1}"#).unwrap();
        assert!(file.nodes.is_empty());
        assert!(file.edges.is_empty());
    }

    #[test]
    fn ref_and_owned_agree() {
        let nodes = vec![GraphNode::new(specmem_core::NodeId::spec("S1").unwrap())];
        let mut extra = BTreeMap::new();
        extra.insert("generator".to_string(), Value::from("v9"));
        let json = serde_json::to_string(&GraphFileRef::new(&nodes, &[], &extra)).unwrap();
        let back: GraphFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes, nodes);
        assert_eq!(back.extra.get("generator"), Some(&Value::from("v9")));
    }
}
