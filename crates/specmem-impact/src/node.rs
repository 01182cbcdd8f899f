//! Graph nodes: specs, code files and test files.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::{NodeId, NodeKind};

/// A node in the impact graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Typed identifier, unique across the graph.
    pub id: NodeId,
    /// Node kind; always agrees with the id prefix.
    pub kind: NodeKind,
    /// Free-form metadata (spec type, status, title, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Last-known modification time of the underlying file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    /// Fields written by newer versions, preserved on re-save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GraphNode {
    /// Create a node whose kind is taken from the id prefix.
    pub fn new(id: NodeId) -> Self {
        Self {
            kind: id.kind(),
            id,
            metadata: BTreeMap::new(),
            modified_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// Builder: attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: set the last-known modification time.
    pub fn with_modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    /// Workspace-relative path for code and test nodes.
    pub fn path(&self) -> Option<&str> {
        self.kind.is_file().then(|| self.id.local())
    }

    /// String metadata value, if present.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
