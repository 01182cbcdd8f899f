//! Staleness of a caller's cached view of a spec.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::NodeId;

/// A caller's cached version lags the spec's history or its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalenessWarning {
    pub spec_id: String,
    pub cached_version: String,
    pub current_version: String,
    /// A newer version than the cached one exists.
    pub newer_version: bool,
    /// Linked code or tests modified after the cached version was captured.
    pub drifted_nodes: Vec<NodeId>,
    pub acknowledged: bool,
}

impl StalenessWarning {
    /// Human-readable summary of why the cached version is stale.
    pub fn reason(&self) -> String {
        let mut parts = Vec::new();
        if self.newer_version {
            parts.push(format!(
                "newer version {} (cached {})",
                self.current_version, self.cached_version
            ));
        }
        if !self.drifted_nodes.is_empty() {
            let nodes: Vec<&str> = self.drifted_nodes.iter().map(NodeId::as_str).collect();
            parts.push(format!("modified since capture: {}", nodes.join(", ")));
        }
        parts.join("; ")
    }
}

/// A recorded "seen it" for one (spec, cached version) pairing.
///
/// Only holds while `latest_version` is still the spec's newest version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub spec_id: String,
    pub version_id: String,
    pub latest_version: String,
    pub acknowledged_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Acknowledgment {
    pub fn new(spec_id: &str, version_id: &str, latest_version: &str) -> Self {
        Self {
            spec_id: spec_id.to_string(),
            version_id: version_id.to_string(),
            latest_version: latest_version.to_string(),
            acknowledged_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    pub fn covers(&self, spec_id: &str, cached: &str, latest: &str) -> bool {
        self.spec_id == spec_id && self.version_id == cached && self.latest_version == latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgment_scope() {
        let ack = Acknowledgment::new("S1", "v1", "v2");
        assert!(ack.covers("S1", "v1", "v2"));
        assert!(!ack.covers("S1", "v1", "v3"));
        assert!(!ack.covers("S2", "v1", "v2"));
    }

    #[test]
    fn reason_text() {
        let w = StalenessWarning {
            spec_id: "S1".into(),
            cached_version: "v1".into(),
            current_version: "v3".into(),
            newer_version: true,
            drifted_nodes: vec![NodeId::code("src/a.py").unwrap()],
            acknowledged: false,
        };
        let reason = w.reason();
        assert!(reason.contains("v3"));
        assert!(reason.contains("code:src/a.py"));
    }
}
