//! Immutable snapshots of a spec.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::{version_id, LifecycleStatus};

/// One tracked version of a spec block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecVersion {
    /// Owning spec. The store file keys histories by it instead of
    /// repeating it per record.
    #[serde(default)]
    pub spec_id: String,
    /// Content-derived id; see [`specmem_core::version_id`].
    pub version_id: String,
    /// 1-based position in the spec's history.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub status: LifecycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SpecVersion {
    pub(crate) fn new(
        spec_id: &str,
        sequence: u64,
        timestamp: DateTime<Utc>,
        text: &str,
        status: LifecycleStatus,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            spec_id: spec_id.to_string(),
            version_id: version_id(spec_id, sequence, text),
            sequence,
            timestamp,
            text: text.to_string(),
            status,
            deadline,
            extra: BTreeMap::new(),
        }
    }

    /// The on-disk form of this version, without `spec_id`.
    pub(crate) fn record(&self) -> VersionRecord<'_> {
        VersionRecord {
            version_id: &self.version_id,
            sequence: self.sequence,
            timestamp: self.timestamp,
            text: &self.text,
            status: self.status,
            deadline: self.deadline,
            extra: &self.extra,
        }
    }

    /// True when the stored id matches the one derived from the content.
    pub fn id_is_consistent(&self) -> bool {
        self.version_id == version_id(&self.spec_id, self.sequence, &self.text)
    }

    /// Whether `marker` names this version: its id, `N` or `#N`.
    pub fn matches_marker(&self, marker: &str) -> bool {
        let marker = marker.trim();
        if marker == self.version_id {
            return true;
        }
        marker
            .strip_prefix('#')
            .unwrap_or(marker)
            .parse::<u64>()
            .is_ok_and(|n| n == self.sequence)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VersionRecord<'a> {
    version_id: &'a str,
    sequence: u64,
    timestamp: DateTime<Utc>,
    text: &'a str,
    status: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(seq: u64, text: &str) -> SpecVersion {
        SpecVersion::new("S1", seq, Utc::now(), text, LifecycleStatus::Active, None)
    }

    #[test]
    fn id_is_derived_from_content() {
        let a = v(1, "Shall support X");
        assert_eq!(a.version_id.len(), 16);
        assert!(a.id_is_consistent());
        assert_eq!(a.version_id, v(1, "Shall support X").version_id);
        assert_ne!(a.version_id, v(2, "Shall support X").version_id);

        let mut tampered = a.clone();
        tampered.text.push('!');
        assert!(!tampered.id_is_consistent());
    }

    #[test]
    fn markers() {
        let a = v(3, "x");
        assert!(a.matches_marker("3"));
        assert!(a.matches_marker("#3"));
        assert!(a.matches_marker(&a.version_id.clone()));
        assert!(!a.matches_marker("4"));
        assert!(!a.matches_marker("latest"));
    }

    #[test]
    fn spec_id_is_kept_in_output_but_not_in_record() {
        let a = v(1, "x");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["spec_id"], "S1");
        assert_eq!(json["status"], "ACTIVE");

        let record = serde_json::to_value(a.record()).unwrap();
        assert!(record.get("spec_id").is_none());
        assert_eq!(record["version_id"], json["version_id"]);
        assert_eq!(record["sequence"], 1);

        let mut back: SpecVersion = serde_json::from_value(record).unwrap();
        back.spec_id = "S1".into();
        assert_eq!(back, a);
    }
}
