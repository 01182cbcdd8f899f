//! Append-only, hash-chained audit log of lifecycle transitions.
//!
//! Each entry stores the hash of its predecessor and a SHA-256 over its own
//! fields plus that predecessor hash. Editing, dropping or reordering any
//! entry breaks the chain from that point on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use specmem_core::hash::hex_encode;
use specmem_core::persist::check_format_version;
use specmem_core::{read_json, write_json_atomic, LifecycleStatus, StoreError, FORMAT_VERSION};

use crate::error::{GovernanceError, Result};

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One accepted lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// 1-based position in the log.
    pub sequence: u64,
    pub entity_id: String,
    pub from: LifecycleStatus,
    pub to: LifecycleStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub prev_hash: String,
    pub hash: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AuditEntry {
    /// Hash over every field except `hash` and `extra`.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.entity_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.from.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.to.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(
            self.timestamp
                .to_rfc3339_opts(SecondsFormat::Nanos, true)
                .as_bytes(),
        );
        hasher.update([0]);
        for field in [&self.actor, &self.reason] {
            match field {
                Some(v) => {
                    hasher.update([1]);
                    hasher.update(v.as_bytes());
                }
                None => hasher.update([0]),
            }
            hasher.update([0]);
        }
        hasher.update(self.prev_hash.as_bytes());
        hex_encode(&hasher.finalize())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AuditFile {
    format_version: u32,
    #[serde(default)]
    entries: Vec<AuditEntry>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    extra: BTreeMap<String, Value>,
}

/// The transition log. Entries are only ever appended.
#[derive(Debug)]
pub struct AuditLog {
    storage_path: Option<PathBuf>,
    state: RwLock<AuditState>,
}

impl AuditLog {
    /// A log that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            storage_path: None,
            state: RwLock::new(AuditState::default()),
        }
    }

    /// Open the log at `path`, starting empty if the file does not exist.
    ///
    /// An existing file whose chain does not verify is rejected as corrupt.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no audit log yet");
            return Ok(Self {
                storage_path: Some(path),
                state: RwLock::new(AuditState::default()),
            });
        }
        let file: AuditFile = read_json(&path)?;
        check_format_version(&path, file.format_version)?;
        verify_chain(&file.entries).map_err(|e| StoreError::corrupt(&path, e))?;
        tracing::debug!(path = %path.display(), entries = file.entries.len(), "audit log loaded");
        Ok(Self {
            storage_path: Some(path),
            state: RwLock::new(AuditState {
                entries: file.entries,
                extra: file.extra,
            }),
        })
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Append one transition record. The caller has already validated it.
    pub(crate) fn append(
        &self,
        entity_id: &str,
        from: LifecycleStatus,
        to: LifecycleStatus,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<AuditEntry> {
        let mut state = self.state.write();
        let (sequence, prev_hash, floor) = match state.entries.last() {
            Some(last) => (last.sequence + 1, last.hash.clone(), Some(last.timestamp)),
            None => (1, GENESIS_HASH.to_string(), None),
        };
        // keep timestamps non-decreasing along the chain
        let now = Utc::now();
        let timestamp = floor.map_or(now, |f| f.max(now));

        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            sequence,
            entity_id: entity_id.to_string(),
            from,
            to,
            timestamp,
            actor: actor.map(str::to_string),
            reason: reason.map(str::to_string),
            prev_hash,
            hash: String::new(),
            extra: BTreeMap::new(),
        };
        entry.hash = entry.compute_hash();

        state.entries.push(entry.clone());
        if let Err(e) = self.persist(&state) {
            state.entries.pop();
            return Err(e);
        }
        Ok(entry)
    }

    fn persist(&self, state: &AuditState) -> Result<()> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };
        #[derive(Serialize)]
        struct AuditFileRef<'a> {
            format_version: u32,
            entries: &'a [AuditEntry],
            #[serde(flatten)]
            extra: &'a BTreeMap<String, Value>,
        }
        write_json_atomic(
            path,
            &AuditFileRef {
                format_version: FORMAT_VERSION,
                entries: &state.entries,
                extra: &state.extra,
            },
        )?;
        Ok(())
    }

    /// All entries in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().entries.clone()
    }

    /// Entries for one entity, ordered by timestamp then sequence.
    pub fn entries_for(&self, entity_id: &str) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = self
            .state
            .read()
            .entries
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.sequence.cmp(&b.sequence))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Re-check the whole chain.
    pub fn verify_integrity(&self) -> Result<()> {
        verify_chain(&self.state.read().entries)
    }
}

fn verify_chain(entries: &[AuditEntry]) -> Result<()> {
    let mut prev = GENESIS_HASH.to_string();
    for (i, e) in entries.iter().enumerate() {
        let expected_seq = i as u64 + 1;
        if e.sequence != expected_seq {
            return Err(GovernanceError::IntegrityViolation {
                sequence: e.sequence,
                detail: format!("expected sequence {expected_seq}"),
            });
        }
        if e.prev_hash != prev {
            return Err(GovernanceError::IntegrityViolation {
                sequence: e.sequence,
                detail: "previous hash does not match".into(),
            });
        }
        if e.compute_hash() != e.hash {
            return Err(GovernanceError::IntegrityViolation {
                sequence: e.sequence,
                detail: "entry hash does not match its contents".into(),
            });
        }
        prev = e.hash.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleStatus::*;

    #[test]
    fn append_builds_a_chain() {
        let log = AuditLog::in_memory();
        let a = log.append("spec:S1", Active, Deprecated, Some("ana"), None).unwrap();
        let b = log
            .append("spec:S1", Deprecated, Obsolete, None, Some("replaced by S2"))
            .unwrap();
        assert_eq!(a.sequence, 1);
        assert_eq!(a.prev_hash, GENESIS_HASH);
        assert_eq!(b.prev_hash, a.hash);
        assert!(b.timestamp >= a.timestamp);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn entries_for_filters_and_orders() {
        let log = AuditLog::in_memory();
        log.append("spec:S1", Active, Legacy, None, None).unwrap();
        log.append("spec:S2", Active, Deprecated, None, None).unwrap();
        log.append("spec:S1", Legacy, Active, None, None).unwrap();
        let s1 = log.entries_for("spec:S1");
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].to, Legacy);
        assert_eq!(s1[1].to, Active);
        assert!(log.entries_for("spec:none").is_empty());
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let log = AuditLog::open(&path).unwrap();
        log.append("spec:S1", Active, Deprecated, Some("ana"), Some("old"))
            .unwrap();
        log.append("spec:S1", Deprecated, Obsolete, None, None).unwrap();

        let reloaded = AuditLog::open(&path).unwrap();
        assert_eq!(reloaded.entries(), log.entries());
        assert!(reloaded.verify_integrity().is_ok());
    }

    #[test]
    fn tampered_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let log = AuditLog::open(&path).unwrap();
        log.append("spec:S1", Active, Deprecated, None, None).unwrap();
        log.append("spec:S1", Deprecated, Obsolete, None, None).unwrap();

        let mut raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["entries"][0]["to"] = Value::from("LEGACY");
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = AuditLog::open(&path).unwrap_err();
        assert_eq!(err.kind(), specmem_core::ErrorKind::CorruptStore);
    }

    #[test]
    fn dropped_entry_breaks_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let log = AuditLog::open(&path).unwrap();
        for (from, to) in [(Active, Legacy), (Legacy, Active), (Active, Deprecated)] {
            log.append("spec:S1", from, to, None, None).unwrap();
        }
        let mut raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["entries"].as_array_mut().unwrap().remove(1);
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();
        assert!(AuditLog::open(&path).is_err());
    }

    #[test]
    fn unknown_fields_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let log = AuditLog::open(&path).unwrap();
        log.append("spec:S1", Active, Legacy, None, None).unwrap();

        let mut raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["signed_by"] = Value::from("ci");
        raw["entries"][0]["ticket"] = Value::from("OPS-1");
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let log = AuditLog::open(&path).unwrap();
        log.append("spec:S1", Legacy, Active, None, None).unwrap();
        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["signed_by"], "ci");
        assert_eq!(raw["entries"][0]["ticket"], "OPS-1");
    }

    #[test]
    fn failed_write_leaves_log_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let log = AuditLog {
            storage_path: Some(blocker.join("audit.json")),
            state: RwLock::new(AuditState::default()),
        };
        assert!(log.append("spec:S1", Active, Legacy, None, None).is_err());
        assert!(log.is_empty());
    }
}
