//! The transition gate in front of the audit log.

use std::path::PathBuf;

use specmem_core::LifecycleStatus;

use crate::audit::{AuditEntry, AuditLog};
use crate::error::{GovernanceError, Result};
use crate::lifecycle;

/// Validates lifecycle transitions and records the accepted ones.
#[derive(Debug)]
pub struct Governance {
    log: AuditLog,
}

impl Governance {
    pub fn new(log: AuditLog) -> Self {
        Self { log }
    }

    pub fn in_memory() -> Self {
        Self::new(AuditLog::in_memory())
    }

    /// Governance backed by the audit log file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(AuditLog::open(path)?))
    }

    /// Pure table check; no side effects.
    pub fn validate(&self, from: LifecycleStatus, to: LifecycleStatus) -> Result<()> {
        lifecycle::validate_transition(from, to)
    }

    /// Validate and record one transition of `entity_id`.
    ///
    /// A rejected transition leaves the log untouched. An accepted one is
    /// durable before this returns.
    pub fn transition(
        &self,
        entity_id: &str,
        from: LifecycleStatus,
        to: LifecycleStatus,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<AuditEntry> {
        if !lifecycle::can_transition(from, to) {
            tracing::warn!(entity = entity_id, %from, %to, "lifecycle transition rejected");
            return Err(GovernanceError::Rejected {
                entity_id: entity_id.to_string(),
                from,
                to,
            });
        }
        let entry = self.log.append(entity_id, from, to, actor, reason)?;
        tracing::info!(
            entity = entity_id,
            %from,
            %to,
            sequence = entry.sequence,
            "lifecycle transition recorded"
        );
        Ok(entry)
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// Accepted transitions for one entity, oldest first.
    pub fn history(&self, entity_id: &str) -> Vec<AuditEntry> {
        self.log.entries_for(entity_id)
    }
}
