//! Error types for lifecycle governance.

use specmem_core::{ErrorKind, LifecycleStatus, StoreError};

/// Errors from transition checks and the audit log.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    #[error("invalid lifecycle transition from {from} to {to} for {entity_id}")]
    Rejected {
        entity_id: String,
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    #[error("audit chain broken at entry {sequence}: {detail}")]
    IntegrityViolation { sequence: u64, detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::InvalidTransition { .. } | GovernanceError::Rejected { .. } => {
                ErrorKind::InvalidTransition
            }
            GovernanceError::IntegrityViolation { .. } => ErrorKind::CorruptStore,
            GovernanceError::Store(e) => e.kind(),
        }
    }
}

/// Result type alias for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
