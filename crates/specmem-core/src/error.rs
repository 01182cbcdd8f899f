//! Error taxonomy shared across SpecMem crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Coarse classification every crate error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unknown spec id, node id or version referenced by a query.
    NotFound,
    /// Lifecycle status change not present in the adjacency table.
    InvalidTransition,
    /// A persisted file failed structural validation on load.
    CorruptStore,
    /// The underlying storage could not be read or written.
    StoreAccess,
    /// Malformed caller input (identifiers, version markers, statuses).
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::InvalidTransition => write!(f, "invalid-transition"),
            ErrorKind::CorruptStore => write!(f, "corrupt-store"),
            ErrorKind::StoreAccess => write!(f, "store-access"),
            ErrorKind::InvalidInput => write!(f, "invalid-input"),
        }
    }
}

/// Failures of file-backed persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot access store at {path}: {detail}")]
    Access { path: PathBuf, detail: String },

    #[error("corrupt store at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },
}

impl StoreError {
    pub fn access(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        StoreError::Access {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Access { .. } => ErrorKind::StoreAccess,
            StoreError::Corrupt { .. } => ErrorKind::CorruptStore,
        }
    }
}

/// Errors from the shared model.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("unknown lifecycle status '{0}'")]
    UnknownStatus(String),

    #[error("unknown spec type '{0}'")]
    UnknownSpecType(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidId { .. }
            | CoreError::UnknownStatus(_)
            | CoreError::UnknownSpecType(_) => ErrorKind::InvalidInput,
            CoreError::Store(e) => e.kind(),
        }
    }
}
