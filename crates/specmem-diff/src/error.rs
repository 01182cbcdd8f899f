//! Error types for the version store.

use specmem_core::{CoreError, ErrorKind, StoreError};
use specmem_governance::GovernanceError;
use specmem_impact::ImpactError;

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("spec not tracked: {0}")]
    SpecNotFound(String),

    #[error("no version '{marker}' in the history of {spec_id}")]
    VersionNotFound { spec_id: String, marker: String },

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Impact(#[from] ImpactError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DiffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiffError::SpecNotFound(_) | DiffError::VersionNotFound { .. } => ErrorKind::NotFound,
            DiffError::Governance(e) => e.kind(),
            DiffError::Impact(e) => e.kind(),
            DiffError::Core(e) => e.kind(),
            DiffError::Store(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiffError>;

#[cfg(test)]
mod tests {
    use super::*;
    use specmem_core::LifecycleStatus;

    #[test]
    fn kinds() {
        assert_eq!(DiffError::SpecNotFound("S9".into()).kind(), ErrorKind::NotFound);
        let err: DiffError = GovernanceError::InvalidTransition {
            from: LifecycleStatus::Obsolete,
            to: LifecycleStatus::Active,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }
}
