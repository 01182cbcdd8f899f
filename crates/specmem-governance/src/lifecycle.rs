//! The lifecycle adjacency table.

use specmem_core::LifecycleStatus;

use crate::error::{GovernanceError, Result};

/// Statuses reachable from `from` in one transition.
pub fn allowed_transitions(from: LifecycleStatus) -> &'static [LifecycleStatus] {
    use LifecycleStatus::*;
    match from {
        Active => &[Deprecated, Legacy],
        Deprecated => &[Active, Legacy, Obsolete],
        Legacy => &[Active, Deprecated, Obsolete],
        Obsolete => &[], // terminal
    }
}

pub fn can_transition(from: LifecycleStatus, to: LifecycleStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Check a status change against the table. Self-transitions are rejected.
pub fn validate_transition(from: LifecycleStatus, to: LifecycleStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(GovernanceError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleStatus::*;

    #[test]
    fn transitions_from_active() {
        assert!(can_transition(Active, Deprecated));
        assert!(can_transition(Active, Legacy));
        assert!(!can_transition(Active, Obsolete));
        assert!(!can_transition(Active, Active));
    }

    #[test]
    fn deprecation_can_be_reverted() {
        assert!(validate_transition(Deprecated, Active).is_ok());
        assert!(validate_transition(Legacy, Active).is_ok());
    }

    #[test]
    fn obsolete_is_terminal() {
        for to in LifecycleStatus::ALL {
            assert!(validate_transition(Obsolete, to).is_err());
        }
    }

    #[test]
    fn no_self_transitions() {
        for s in LifecycleStatus::ALL {
            assert!(!allowed_transitions(s).contains(&s));
        }
    }
}
