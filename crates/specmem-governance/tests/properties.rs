use proptest::prelude::*;
use specmem_core::LifecycleStatus;
use specmem_governance::{can_transition, Governance};

fn status() -> impl Strategy<Value = LifecycleStatus> {
    (0..LifecycleStatus::ALL.len()).prop_map(|i| LifecycleStatus::ALL[i])
}

proptest! {
    #[test]
    fn prop_only_accepted_transitions_are_logged(
        targets in proptest::collection::vec(status(), 0..20),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let governance = Governance::open(&path).unwrap();

        let mut current = LifecycleStatus::Active;
        let mut accepted = 0;
        for to in targets {
            let result = governance.transition("spec:S1", current, to, None, None);
            prop_assert_eq!(result.is_ok(), can_transition(current, to));
            if result.is_ok() {
                current = to;
                accepted += 1;
            }
            prop_assert_eq!(governance.log().len(), accepted);
        }

        let reopened = Governance::open(&path).unwrap();
        prop_assert_eq!(reopened.log().len(), accepted);
        prop_assert!(reopened.log().verify_integrity().is_ok());
        let entries = reopened.log().entries();
        for pair in entries.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
            prop_assert_eq!(&pair[0].hash, &pair[1].prev_hash);
        }
    }

    #[test]
    fn prop_obsolete_is_terminal(to in status()) {
        prop_assert!(!can_transition(LifecycleStatus::Obsolete, to));
    }
}
