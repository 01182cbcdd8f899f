//! Lifecycle status of a specification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The closed set of lifecycle states a spec block can be in.
///
/// Which moves between them are legal is decided by the governance
/// adjacency table, not here.
///
/// Serialized in the same uppercase spelling `Display` prints; lowercase
/// input is still accepted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleStatus {
    /// Current, governing specification.
    #[default]
    #[serde(alias = "active")]
    Active,
    /// Scheduled for removal, possibly with a deadline.
    #[serde(alias = "deprecated")]
    Deprecated,
    /// Still describes existing behavior but no longer the target design.
    #[serde(alias = "legacy")]
    Legacy,
    /// Retired. Terminal.
    #[serde(alias = "obsolete")]
    Obsolete,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 4] = [
        LifecycleStatus::Active,
        LifecycleStatus::Deprecated,
        LifecycleStatus::Legacy,
        LifecycleStatus::Obsolete,
    ];

    /// Statuses that put a spec on the deprecation list.
    pub fn is_deprecated_class(&self) -> bool {
        matches!(self, LifecycleStatus::Deprecated | LifecycleStatus::Obsolete)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStatus::Active => write!(f, "ACTIVE"),
            LifecycleStatus::Deprecated => write!(f, "DEPRECATED"),
            LifecycleStatus::Legacy => write!(f, "LEGACY"),
            LifecycleStatus::Obsolete => write!(f, "OBSOLETE"),
        }
    }
}

impl FromStr for LifecycleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LifecycleStatus::Active),
            "deprecated" => Ok(LifecycleStatus::Deprecated),
            "legacy" => Ok(LifecycleStatus::Legacy),
            "obsolete" => Ok(LifecycleStatus::Obsolete),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            "Deprecated".parse::<LifecycleStatus>().unwrap(),
            LifecycleStatus::Deprecated
        );
        assert_eq!(
            " LEGACY ".parse::<LifecycleStatus>().unwrap(),
            LifecycleStatus::Legacy
        );
        assert!("retired".parse::<LifecycleStatus>().is_err());
    }

    #[test]
    fn deprecated_class() {
        assert!(LifecycleStatus::Deprecated.is_deprecated_class());
        assert!(LifecycleStatus::Obsolete.is_deprecated_class());
        assert!(!LifecycleStatus::Active.is_deprecated_class());
        assert!(!LifecycleStatus::Legacy.is_deprecated_class());
    }

    #[test]
    fn serde_matches_display() {
        for status in LifecycleStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::from(status.to_string()));
            let back: LifecycleStatus = serde_json::from_value(json).unwrap();
            assert_eq!(back, status);
        }
        let lower: LifecycleStatus = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(lower, LifecycleStatus::Legacy);
        assert_eq!(LifecycleStatus::default(), LifecycleStatus::Active);
    }
}
