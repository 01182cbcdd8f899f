//! Code that moved on after its spec last changed.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use specmem_core::NodeId;

/// Bucketed drift score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DriftSeverity {
    /// Quartile buckets of a score in `[0, 1]`.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            DriftSeverity::Critical
        } else if score >= 0.5 {
            DriftSeverity::High
        } else if score >= 0.25 {
            DriftSeverity::Medium
        } else {
            DriftSeverity::Low
        }
    }
}

impl fmt::Display for DriftSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftSeverity::Low => write!(f, "low"),
            DriftSeverity::Medium => write!(f, "medium"),
            DriftSeverity::High => write!(f, "high"),
            DriftSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Scores how far a code file has drifted from its spec.
pub trait DriftScorer: fmt::Debug + Send + Sync {
    /// `elapsed` is the time between the spec's latest version and the
    /// file's modification; `diff_size` the number of change units in the
    /// spec's latest diff. Returns a score in [0, 1].
    fn score(&self, elapsed: Duration, diff_size: usize) -> f64;
}

/// Weighted mix of time since the spec changed and size of that change.
#[derive(Debug, Clone)]
pub struct RecencyScorer {
    pub horizon_days: f64,
    pub size_cap: usize,
    pub time_weight: f64,
}

impl Default for RecencyScorer {
    fn default() -> Self {
        Self {
            horizon_days: 30.0,
            size_cap: 10,
            time_weight: 0.7,
        }
    }
}

impl DriftScorer for RecencyScorer {
    fn score(&self, elapsed: Duration, diff_size: usize) -> f64 {
        let days = elapsed.num_seconds().max(0) as f64 / 86_400.0;
        let time = (days / self.horizon_days).min(1.0);
        let size = if self.size_cap == 0 {
            0.0
        } else {
            (diff_size as f64 / self.size_cap as f64).min(1.0)
        };
        (self.time_weight * time + (1.0 - self.time_weight) * size).clamp(0.0, 1.0)
    }
}

/// One drifted code or test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftItem {
    pub spec_id: String,
    pub node_id: NodeId,
    pub spec_version: String,
    pub spec_updated_at: DateTime<Utc>,
    pub node_modified_at: DateTime<Utc>,
    pub elapsed_days: f64,
    pub diff_size: usize,
    pub severity: f64,
    pub level: DriftSeverity,
}

/// Drifted code and tests across all tracked specs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<DriftItem>,
}

impl DriftReport {
    /// Build a report, ordering items by severity then spec and node id.
    pub fn new(mut items: Vec<DriftItem>) -> Self {
        items.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.spec_id.cmp(&b.spec_id))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        Self {
            generated_at: Utc::now(),
            items,
        }
    }

    /// No drift found.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, level: DriftSeverity) -> usize {
        self.items.iter().filter(|i| i.level == level).count()
    }

    /// Items of one spec, in report order.
    pub fn for_spec<'a>(&'a self, spec_id: &'a str) -> impl Iterator<Item = &'a DriftItem> + 'a {
        self.items.iter().filter(move |i| i.spec_id == spec_id)
    }
}
