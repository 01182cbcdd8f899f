//! Deprecated specs ranked by how urgently they need attention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use specmem_core::LifecycleStatus;

const TIME_WEIGHT: f64 = 0.6;
const IMPACT_WEIGHT: f64 = 0.4;
/// Days-left scale of the time component: one week left scores 0.5.
const DEADLINE_SCALE_DAYS: f64 = 7.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    pub spec_id: String,
    pub status: LifecycleStatus,
    /// When the current deprecated run began.
    pub deprecated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Live code, tests and specs still connected to this spec.
    pub impacted: usize,
    pub urgency: f64,
    pub expired: bool,
}

/// Urgency in [0, 1] from deadline proximity and remaining dependents.
pub fn urgency(deadline: Option<DateTime<Utc>>, impacted: usize, now: DateTime<Utc>) -> f64 {
    let time = match deadline {
        None => 0.0,
        Some(d) if d <= now => 1.0,
        Some(d) => {
            let days_left = (d - now).num_seconds() as f64 / 86_400.0;
            1.0 / (1.0 + days_left / DEADLINE_SCALE_DAYS)
        }
    };
    let impact = 1.0 - 1.0 / (1.0 + impacted as f64);
    TIME_WEIGHT * time + IMPACT_WEIGHT * impact
}

/// Sort by urgency descending, then spec id.
pub fn rank(deprecations: &mut [Deprecation]) {
    deprecations.sort_by(|a, b| {
        b.urgency
            .total_cmp(&a.urgency)
            .then_with(|| a.spec_id.cmp(&b.spec_id))
    });
}
