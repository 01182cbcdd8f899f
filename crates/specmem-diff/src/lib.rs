//! SpecDiff: the temporal side of SpecMem.
//!
//! A [`VersionStore`] keeps an append-only history per spec and derives from
//! it statement-level diffs, contradictions between versions, staleness of
//! a caller's cached view, drift of linked code, and a ranked list of
//! deprecations.

pub mod contradiction;
pub mod deprecation;
pub mod diff;
pub mod drift;
pub mod error;
pub mod segment;
pub mod staleness;
pub mod store;
pub mod version;

pub use contradiction::{Contradiction, ContradictionDetector, NegationHeuristic};
pub use deprecation::Deprecation;
pub use diff::{diff_texts, ChangeKind, ChangeUnit, SpecChange};
pub use drift::{DriftItem, DriftReport, DriftScorer, DriftSeverity, RecencyScorer};
pub use error::{DiffError, Result};
pub use staleness::{Acknowledgment, StalenessWarning};
pub use store::{StoreOptions, VersionStore};
pub use version::SpecVersion;
