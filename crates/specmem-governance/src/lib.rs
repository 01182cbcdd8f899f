//! SpecGovernance: lifecycle rules and the audit trail.
//!
//! Every status change of a spec goes through [`Governance::transition`],
//! which checks it against a fixed adjacency table and, when accepted,
//! appends one entry to a hash-chained [`AuditLog`].

pub mod audit;
pub mod error;
pub mod governance;
pub mod lifecycle;

pub use audit::{AuditEntry, AuditLog, GENESIS_HASH};
pub use error::{GovernanceError, Result};
pub use governance::Governance;
pub use lifecycle::{allowed_transitions, can_transition, validate_transition};
