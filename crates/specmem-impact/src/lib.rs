//! SpecImpact: the dependency graph between specifications, code and tests.
//!
//! The [`GraphBuilder`] turns canonical spec blocks into an [`ImpactGraph`]
//! with explicit links (confidence 1.0) and heuristically suggested links
//! (confidence below 1.0). The graph answers bounded-depth impact queries:
//! given a set of changed files, which specs, code and tests sit within
//! `depth` hops of them.
//!
//! Nodes and edges live in flat vectors and are addressed through an
//! id-to-index map with per-node adjacency lists, so the persisted form is
//! just the two vectors.

pub mod builder;
pub mod edge;
pub mod error;
pub mod format;
pub mod git;
pub mod graph;
pub mod heuristics;
pub mod node;
pub mod query;

pub use builder::{BuildFailure, BuildReport, GraphBuilder};
pub use edge::{EdgeKind, GraphEdge};
pub use error::{ImpactError, Result};
pub use format::GraphFile;
pub use git::parse_git_diff;
pub use graph::{GraphStats, ImpactGraph};
pub use node::GraphNode;
pub use query::ImpactSet;
