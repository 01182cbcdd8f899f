//! Shared model for SpecMem.
//!
//! Everything the impact graph, the version store and lifecycle governance
//! agree on lives here: typed node identifiers (`spec:`, `code:`, `test:`),
//! the canonical [`SpecBlock`] produced by adapters, the closed
//! [`LifecycleStatus`] enumeration, content hashing, and the atomic
//! write-temp-then-rename persistence used by every file-backed component.

pub mod block;
pub mod error;
pub mod hash;
pub mod id;
pub mod persist;
pub mod status;
pub mod text;

pub use block::{SpecBlock, SpecType};
pub use error::{CoreError, ErrorKind, StoreError};
pub use hash::{hex_encode, version_id};
pub use id::{is_workspace_relative, normalize_path, NodeId, NodeKind};
pub use persist::{read_json, write_json_atomic, FORMAT_VERSION};
pub use status::LifecycleStatus;
