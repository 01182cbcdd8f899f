//! Typed node identifiers.
//!
//! Every entity in the impact graph is addressed by a prefixed string:
//! `spec:<block id>`, `code:<path>` or `test:<path>`. File paths are stored
//! normalized (forward slashes, no leading `./`) so that identifiers built
//! from adapter links, filesystem walks and changed-file lists compare equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The three kinds of node in the impact graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Spec,
    Code,
    Test,
}

impl NodeKind {
    /// Identifier prefix including the trailing colon.
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeKind::Spec => "spec:",
            NodeKind::Code => "code:",
            NodeKind::Test => "test:",
        }
    }

    /// Whether nodes of this kind are files in the workspace.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::Code | NodeKind::Test)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Spec => write!(f, "SPEC"),
            NodeKind::Code => write!(f, "CODE"),
            NodeKind::Test => write!(f, "TEST"),
        }
    }
}

/// A typed, prefixed node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Identifier for a spec block. A leading `spec:` is accepted and ignored.
    pub fn spec(block_id: &str) -> Result<Self, CoreError> {
        let local = block_id.strip_prefix(NodeKind::Spec.prefix()).unwrap_or(block_id);
        validate_spec_local(local)?;
        Ok(NodeId(format!("{}{local}", NodeKind::Spec.prefix())))
    }

    /// Identifier for a source file.
    pub fn code(path: &str) -> Result<Self, CoreError> {
        Self::file(NodeKind::Code, path)
    }

    /// Identifier for a test file.
    pub fn test(path: &str) -> Result<Self, CoreError> {
        Self::file(NodeKind::Test, path)
    }

    /// Identifier for a file node of the given kind.
    pub fn file(kind: NodeKind, path: &str) -> Result<Self, CoreError> {
        if !kind.is_file() {
            return Self::spec(path);
        }
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return Err(CoreError::InvalidId {
                value: path.to_string(),
                reason: "empty path".into(),
            });
        }
        Ok(NodeId(format!("{}{normalized}", kind.prefix())))
    }

    /// Parse a fully prefixed identifier.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        for kind in [NodeKind::Spec, NodeKind::Code, NodeKind::Test] {
            if let Some(local) = value.strip_prefix(kind.prefix()) {
                return Self::file(kind, local);
            }
        }
        Err(CoreError::InvalidId {
            value: value.to_string(),
            reason: "expected a spec:, code: or test: prefix".into(),
        })
    }

    /// The node kind encoded in the prefix.
    pub fn kind(&self) -> NodeKind {
        if self.0.starts_with(NodeKind::Code.prefix()) {
            NodeKind::Code
        } else if self.0.starts_with(NodeKind::Test.prefix()) {
            NodeKind::Test
        } else {
            NodeKind::Spec
        }
    }

    /// The identifier without its prefix: a block id or a normalized path.
    pub fn local(&self) -> &str {
        &self.0[self.kind().prefix().len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodeId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NodeId::parse(&value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

fn validate_spec_local(local: &str) -> Result<(), CoreError> {
    if local.is_empty() {
        return Err(CoreError::InvalidId {
            value: local.to_string(),
            reason: "empty spec id".into(),
        });
    }
    if local.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidId {
            value: local.to_string(),
            reason: "spec ids may not contain whitespace".into(),
        });
    }
    Ok(())
}

/// Normalize a file path for identifier comparison.
///
/// Converts backslashes, drops `.` components, empty components and any
/// leading `./`. Does not resolve `..`; see [`is_workspace_relative`].
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `path` names something inside the workspace: relative, with no
/// `..` component and no drive prefix.
pub fn is_workspace_relative(path: &str) -> bool {
    let unified = path.trim().replace('\\', "/");
    if unified.is_empty() || unified.starts_with('/') {
        return false;
    }
    let bytes = unified.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return false;
    }
    !unified.split('/').any(|part| part == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_ids_round_trip() {
        let id = NodeId::spec("REQ-1").unwrap();
        assert_eq!(id.as_str(), "spec:REQ-1");
        assert_eq!(id.kind(), NodeKind::Spec);
        assert_eq!(id.local(), "REQ-1");
        assert_eq!(NodeId::spec("spec:REQ-1").unwrap(), id);
    }

    #[test]
    fn file_ids_are_normalized() {
        let id = NodeId::code("./src\\auth//service.py").unwrap();
        assert_eq!(id.as_str(), "code:src/auth/service.py");
        assert_eq!(id.kind(), NodeKind::Code);
        assert_eq!(id.local(), "src/auth/service.py");
    }

    #[test]
    fn parse_requires_prefix() {
        assert_eq!(
            NodeId::parse("test:tests/test_auth.py").unwrap().kind(),
            NodeKind::Test
        );
        assert!(NodeId::parse("auth.py").is_err());
        assert!(NodeId::parse("code:").is_err());
        assert!(NodeId::parse("spec:has space").is_err());
    }

    #[test]
    fn serde_uses_plain_string() {
        let id = NodeId::code("a.py").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"code:a.py\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<NodeId>("\"nope\"").is_err());
    }

    #[test]
    fn ordering_is_by_string() {
        let mut ids = vec![
            NodeId::code("b.py").unwrap(),
            NodeId::code("a.py").unwrap(),
        ];
        ids.sort();
        assert_eq!(ids[0].local(), "a.py");
    }

    #[test]
    fn workspace_relative_paths() {
        assert!(is_workspace_relative("src/a.rs"));
        assert!(is_workspace_relative("./src/a.rs"));
        assert!(!is_workspace_relative("/etc/passwd"));
        assert!(!is_workspace_relative("../other/a.rs"));
        assert!(!is_workspace_relative("src/../../a.rs"));
        assert!(!is_workspace_relative("C:\\code\\a.rs"));
        assert!(!is_workspace_relative(""));
    }
}
