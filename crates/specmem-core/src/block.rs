//! Canonical specification blocks.
//!
//! Adapters turn Markdown, YAML and other spec formats into [`SpecBlock`]s;
//! everything downstream (graph building, version tracking) consumes only
//! this shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::status::LifecycleStatus;

/// What kind of specification a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecType {
    Requirement,
    Design,
    Task,
    Decision,
    Knowledge,
    Md,
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpecType::Requirement => "requirement",
            SpecType::Design => "design",
            SpecType::Task => "task",
            SpecType::Decision => "decision",
            SpecType::Knowledge => "knowledge",
            SpecType::Md => "md",
        };
        f.write_str(s)
    }
}

impl FromStr for SpecType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requirement" => Ok(SpecType::Requirement),
            "design" => Ok(SpecType::Design),
            "task" => Ok(SpecType::Task),
            "decision" => Ok(SpecType::Decision),
            "knowledge" => Ok(SpecType::Knowledge),
            "md" => Ok(SpecType::Md),
            _ => Err(CoreError::UnknownSpecType(s.to_string())),
        }
    }
}

/// A canonical unit of specification text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecBlock {
    /// Block identifier, unique across the workspace.
    pub id: String,
    /// Kind of specification.
    #[serde(rename = "type")]
    pub spec_type: SpecType,
    /// Full text of the block.
    pub text: String,
    /// File the block was parsed from.
    #[serde(default)]
    pub source: String,
    /// Lifecycle status at parse time.
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Explicit links: workspace-relative file paths or other block ids.
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    /// Removal deadline for deprecated blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl SpecBlock {
    /// Create an active block with no links.
    pub fn new(id: impl Into<String>, spec_type: SpecType, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec_type,
            text: text.into(),
            source: String::new(),
            status: LifecycleStatus::Active,
            tags: Vec::new(),
            links: Vec::new(),
            pinned: false,
            deadline: None,
        }
    }

    /// Builder: set status.
    pub fn with_status(mut self, status: LifecycleStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder: set source file.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Builder: add an explicit link.
    pub fn link(mut self, target: impl Into<String>) -> Self {
        self.links.push(target.into());
        self
    }

    /// Builder: set deprecation deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The block's graph node identifier.
    pub fn node_id(&self) -> Result<NodeId, CoreError> {
        NodeId::spec(&self.id)
    }

    /// A short title: the first heading, else the first non-list line.
    pub fn title(&self) -> String {
        for line in self.text.trim().lines() {
            let line = line.trim();
            if line.starts_with('#') {
                return line.trim_start_matches('#').trim().to_string();
            }
            if !line.is_empty() && !line.starts_with('-') {
                let mut title: String = line.chars().take(50).collect();
                if line.chars().count() > 50 {
                    title.push_str("...");
                }
                return title;
            }
        }
        "Untitled".to_string()
    }
}
