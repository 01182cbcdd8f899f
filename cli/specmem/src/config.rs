//! `.specmem.toml` workspace configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name searched for when no `--config` is given.
pub const CONFIG_FILE: &str = ".specmem.toml";

/// The top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecmemConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Where the persisted stores live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the graph, version and audit files, relative to
    /// the workspace root.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".specmem")
}

/// Where adapters leave the canonical spec blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// JSON array of spec blocks, relative to the workspace root.
    #[serde(default = "default_blocks")]
    pub blocks: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            blocks: default_blocks(),
        }
    }
}

fn default_blocks() -> PathBuf {
    PathBuf::from(".specmem/blocks.json")
}

/// Impact graph construction and query defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactConfig {
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default)]
    pub include_suggested: bool,
    /// Suggested edges below this confidence are not followed.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Path/text similarity required before the builder suggests a link.
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            include_suggested: false,
            min_confidence: None,
            suggestion_threshold: default_suggestion_threshold(),
        }
    }
}

fn default_depth() -> usize {
    2
}

fn default_suggestion_threshold() -> f64 {
    specmem_impact::builder::DEFAULT_SUGGESTION_THRESHOLD
}

/// Version store query tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_staleness_depth")]
    pub staleness_depth: usize,
    #[serde(default = "default_deprecation_depth")]
    pub deprecation_depth: usize,
    #[serde(default = "default_drift_grace_secs")]
    pub drift_grace_secs: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            staleness_depth: default_staleness_depth(),
            deprecation_depth: default_deprecation_depth(),
            drift_grace_secs: default_drift_grace_secs(),
        }
    }
}

fn default_staleness_depth() -> usize {
    1
}

fn default_deprecation_depth() -> usize {
    2
}

fn default_drift_grace_secs() -> i64 {
    3600
}

impl HistoryConfig {
    pub fn store_options(&self) -> specmem_diff::StoreOptions {
        specmem_diff::StoreOptions {
            staleness_depth: self.staleness_depth,
            deprecation_depth: self.deprecation_depth,
            drift_grace: chrono::Duration::seconds(self.drift_grace_secs),
        }
    }
}

impl SpecmemConfig {
    /// Search upward from `start_dir` for `.specmem.toml`, returning the
    /// parsed config and the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse and validate config text.
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(c) = self.impact.min_confidence {
            anyhow::ensure!(
                (0.0..=1.0).contains(&c),
                "impact.min_confidence must be within [0, 1], got {c}"
            );
        }
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.impact.suggestion_threshold),
            "impact.suggestion_threshold must be within [0, 1], got {}",
            self.impact.suggestion_threshold
        );
        anyhow::ensure!(
            self.history.drift_grace_secs >= 0,
            "history.drift_grace_secs must not be negative"
        );
        Ok(())
    }
}
