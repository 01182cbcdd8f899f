//! The on-disk SpecMem workspace: config, spec blocks and the three stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use specmem_core::SpecBlock;
use specmem_diff::{SpecVersion, VersionStore};
use specmem_governance::Governance;
use specmem_impact::{BuildReport, GraphBuilder, ImpactGraph};

use crate::config::SpecmemConfig;

pub const GRAPH_FILE: &str = "impact_graph.json";
pub const VERSIONS_FILE: &str = "versions.json";
pub const AUDIT_FILE: &str = "audit.json";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: SpecmemConfig,
}

/// Outcome of tracking the current spec blocks.
#[derive(Debug, Default, serde::Serialize)]
pub struct TrackSummary {
    pub recorded: Vec<SpecVersion>,
    pub unchanged: usize,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: SpecmemConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Locate the workspace for `start_dir`.
    ///
    /// An explicit `config_path` is loaded as-is and `start_dir` is the
    /// root. Otherwise the nearest `.specmem.toml` at or above `start_dir`
    /// decides the root; without one, defaults apply at `start_dir`.
    pub fn discover(start_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            let config = SpecmemConfig::load(path)?;
            return Ok(Self::new(start_dir, config));
        }
        match SpecmemConfig::find_and_load(start_dir)? {
            Some((config, root)) => Ok(Self::new(root, config)),
            None => Ok(Self::new(start_dir, SpecmemConfig::default())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SpecmemConfig {
        &self.config
    }

    /// Directory holding the graph, version store and audit log.
    pub fn storage_dir(&self) -> PathBuf {
        self.root.join(&self.config.storage.dir)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.storage_dir().join(GRAPH_FILE)
    }

    pub fn versions_path(&self) -> PathBuf {
        self.storage_dir().join(VERSIONS_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.storage_dir().join(AUDIT_FILE)
    }

    pub fn blocks_path(&self) -> PathBuf {
        self.root.join(&self.config.sources.blocks)
    }

    /// Read the canonical spec blocks left by the adapters.
    pub fn load_blocks(&self) -> Result<Vec<SpecBlock>> {
        let path = self.blocks_path();
        if !path.is_file() {
            anyhow::bail!(
                "no spec blocks found at {}\nPoint [sources] blocks in .specmem.toml at the adapter output.",
                path.display()
            );
        }
        let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let blocks: Vec<SpecBlock> = serde_json::from_slice(&data)
            .with_context(|| format!("parsing spec blocks in {}", path.display()))?;
        tracing::debug!(path = %path.display(), blocks = blocks.len(), "spec blocks loaded");
        Ok(blocks)
    }

    pub fn graph_builder(&self) -> GraphBuilder {
        GraphBuilder::new(&self.root).with_suggestion_threshold(self.config.impact.suggestion_threshold)
    }

    /// Rebuild the impact graph from `blocks` and persist it.
    pub fn build_graph(&self, blocks: &[SpecBlock]) -> Result<(ImpactGraph, BuildReport)> {
        let path = self.graph_path();
        self.graph_builder()
            .build_with_report(blocks, Some(path.clone()))
            .with_context(|| format!("building impact graph at {}", path.display()))
    }

    /// Load the persisted impact graph.
    pub fn load_graph(&self) -> Result<ImpactGraph> {
        let path = self.graph_path();
        if !path.is_file() {
            anyhow::bail!(
                "no impact graph found at {}\nRun `specmem graph build` first.",
                path.display()
            );
        }
        ImpactGraph::load(&path).with_context(|| format!("loading {}", path.display()))
    }

    /// Load the impact graph if one has been built.
    pub fn load_graph_optional(&self) -> Result<Option<ImpactGraph>> {
        if self.graph_path().is_file() {
            self.load_graph().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Governance over the workspace audit log.
    pub fn governance(&self) -> Result<Arc<Governance>> {
        let path = self.audit_path();
        let governance =
            Governance::open(&path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Arc::new(governance))
    }

    /// Open the version store wired to governance, the config's query
    /// options and, when built, the impact graph.
    pub fn version_store(&self) -> Result<VersionStore> {
        let path = self.versions_path();
        let mut store = VersionStore::open(&path, self.governance()?)
            .with_context(|| format!("opening {}", path.display()))?
            .with_options(self.config.history.store_options());
        if let Some(graph) = self.load_graph_optional()? {
            store = store.with_impact_graph(Arc::new(graph));
        }
        Ok(store)
    }

    /// Record a new version for every block whose text, status or deadline
    /// differs from the latest tracked one.
    pub fn track(&self, store: &VersionStore, blocks: &[SpecBlock]) -> Result<TrackSummary> {
        let mut summary = TrackSummary::default();
        for block in blocks {
            if store.is_current(block) {
                summary.unchanged += 1;
                continue;
            }
            let version = store
                .track_version(block)
                .with_context(|| format!("tracking {}", block.id))?;
            summary.recorded.push(version);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmem_core::{LifecycleStatus, SpecType};

    fn write_blocks(ws: &Workspace, blocks: &[SpecBlock]) {
        let path = ws.blocks_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_vec_pretty(blocks).unwrap()).unwrap();
    }

    #[test]
    fn discover_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());
        assert_eq!(ws.graph_path(), dir.path().join(".specmem/impact_graph.json"));
        assert_eq!(ws.versions_path(), dir.path().join(".specmem/versions.json"));
        assert_eq!(ws.audit_path(), dir.path().join(".specmem/audit.json"));
        assert_eq!(ws.blocks_path(), dir.path().join(".specmem/blocks.json"));
    }

    #[test]
    fn discover_uses_config_directory_as_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".specmem.toml"), "[storage]\ndir = \"state\"\n").unwrap();
        let nested = dir.path().join("src");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested, None).unwrap();
        assert_eq!(ws.root(), dir.path());
        assert_eq!(ws.graph_path(), dir.path().join("state/impact_graph.json"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Workspace::discover(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn missing_blocks_and_graph_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());
        let err = ws.load_blocks().unwrap_err();
        assert!(err.to_string().contains("no spec blocks"));
        let err = ws.load_graph().unwrap_err();
        assert!(err.to_string().contains("specmem graph build"));
        assert!(ws.load_graph_optional().unwrap().is_none());
    }

    #[test]
    fn build_then_track_only_changed_blocks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/auth.py"), "def login(): ...\n").unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());

        let mut blocks = vec![
            SpecBlock::new("S1", SpecType::Requirement, "Users shall log in.").link("src/auth.py"),
            SpecBlock::new("S2", SpecType::Design, "Sessions expire."),
        ];
        write_blocks(&ws, &blocks);
        let loaded = ws.load_blocks().unwrap();
        assert_eq!(loaded, blocks);

        let (graph, report) = ws.build_graph(&loaded).unwrap();
        assert!(report.is_clean());
        assert_eq!(graph.stats().specs, 2);
        assert!(ws.graph_path().is_file());

        let store = ws.version_store().unwrap();
        let first = ws.track(&store, &blocks).unwrap();
        assert_eq!(first.recorded.len(), 2);
        assert_eq!(first.unchanged, 0);

        blocks[1].text = "Sessions expire after 30 minutes.".into();
        let second = ws.track(&store, &blocks).unwrap();
        assert_eq!(second.recorded.len(), 1);
        assert_eq!(second.recorded[0].spec_id, "S2");
        assert_eq!(second.unchanged, 1);

        // reopening sees the persisted history
        let reopened = ws.version_store().unwrap();
        assert_eq!(reopened.get_history("S2", None).unwrap().len(), 2);
    }

    #[test]
    fn tracking_a_forbidden_status_change_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());
        let store = ws.version_store().unwrap();
        let block = SpecBlock::new("S1", SpecType::Requirement, "Text.")
            .with_status(LifecycleStatus::Obsolete);
        ws.track(&store, &[block.clone()]).unwrap();

        let revived = block.with_status(LifecycleStatus::Active);
        let err = ws.track(&store, &[revived]).unwrap_err();
        assert!(format!("{err:#}").contains("S1"));
        assert_eq!(store.get_history("S1", None).unwrap().len(), 1);
    }
}
