//! Building an impact graph from spec blocks and the workspace tree.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use specmem_core::{is_workspace_relative, normalize_path, NodeId, NodeKind, SpecBlock};

use crate::edge::{EdgeKind, GraphEdge};
use crate::error::Result;
use crate::graph::{Arena, ImpactGraph};
use crate::heuristics::{
    classify_path, is_source_file, link_strength, suggested_confidence, SKIPPED_DIRS,
};
use crate::node::GraphNode;

/// Default minimum link strength for a suggested edge.
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.5;

/// A block that was left out of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub block_id: String,
    pub reason: String,
}

/// Summary of a graph build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub specs: usize,
    pub explicit_edges: usize,
    pub suggested_edges: usize,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds the spec/code/test graph for one workspace.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    root: PathBuf,
    suggestion_threshold: Option<f64>,
}

/// A link after validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Link {
    Spec(String),
    File(NodeKind, String),
}

#[derive(Debug)]
struct Resolved<'a> {
    block: &'a SpecBlock,
    node_id: NodeId,
    links: BTreeSet<Link>,
}

impl GraphBuilder {
    /// A builder resolving links relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suggestion_threshold: Some(DEFAULT_SUGGESTION_THRESHOLD),
        }
    }

    /// Builder: set the minimum strength for suggested edges.
    pub fn with_suggestion_threshold(mut self, threshold: f64) -> Self {
        self.suggestion_threshold = Some(threshold);
        self
    }

    /// Builder: skip the workspace walk; only explicit links are added.
    pub fn without_suggestions(mut self) -> Self {
        self.suggestion_threshold = None;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the graph, persisting it to `storage_path` when given.
    pub fn build(&self, blocks: &[SpecBlock], storage_path: Option<PathBuf>) -> Result<ImpactGraph> {
        self.build_with_report(blocks, storage_path)
            .map(|(graph, _)| graph)
    }

    /// Build the graph and report which blocks were skipped and why.
    ///
    /// A block with an invalid id, a duplicate id, an empty link, a link to
    /// an unknown or skipped spec, or a link path outside the workspace is
    /// left out entirely.
    pub fn build_with_report(
        &self,
        blocks: &[SpecBlock],
        storage_path: Option<PathBuf>,
    ) -> Result<(ImpactGraph, BuildReport)> {
        let (arena, report) = self.assemble(blocks)?;
        let graph = ImpactGraph::from_arena(arena, storage_path);
        graph.save()?;
        tracing::info!(
            root = %self.root.display(),
            specs = report.specs,
            explicit = report.explicit_edges,
            suggested = report.suggested_edges,
            skipped = report.failures.len(),
            "impact graph built"
        );
        Ok((graph, report))
    }

    fn assemble(&self, blocks: &[SpecBlock]) -> Result<(Arena, BuildReport)> {
        let mut report = BuildReport::default();
        let mut resolved = resolve_blocks(blocks, &mut report.failures);
        drop_unresolvable(&mut resolved, &mut report.failures);
        for failure in &report.failures {
            tracing::warn!(block = %failure.block_id, reason = %failure.reason, "skipping spec block");
        }

        let mut arena = Arena::default();
        for r in &resolved {
            arena.insert_node(spec_node(r.block, r.node_id.clone()))?;
        }

        let mut linked_paths = HashSet::new();
        for r in &resolved {
            for link in &r.links {
                let edge = match link {
                    Link::Spec(target) => GraphEdge::explicit(
                        r.node_id.clone(),
                        NodeId::spec(target)?,
                        EdgeKind::References,
                    ),
                    Link::File(kind, path) => {
                        let id = NodeId::file(*kind, path)?;
                        arena.ensure_node(self.file_node(id.clone()))?;
                        linked_paths.insert(id.local().to_string());
                        let edge_kind = match kind {
                            NodeKind::Test => EdgeKind::Tests,
                            _ => EdgeKind::Implements,
                        };
                        GraphEdge::explicit(id, r.node_id.clone(), edge_kind)
                    }
                };
                arena.insert_edge(edge)?;
                report.explicit_edges += 1;
            }
        }
        report.specs = resolved.len();

        if let Some(threshold) = self.suggestion_threshold {
            for path in self.discover_files() {
                if linked_paths.contains(&path) {
                    continue;
                }
                let id = NodeId::file(classify_path(&path), &path)?;
                for r in &resolved {
                    let strength = link_strength(&path, &r.block.text);
                    if strength <= 0.0 || strength < threshold {
                        continue;
                    }
                    arena.ensure_node(self.file_node(id.clone()))?;
                    if arena.has_edge(&id, &r.node_id, EdgeKind::Suggested) {
                        continue;
                    }
                    arena.insert_edge(GraphEdge::suggested(
                        id.clone(),
                        r.node_id.clone(),
                        suggested_confidence(strength),
                    ))?;
                    report.suggested_edges += 1;
                }
            }
        }

        Ok((arena, report))
    }

    fn file_node(&self, id: NodeId) -> GraphNode {
        let node = GraphNode::new(id);
        match self.modified_time(node.id.local()) {
            Some(at) => node.with_modified_at(at),
            None => node,
        }
    }

    fn modified_time(&self, path: &str) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.root.join(path)).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Workspace-relative paths of source files, in walk order.
    fn discover_files(&self) -> Vec<String> {
        if !self.root.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable path");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&self.root).ok()?;
                let path = normalize_path(&rel.to_string_lossy());
                (!path.is_empty()).then_some(path)
            })
            .collect()
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
}

fn spec_node(block: &SpecBlock, id: NodeId) -> GraphNode {
    GraphNode::new(id)
        .with_metadata("type", block.spec_type.to_string())
        .with_metadata("status", block.status.to_string())
        .with_metadata("source", block.source.clone())
        .with_metadata("title", block.title())
        .with_metadata("pinned", block.pinned)
}

/// Validate ids and links; the first block with a given id wins.
fn resolve_blocks<'a>(blocks: &'a [SpecBlock], failures: &mut Vec<BuildFailure>) -> Vec<Resolved<'a>> {
    let mut ids: BTreeSet<String> = BTreeSet::new();
    let mut candidates = Vec::new();
    for block in blocks {
        let node_id = match block.node_id() {
            Ok(id) => id,
            Err(e) => {
                failures.push(failure(block, e));
                continue;
            }
        };
        let local = node_id.local().to_string();
        if ids.contains(&local) {
            failures.push(failure(block, format!("duplicate spec id '{local}'")));
            continue;
        }
        ids.insert(local);
        candidates.push((block, node_id));
    }

    let mut resolved = Vec::new();
    'blocks: for (block, node_id) in candidates {
        let mut links = BTreeSet::new();
        for raw in &block.links {
            match resolve_link(raw, &ids) {
                Ok(link) => {
                    links.insert(link);
                }
                Err(reason) => {
                    failures.push(failure(block, reason));
                    continue 'blocks;
                }
            }
        }
        resolved.push(Resolved {
            block,
            node_id,
            links,
        });
    }
    resolved
}

fn resolve_link(raw: &str, known: &BTreeSet<String>) -> std::result::Result<Link, String> {
    let link = raw.trim();
    if link.is_empty() {
        return Err("empty link".into());
    }
    if let Some(target) = link.strip_prefix(NodeKind::Spec.prefix()) {
        return if known.contains(target) {
            Ok(Link::Spec(target.to_string()))
        } else {
            Err(format!("link to unknown spec '{target}'"))
        };
    }
    if known.contains(link) {
        return Ok(Link::Spec(link.to_string()));
    }
    if !is_workspace_relative(link) {
        return Err(format!("link path '{link}' is outside the workspace"));
    }
    let path = normalize_path(link);
    if path.is_empty() {
        return Err("empty link".into());
    }
    Ok(Link::File(classify_path(&path), path))
}

/// Drop blocks referencing a dropped block until nothing changes.
fn drop_unresolvable(resolved: &mut Vec<Resolved<'_>>, failures: &mut Vec<BuildFailure>) {
    loop {
        let alive: HashSet<String> = resolved
            .iter()
            .map(|r| r.node_id.local().to_string())
            .collect();
        let dead: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.links
                    .iter()
                    .any(|l| matches!(l, Link::Spec(t) if !alive.contains(t)))
            })
            .map(|(i, _)| i)
            .collect();
        if dead.is_empty() {
            return;
        }
        for i in dead.into_iter().rev() {
            let r = resolved.remove(i);
            failures.push(failure(r.block, "references a skipped spec"));
        }
    }
}

fn failure(block: &SpecBlock, reason: impl ToString) -> BuildFailure {
    BuildFailure {
        block_id: block.id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmem_core::{LifecycleStatus, SpecType};

    fn id(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    fn req(id: &str, text: &str) -> SpecBlock {
        SpecBlock::new(id, SpecType::Requirement, text)
    }

    #[test]
    fn explicit_links_become_edges() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![
            req("S1", "Users shall authenticate.")
                .link("src/auth.py")
                .link("tests/test_auth.py"),
            req("S2", "Sessions expire.").link("spec:S1"),
        ];
        let (g, report) = GraphBuilder::new(dir.path())
            .without_suggestions()
            .build_with_report(&blocks, None)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.specs, 2);
        assert_eq!(report.explicit_edges, 3);
        assert_eq!(g.node_count(), 4);

        let edges = g.edges_of(&id("spec:S1")).unwrap();
        let kinds: BTreeSet<EdgeKind> = edges.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EdgeKind::Implements));
        assert!(kinds.contains(&EdgeKind::Tests));
        assert!(kinds.contains(&EdgeKind::References));
        assert!(edges.iter().all(|e| e.confidence == 1.0));
    }

    #[test]
    fn spec_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![req("S1", "# Login\nUsers log in.").with_status(LifecycleStatus::Legacy)];
        let g = GraphBuilder::new(dir.path())
            .without_suggestions()
            .build(&blocks, None)
            .unwrap();
        let node = g.node(&id("spec:S1")).unwrap();
        assert_eq!(node.meta_str("title"), Some("Login"));
        assert_eq!(node.meta_str("status"), Some("LEGACY"));
        assert_eq!(node.meta_str("type"), Some("requirement"));
    }

    #[test]
    fn bad_blocks_are_skipped_whole() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![
            req("S1", "ok").link("src/a.py"),
            req("S1", "duplicate").link("src/b.py"),
            req("bad id", "whitespace"),
            req("S3", "unknown").link("src/c.py").link("spec:NOPE"),
            req("S4", "escapes").link("../outside.py"),
            req("S5", "absolute").link("/etc/passwd"),
            req("S6", "empty").link("  "),
            req("S7", "depends on skipped").link("S3"),
        ];
        let (g, report) = GraphBuilder::new(dir.path())
            .without_suggestions()
            .build_with_report(&blocks, None)
            .unwrap();

        assert_eq!(report.specs, 1);
        assert_eq!(report.failures.len(), 7);
        assert!(g.contains(&id("spec:S1")));
        assert!(!g.contains(&id("code:src/b.py")));
        assert!(!g.contains(&id("code:src/c.py")));
        assert!(!g.contains(&id("spec:S7")));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn file_nodes_carry_mtime() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/auth.py"), "pass").unwrap();
        let blocks = vec![req("S1", "auth").link("src/auth.py").link("src/missing.py")];
        let g = GraphBuilder::new(dir.path())
            .without_suggestions()
            .build(&blocks, None)
            .unwrap();
        assert!(g.node(&id("code:src/auth.py")).unwrap().modified_at.is_some());
        assert!(g.node(&id("code:src/missing.py")).unwrap().modified_at.is_none());
    }

    #[test]
    fn suggestions_from_path_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for f in [
            "src/session_manager.py",
            "src/billing.py",
            "src/auth.py",
            "node_modules/session/session.js",
            ".git/session.py",
        ] {
            let p = root.join(f);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "").unwrap();
        }
        let blocks = vec![req(
            "S1",
            "The session manager shall expire idle sessions after auth.",
        )
        .link("src/auth.py")];

        let (g, report) = GraphBuilder::new(root).build_with_report(&blocks, None).unwrap();
        assert_eq!(report.suggested_edges, 1);
        let edges = g.edges_of(&id("code:src/session_manager.py")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::Suggested);
        assert!(edges[0].confidence < 1.0);
        // explicitly linked files are not also suggested
        assert_eq!(g.edges_of(&id("code:src/auth.py")).unwrap().len(), 1);
        assert!(!g.contains(&id("code:src/billing.py")));
        assert!(!g.contains(&id("code:node_modules/session/session.js")));
    }

    #[test]
    fn persists_when_path_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".specmem/impact_graph.json");
        let blocks = vec![req("S1", "x").link("src/a.py")];
        GraphBuilder::new(dir.path())
            .without_suggestions()
            .build(&blocks, Some(path.clone()))
            .unwrap();
        let loaded = ImpactGraph::load(&path).unwrap();
        assert_eq!(loaded.edge_count(), 1);
    }

    /// Scenario: a change to src/auth.py at depth 1 reaches S1 only; at
    /// depth 2 it also reaches the test.
    #[test]
    fn impact_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![req("S1", "Authentication")
            .link("src/auth.py")
            .link("tests/test_auth.py")];
        let g = GraphBuilder::new(dir.path())
            .without_suggestions()
            .build(&blocks, None)
            .unwrap();

        let one = g.query_impact(&["src/auth.py"], 1, false);
        assert_eq!(one.specs.len(), 1);
        assert_eq!(one.specs[0].id, id("spec:S1"));
        assert!(one.tests.is_empty());

        let two = g.query_impact(&["src/auth.py"], 2, false);
        assert_eq!(two.tests.len(), 1);
        assert_eq!(two.tests[0].id, id("test:tests/test_auth.py"));
    }
}
