//! The impact graph container.
//!
//! Holds nodes and edges in an arena guarded by a single read/write lock.
//! Every mutation takes the write lock, applies the change in memory, then
//! atomically rewrites the backing file; if the write fails the in-memory
//! change is rolled back before the lock is released.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::persist::check_format_version;
use specmem_core::{read_json, write_json_atomic, NodeId, NodeKind, StoreError};

use crate::edge::{EdgeKind, GraphEdge};
use crate::error::{ImpactError, Result};
use crate::format::{GraphFile, GraphFileRef};
use crate::node::GraphNode;
use crate::query::{self, ImpactSet};

/// Node and edge counts by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub specs: usize,
    pub code: usize,
    pub tests: usize,
    pub explicit_edges: usize,
    pub suggested_edges: usize,
}

/// Flat node/edge storage with an id index and per-node incident edges.
#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
    index: HashMap<NodeId, usize>,
    /// Incident edge indices per node, both directions.
    pub(crate) adjacency: Vec<Vec<usize>>,
    edge_keys: HashSet<(NodeId, NodeId, EdgeKind)>,
    extra: BTreeMap<String, Value>,
}

impl Arena {
    pub(crate) fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn insert_node(&mut self, node: GraphNode) -> Result<usize> {
        if node.kind != node.id.kind() {
            return Err(ImpactError::KindMismatch {
                actual: node.id.kind(),
                declared: node.kind,
                id: node.id,
            });
        }
        if self.index.contains_key(&node.id) {
            return Err(ImpactError::DuplicateNode(node.id));
        }
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        Ok(idx)
    }

    /// Insert `node` unless a node with the same id exists; returns its index.
    pub(crate) fn ensure_node(&mut self, node: GraphNode) -> Result<usize> {
        match self.index_of(&node.id) {
            Some(idx) => Ok(idx),
            None => self.insert_node(node),
        }
    }

    pub(crate) fn insert_edge(&mut self, edge: GraphEdge) -> Result<()> {
        edge.validate()?;
        let src = self
            .index_of(&edge.source)
            .ok_or_else(|| ImpactError::NodeNotFound(edge.source.clone()))?;
        let dst = self
            .index_of(&edge.target)
            .ok_or_else(|| ImpactError::NodeNotFound(edge.target.clone()))?;
        let key = edge.key();
        if self.edge_keys.contains(&key) {
            return Err(ImpactError::DuplicateEdge {
                from: key.0,
                to: key.1,
                kind: key.2,
            });
        }
        let idx = self.edges.len();
        self.edges.push(edge);
        self.edge_keys.insert(key);
        self.adjacency[src].push(idx);
        if dst != src {
            self.adjacency[dst].push(idx);
        }
        Ok(())
    }

    pub(crate) fn has_edge(&self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> bool {
        self.edge_keys
            .contains(&(source.clone(), target.clone(), kind))
    }

    fn pop_node(&mut self) {
        if let Some(node) = self.nodes.pop() {
            self.index.remove(&node.id);
            self.adjacency.pop();
        }
    }

    fn pop_edge(&mut self) {
        if let Some(edge) = self.edges.pop() {
            let idx = self.edges.len();
            self.edge_keys.remove(&edge.key());
            for end in [&edge.source, &edge.target] {
                if let Some(n) = self.index.get(end) {
                    self.adjacency[*n].retain(|e| *e != idx);
                }
            }
        }
    }

    fn from_file(file: GraphFile, path: &Path) -> std::result::Result<Self, StoreError> {
        check_format_version(path, file.format_version)?;
        let mut arena = Arena {
            extra: file.extra,
            ..Arena::default()
        };
        for node in file.nodes {
            arena
                .insert_node(node)
                .map_err(|e| StoreError::corrupt(path, e))?;
        }
        for edge in file.edges {
            arena
                .insert_edge(edge)
                .map_err(|e| StoreError::corrupt(path, e))?;
        }
        Ok(arena)
    }

    fn as_file(&self) -> GraphFileRef<'_> {
        GraphFileRef::new(&self.nodes, &self.edges, &self.extra)
    }
}

/// The spec/code/test dependency graph.
#[derive(Debug)]
pub struct ImpactGraph {
    storage_path: Option<PathBuf>,
    arena: RwLock<Arena>,
}

impl ImpactGraph {
    /// An empty graph with no backing file.
    pub fn in_memory() -> Self {
        Self {
            storage_path: None,
            arena: RwLock::new(Arena::default()),
        }
    }

    /// An empty graph persisted to `path` immediately.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let graph = Self::from_arena(Arena::default(), Some(path.into()));
        graph.save()?;
        Ok(graph)
    }

    /// Load a previously persisted graph.
    ///
    /// Fails with a corrupt-store error when the file does not parse or
    /// violates a graph invariant (duplicate ids, dangling edges, bad
    /// confidences); nothing is dropped or repaired silently.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file: GraphFile = read_json(&path)?;
        let arena = Arena::from_file(file, &path)?;
        tracing::debug!(
            path = %path.display(),
            nodes = arena.nodes.len(),
            edges = arena.edges.len(),
            "impact graph loaded"
        );
        Ok(Self::from_arena(arena, Some(path)))
    }

    pub(crate) fn from_arena(arena: Arena, storage_path: Option<PathBuf>) -> Self {
        Self {
            storage_path,
            arena: RwLock::new(arena),
        }
    }

    /// Backing file, if any.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Rewrite the backing file from the in-memory state.
    pub fn save(&self) -> Result<()> {
        let arena = self.arena.write();
        self.persist(&arena)
    }

    fn persist(&self, arena: &Arena) -> Result<()> {
        if let Some(path) = &self.storage_path {
            write_json_atomic(path, &arena.as_file())?;
        }
        Ok(())
    }

    // --- Mutation ---

    /// Add a node. Fails on a duplicate id.
    pub fn add_node(&self, node: GraphNode) -> Result<()> {
        let mut arena = self.arena.write();
        arena.insert_node(node)?;
        if let Err(e) = self.persist(&arena) {
            arena.pop_node();
            return Err(e);
        }
        Ok(())
    }

    /// Add an edge. Both endpoints must exist and the (source, target, kind)
    /// triple must be new.
    pub fn add_edge(&self, edge: GraphEdge) -> Result<()> {
        let mut arena = self.arena.write();
        arena.insert_edge(edge)?;
        if let Err(e) = self.persist(&arena) {
            arena.pop_edge();
            return Err(e);
        }
        Ok(())
    }

    /// Update the last-known modification time of a node.
    pub fn record_modification(&self, id: &NodeId, at: DateTime<Utc>) -> Result<()> {
        let mut arena = self.arena.write();
        let idx = arena
            .index_of(id)
            .ok_or_else(|| ImpactError::NodeNotFound(id.clone()))?;
        let previous = arena.nodes[idx].modified_at.replace(at);
        if let Err(e) = self.persist(&arena) {
            arena.nodes[idx].modified_at = previous;
            return Err(e);
        }
        Ok(())
    }

    // --- Reads ---

    /// A copy of the node with this id.
    pub fn node(&self, id: &NodeId) -> Option<GraphNode> {
        let arena = self.arena.read();
        arena.index_of(id).map(|idx| arena.nodes[idx].clone())
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.arena.read().index_of(id).is_some()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> Vec<GraphNode> {
        self.arena.read().nodes.clone()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.arena.read().edges.clone()
    }

    /// Edges incident to `id`, in either direction.
    pub fn edges_of(&self, id: &NodeId) -> Result<Vec<GraphEdge>> {
        let arena = self.arena.read();
        let idx = arena
            .index_of(id)
            .ok_or_else(|| ImpactError::NodeNotFound(id.clone()))?;
        Ok(arena.adjacency[idx]
            .iter()
            .map(|e| arena.edges[*e].clone())
            .collect())
    }

    /// Number of nodes of every kind.
    pub fn node_count(&self) -> usize {
        self.arena.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arena.read().edges.len()
    }

    /// Node counts per kind and edge counts per provenance.
    pub fn stats(&self) -> GraphStats {
        let arena = self.arena.read();
        let mut stats = GraphStats::default();
        for node in &arena.nodes {
            match node.kind {
                NodeKind::Spec => stats.specs += 1,
                NodeKind::Code => stats.code += 1,
                NodeKind::Test => stats.tests += 1,
            }
        }
        for edge in &arena.edges {
            if edge.kind.is_explicit() {
                stats.explicit_edges += 1;
            } else {
                stats.suggested_edges += 1;
            }
        }
        stats
    }

    // --- Queries ---

    /// Specs, code and tests within `depth` hops of the changed files.
    ///
    /// Seeds are the code/test nodes whose path equals a changed path;
    /// unmatched paths are ignored. Traversal ignores edge direction.
    /// Suggested edges are followed only when `include_suggested` is set.
    pub fn query_impact<S: AsRef<str>>(
        &self,
        changed_files: &[S],
        depth: usize,
        include_suggested: bool,
    ) -> ImpactSet {
        self.query_impact_filtered(changed_files, depth, |edge| {
            include_suggested || edge.kind.is_explicit()
        })
    }

    /// Like [`query_impact`](Self::query_impact) with a caller-supplied
    /// edge predicate, e.g. a minimum-confidence threshold.
    pub fn query_impact_filtered<S, F>(&self, changed_files: &[S], depth: usize, follow: F) -> ImpactSet
    where
        S: AsRef<str>,
        F: Fn(&GraphEdge) -> bool,
    {
        let arena = self.arena.read();
        let seeds = query::match_seeds(&arena, changed_files);
        let reached = query::traverse(&arena, &seeds, depth, &follow);
        tracing::debug!(
            changed = changed_files.len(),
            seeds = seeds.len(),
            reached = reached.len(),
            depth,
            "impact query"
        );
        ImpactSet::from_nodes(reached.into_iter().map(|idx| arena.nodes[idx].clone()))
    }

    /// Nodes within `depth` hops of `from`, excluding `from` itself.
    pub fn reachable(
        &self,
        from: &NodeId,
        depth: usize,
        include_suggested: bool,
    ) -> Result<Vec<GraphNode>> {
        let arena = self.arena.read();
        let start = arena
            .index_of(from)
            .ok_or_else(|| ImpactError::NodeNotFound(from.clone()))?;
        let follow = |edge: &GraphEdge| include_suggested || edge.kind.is_explicit();
        let mut nodes: Vec<GraphNode> = query::traverse(&arena, &[start], depth, &follow)
            .into_iter()
            .filter(|idx| *idx != start)
            .map(|idx| arena.nodes[idx].clone())
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }
}
