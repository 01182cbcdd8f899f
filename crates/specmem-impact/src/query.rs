//! Bounded breadth-first traversal and changed-path matching.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use specmem_core::{normalize_path, NodeId, NodeKind};

use crate::edge::GraphEdge;
use crate::graph::Arena;
use crate::node::GraphNode;

/// Result of an impact query, partitioned by node kind and sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSet {
    pub specs: Vec<GraphNode>,
    pub code: Vec<GraphNode>,
    pub tests: Vec<GraphNode>,
}

impl ImpactSet {
    pub(crate) fn from_nodes(nodes: impl IntoIterator<Item = GraphNode>) -> Self {
        let mut set = ImpactSet::default();
        for node in nodes {
            match node.kind {
                NodeKind::Spec => set.specs.push(node),
                NodeKind::Code => set.code.push(node),
                NodeKind::Test => set.tests.push(node),
            }
        }
        for part in [&mut set.specs, &mut set.code, &mut set.tests] {
            part.sort_by(|a, b| a.id.cmp(&b.id));
        }
        set
    }

    /// Nothing affected.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty() && self.code.is_empty() && self.tests.is_empty()
    }

    /// Total nodes across specs, code and tests.
    pub fn len(&self) -> usize {
        self.specs.len() + self.code.len() + self.tests.len()
    }

    /// Every id in the set, sorted.
    pub fn ids(&self) -> BTreeSet<NodeId> {
        self.specs
            .iter()
            .chain(&self.code)
            .chain(&self.tests)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        let part = match id.kind() {
            NodeKind::Spec => &self.specs,
            NodeKind::Code => &self.code,
            NodeKind::Test => &self.tests,
        };
        part.binary_search_by(|n| n.id.cmp(id)).is_ok()
    }
}

/// Indices of code/test nodes whose path equals one of the changed paths
/// after normalization.
pub(crate) fn match_seeds<S: AsRef<str>>(arena: &Arena, changed: &[S]) -> Vec<usize> {
    let wanted: HashSet<String> = changed
        .iter()
        .map(|p| normalize_path(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();
    let mut seeds = BTreeSet::new();
    for (idx, node) in arena.nodes.iter().enumerate() {
        let Some(path) = node.path() else { continue };
        if wanted.contains(path) {
            seeds.insert(idx);
        }
    }
    seeds.into_iter().collect()
}

/// Breadth-first walk over edges accepted by `follow`, ignoring direction.
///
/// Returns every node within `depth` hops of a seed, seeds included, in
/// ascending index order.
pub(crate) fn traverse<F>(arena: &Arena, seeds: &[usize], depth: usize, follow: &F) -> Vec<usize>
where
    F: Fn(&GraphEdge) -> bool + ?Sized,
{
    let mut dist: Vec<Option<usize>> = vec![None; arena.nodes.len()];
    let mut queue = VecDeque::new();
    for &s in seeds {
        if dist[s].is_none() {
            dist[s] = Some(0);
            queue.push_back(s);
        }
    }

    while let Some(current) = queue.pop_front() {
        let d = dist[current].unwrap_or(0);
        if d >= depth {
            continue;
        }
        let here = &arena.nodes[current].id;
        for &e in &arena.adjacency[current] {
            let edge = &arena.edges[e];
            if !follow(edge) {
                continue;
            }
            let Some(next) = arena.index_of(edge.other_end(here)) else {
                continue;
            };
            if dist[next].is_none() {
                dist[next] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }

    dist.iter()
        .enumerate()
        .filter_map(|(idx, d)| d.map(|_| idx))
        .collect()
}
