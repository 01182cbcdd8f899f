//! `specmem impact`: bounded-depth impact of changed files.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use specmem_impact::{parse_git_diff, GraphNode, ImpactGraph, ImpactSet};

use crate::commands::print_json;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub depth: usize,
    pub include_suggested: bool,
    /// Suggested edges below this confidence are not followed.
    pub min_confidence: Option<f64>,
}

/// `specmem impact`: print what a set of changed files affects.
pub fn run(
    ws: &Workspace,
    files: &[String],
    git_diff: Option<&Path>,
    options: &QueryOptions,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(c) = options.min_confidence {
        anyhow::ensure!((0.0..=1.0).contains(&c), "--min-confidence must be within [0, 1], got {c}");
    }
    let diff = match git_diff {
        Some(path) => Some(read_diff(path)?),
        None => None,
    };
    let files: Vec<String> = files.iter().map(|f| workspace_relative(ws.root(), f)).collect();
    let changed = changed_files(&files, diff.as_deref());
    if changed.is_empty() {
        anyhow::bail!("no changed files given; pass paths or --git-diff");
    }

    let graph = ws.load_graph()?;
    let impact = query(&graph, &changed, options);

    if json {
        return print_json(&serde_json::json!({
            "changed": changed,
            "depth": options.depth,
            "impact": impact,
        }));
    }

    if impact.is_empty() {
        println!("No specs, code or tests affected.");
        return Ok(());
    }
    print_section("Specs", &impact.specs);
    print_section("Code", &impact.code);
    print_section("Tests", &impact.tests);
    Ok(())
}

fn read_diff(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading diff from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Strip the workspace root from an absolute path; other input is kept.
pub fn workspace_relative(root: &Path, file: &str) -> String {
    match Path::new(file).strip_prefix(root) {
        Ok(rel) if Path::new(file).is_absolute() => rel.to_string_lossy().into_owned(),
        _ => file.to_string(),
    }
}

/// Explicit paths plus those named in `diff`, deduplicated and sorted.
pub fn changed_files(files: &[String], diff: Option<&str>) -> Vec<String> {
    let mut all: BTreeSet<String> = files.iter().cloned().collect();
    if let Some(diff) = diff {
        all.extend(parse_git_diff(diff));
    }
    all.into_iter().collect()
}

pub fn query(graph: &ImpactGraph, changed: &[String], options: &QueryOptions) -> ImpactSet {
    let include_suggested = options.include_suggested;
    let min = options.min_confidence.unwrap_or(0.0);
    graph.query_impact_filtered(changed, options.depth, |edge| {
        edge.kind.is_explicit() || (include_suggested && edge.confidence >= min)
    })
}

fn print_section(title: &str, nodes: &[GraphNode]) {
    if nodes.is_empty() {
        return;
    }
    println!("{title} ({}):", nodes.len());
    for node in nodes {
        match node.meta_str("title") {
            Some(t) if !t.is_empty() => println!("  {}  {t}", node.id),
            _ => println!("  {}", node.id),
        }
    }
}
