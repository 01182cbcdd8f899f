//! `specmem graph build|stats`.

use crate::commands::print_json;
use crate::workspace::Workspace;

/// `specmem graph build`: rebuild the impact graph from the spec blocks.
pub fn build(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let blocks = ws.load_blocks()?;
    let (graph, report) = ws.build_graph(&blocks)?;

    if json {
        return print_json(&serde_json::json!({
            "root": ws.root(),
            "path": ws.graph_path(),
            "report": report,
            "stats": graph.stats(),
        }));
    }

    println!(
        "Built impact graph: {} specs, {} explicit links, {} suggested links",
        report.specs, report.explicit_edges, report.suggested_edges
    );
    if !report.is_clean() {
        println!("Skipped {} block(s):", report.failures.len());
        for failure in &report.failures {
            println!("  {:<20}  {}", failure.block_id, failure.reason);
        }
    }
    println!("Wrote {}", ws.graph_path().display());
    Ok(())
}

/// `specmem graph stats`: node and edge counts of the persisted graph.
pub fn stats(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let graph = ws.load_graph()?;
    let stats = graph.stats();
    if json {
        return print_json(&stats);
    }

    println!("Impact graph at {}", ws.graph_path().display());
    println!("  specs:           {}", stats.specs);
    println!("  code files:      {}", stats.code);
    println!("  test files:      {}", stats.tests);
    println!("  explicit links:  {}", stats.explicit_edges);
    println!("  suggested links: {}", stats.suggested_edges);
    Ok(())
}
