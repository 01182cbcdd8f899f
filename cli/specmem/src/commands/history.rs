//! Commands over the version history: track, history, diff, contradictions.

use specmem_diff::{ChangeKind, SpecChange};

use crate::commands::print_json;
use crate::workspace::Workspace;

/// `specmem track`: record a version for every changed spec block.
pub fn track(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let blocks = ws.load_blocks()?;
    let store = ws.version_store()?;
    let summary = ws.track(&store, &blocks)?;

    if json {
        let recorded: Vec<_> = summary
            .recorded
            .iter()
            .map(|v| {
                serde_json::json!({
                    "spec_id": v.spec_id,
                    "version_id": v.version_id,
                    "sequence": v.sequence,
                    "status": v.status,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "recorded": recorded,
            "unchanged": summary.unchanged,
        }));
    }

    for v in &summary.recorded {
        println!("  {:<20}  #{:<4}  {}  {}", v.spec_id, v.sequence, short(&v.version_id), v.status);
    }
    println!(
        "Tracked {} new version(s), {} unchanged.",
        summary.recorded.len(),
        summary.unchanged
    );
    Ok(())
}

/// `specmem history`: the versions of one spec, oldest first.
pub fn history(ws: &Workspace, id: &str, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let versions = store.get_history(id, limit)?;
    if json {
        return print_json(&versions);
    }

    println!(
        "{:<6}  {:<14}  {:<12}  {:<25}  {:<40}",
        "SEQ", "VERSION", "STATUS", "TIMESTAMP", "FIRST LINE"
    );
    println!("{}", "-".repeat(105));
    for v in &versions {
        let first_line = v.text.lines().next().unwrap_or("").trim();
        println!(
            "{:<6}  {:<14}  {:<12}  {:<25}  {:<40}",
            v.sequence,
            short(&v.version_id),
            v.status.to_string(),
            v.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            truncate(first_line, 40)
        );
    }
    Ok(())
}

/// `specmem diff`: statement-level changes between two versions.
pub fn diff(
    ws: &Workspace,
    id: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let change = store.get_diff(id, from, to)?;
    if json {
        return print_json(&change);
    }

    match change {
        None => println!("{id} has a single version; nothing to compare."),
        Some(change) => print!("{}", render_change(&change)),
    }
    Ok(())
}

/// Unified-diff-like rendering of a [`SpecChange`].
pub fn render_change(change: &SpecChange) -> String {
    let mut out = format!(
        "{}: {} -> {}\n",
        change.spec_id,
        short(&change.from_version),
        short(&change.to_version)
    );
    if change.is_empty() {
        out.push_str("  (no changes)\n");
        return out;
    }
    for unit in &change.changes {
        match unit.kind {
            ChangeKind::Added => {
                out.push_str(&format!("+ {}\n", unit.after.as_deref().unwrap_or("")));
            }
            ChangeKind::Removed => {
                out.push_str(&format!("- {}\n", unit.before.as_deref().unwrap_or("")));
            }
            ChangeKind::Modified => {
                out.push_str(&format!("~ {}\n", unit.before.as_deref().unwrap_or("")));
                out.push_str(&format!("  {}\n", unit.after.as_deref().unwrap_or("")));
            }
        }
    }
    out
}

/// `specmem contradictions`: statements later versions negate.
pub fn contradictions(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let found = store.get_contradictions(id)?;
    if json {
        return print_json(&found);
    }

    if found.is_empty() {
        println!("No contradictions in the history of {id}.");
        return Ok(());
    }
    for c in &found {
        println!("{} vs {}", short(&c.earlier_version), short(&c.later_version));
        println!("  was: {}", c.earlier_text);
        println!("  now: {}", c.later_text);
    }
    Ok(())
}

pub(crate) fn short(version_id: &str) -> &str {
    version_id.get(..12).unwrap_or(version_id)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecmemConfig;
    use specmem_core::{SpecBlock, SpecType};
    use specmem_diff::ChangeUnit;

    fn workspace_with(dir: &std::path::Path, blocks: &[SpecBlock]) -> Workspace {
        let ws = Workspace::new(dir, SpecmemConfig::default());
        std::fs::create_dir_all(ws.storage_dir()).unwrap();
        std::fs::write(ws.blocks_path(), serde_json::to_vec(blocks).unwrap()).unwrap();
        ws
    }

    #[test]
    fn track_history_and_diff() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with(
            dir.path(),
            &[SpecBlock::new("S1", SpecType::Requirement, "Users shall log in.")],
        );
        track(&ws, false).unwrap();
        // unchanged blocks are not re-recorded
        track(&ws, true).unwrap();

        let ws = workspace_with(
            dir.path(),
            &[SpecBlock::new(
                "S1",
                SpecType::Requirement,
                "Users shall log in.\nSessions expire after 30 minutes.",
            )],
        );
        track(&ws, false).unwrap();

        let store = ws.version_store().unwrap();
        assert_eq!(store.get_history("S1", None).unwrap().len(), 2);

        history(&ws, "S1", Some(1), false).unwrap();
        diff(&ws, "S1", None, None, false).unwrap();
        diff(&ws, "S1", Some("1"), Some("#2"), true).unwrap();
        contradictions(&ws, "S1", false).unwrap();
        assert!(history(&ws, "S9", None, false).is_err());
        history(&ws, "S1", None, true).unwrap();
    }

    #[test]
    fn history_json_names_the_spec() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with(
            dir.path(),
            &[SpecBlock::new("S1", SpecType::Requirement, "Users shall log in.")],
        );
        track(&ws, false).unwrap();

        let versions = ws.version_store().unwrap().get_history("S1", None).unwrap();
        let json = serde_json::to_value(&versions).unwrap();
        assert_eq!(json[0]["spec_id"], "S1");

        let on_disk = std::fs::read_to_string(ws.versions_path()).unwrap();
        assert!(!on_disk.contains("spec_id"));
    }

    #[test]
    fn render_marks_each_kind() {
        let change = SpecChange {
            spec_id: "S1".into(),
            from_version: "aaaaaaaaaaaaaaaa".into(),
            to_version: "bbbbbbbbbbbbbbbb".into(),
            changes: vec![
                ChangeUnit::added("New line."),
                ChangeUnit::removed("Old line."),
                ChangeUnit::modified("Expire after 30 minutes.", "Expire after 15 minutes."),
            ],
        };
        let text = render_change(&change);
        assert!(text.starts_with("S1: aaaaaaaaaaaa -> bbbbbbbbbbbb\n"));
        assert!(text.contains("+ New line.\n"));
        assert!(text.contains("- Old line.\n"));
        assert!(text.contains("~ Expire after 30 minutes.\n  Expire after 15 minutes.\n"));
    }

    #[test]
    fn truncate_long_lines() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
