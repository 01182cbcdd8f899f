//! Staleness and drift reports.

use std::collections::HashMap;

use crate::commands::history::short;
use crate::commands::print_json;
use crate::workspace::Workspace;

/// Parse `ID=VERSION` pairs given with `--cached`.
pub fn parse_cached(pairs: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut cached = HashMap::new();
    for pair in pairs {
        let Some((id, version)) = pair.split_once('=') else {
            anyhow::bail!("invalid --cached value '{pair}': expected ID=VERSION");
        };
        let (id, version) = (id.trim(), version.trim());
        if id.is_empty() || version.is_empty() {
            anyhow::bail!("invalid --cached value '{pair}': expected ID=VERSION");
        }
        let id = id.strip_prefix("spec:").unwrap_or(id);
        cached.insert(id.to_string(), version.to_string());
    }
    Ok(cached)
}

/// `specmem stale`: warnings for specs whose cached view lags behind.
pub fn stale(
    ws: &Workspace,
    ids: &[String],
    cached: &[String],
    include_acknowledged: bool,
    json: bool,
) -> anyhow::Result<()> {
    let cached = parse_cached(cached)?;
    let store = ws.version_store()?;
    let warnings = store.check_staleness_with(ids, &cached, include_acknowledged)?;
    if json {
        return print_json(&warnings);
    }

    if warnings.is_empty() {
        println!("No stale specs.");
        return Ok(());
    }
    for w in &warnings {
        let ack = if w.acknowledged { " (acknowledged)" } else { "" };
        println!("{}{ack}: {}", w.spec_id, w.reason());
    }
    Ok(())
}

/// `specmem ack`: acknowledge one staleness warning.
pub fn ack(ws: &Workspace, id: &str, version: &str, json: bool) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let recorded = store.acknowledge_staleness(id, version)?;
    if json {
        return print_json(&serde_json::json!({
            "spec_id": id,
            "version": version,
            "recorded": recorded,
        }));
    }
    if recorded {
        println!("Acknowledged {id} at {}.", short(version));
    } else {
        println!("{id} at {} was already acknowledged.", short(version));
    }
    Ok(())
}

/// `specmem drift`: linked code modified after its spec moved on.
pub fn drift(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let report = store.get_drift_report()?;
    if json {
        return print_json(&report);
    }

    if report.is_empty() {
        println!("No drift detected.");
        return Ok(());
    }
    println!(
        "{:<20}  {:<36}  {:<9}  {:>8}  {:>6}",
        "SPEC", "NODE", "LEVEL", "SCORE", "DAYS"
    );
    println!("{}", "-".repeat(87));
    for item in &report.items {
        println!(
            "{:<20}  {:<36}  {:<9}  {:>8.3}  {:>6.1}",
            item.spec_id,
            item.node_id.as_str(),
            item.level.to_string(),
            item.severity,
            item.elapsed_days
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecmemConfig;
    use specmem_core::{SpecBlock, SpecType};

    #[test]
    fn parse_cached_pairs() {
        let cached = parse_cached(&["S1=abc".into(), "spec:S2 = def".into()]).unwrap();
        assert_eq!(cached.get("S1").map(String::as_str), Some("abc"));
        assert_eq!(cached.get("S2").map(String::as_str), Some("def"));
    }

    #[test]
    fn parse_cached_rejects_malformed() {
        assert!(parse_cached(&["S1".into()]).is_err());
        assert!(parse_cached(&["=abc".into()]).is_err());
        assert!(parse_cached(&["S1=".into()]).is_err());
    }

    #[test]
    fn stale_then_acknowledge() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());
        let store = ws.version_store().unwrap();
        let v1 = store
            .track_version(&SpecBlock::new("S1", SpecType::Requirement, "One."))
            .unwrap();
        store
            .track_version(&SpecBlock::new("S1", SpecType::Requirement, "Two."))
            .unwrap();
        drop(store);

        let cached = vec![format!("S1={}", v1.version_id)];
        stale(&ws, &[], &cached, false, false).unwrap();
        ack(&ws, "S1", &v1.version_id, false).unwrap();

        let store = ws.version_store().unwrap();
        let map = parse_cached(&cached).unwrap();
        assert!(store.check_staleness(&["S1"], &map).unwrap().is_empty());
        assert_eq!(store.check_staleness_with(&["S1"], &map, true).unwrap().len(), 1);
        // second acknowledgment is a no-op
        assert!(!store.acknowledge_staleness("S1", &v1.version_id).unwrap());
    }

    #[test]
    fn drift_without_graph_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), SpecmemConfig::default());
        drift(&ws, true).unwrap();
        assert!(ws.version_store().unwrap().get_drift_report().unwrap().is_empty());
    }
}
