//! Lifecycle commands: transition, deprecations, audit.

use anyhow::Context;
use specmem_core::LifecycleStatus;
use specmem_governance::{allowed_transitions, AuditEntry};

use crate::commands::history::short;
use crate::commands::print_json;
use crate::workspace::Workspace;

/// `specmem transition`: move a spec to a new lifecycle status.
pub fn transition(
    ws: &Workspace,
    id: &str,
    status: &str,
    actor: Option<&str>,
    reason: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let to: LifecycleStatus = status
        .parse()
        .with_context(|| format!("unknown status '{status}'"))?;
    let store = ws.version_store()?;
    let from = store
        .latest(id)
        .map(|v| v.status)
        .with_context(|| format!("spec not tracked: {id}\nRun `specmem track` first."))?;

    let version = match store.transition_status(id, to, actor, reason) {
        Ok(version) => version,
        Err(e) => {
            let allowed: Vec<String> = allowed_transitions(from).iter().map(|s| s.to_string()).collect();
            let hint = if allowed.is_empty() {
                format!("{from} is terminal")
            } else {
                format!("allowed from {from}: {}", allowed.join(", "))
            };
            return Err(anyhow::Error::new(e).context(hint));
        }
    };

    if json {
        return print_json(&serde_json::json!({
            "spec_id": version.spec_id,
            "from": from,
            "to": version.status,
            "version_id": version.version_id,
            "sequence": version.sequence,
        }));
    }
    println!(
        "{}: {from} -> {} (version #{} {})",
        version.spec_id,
        version.status,
        version.sequence,
        short(&version.version_id)
    );
    Ok(())
}

/// `specmem deprecations`: deprecated specs, most urgent first.
pub fn deprecations(ws: &Workspace, include_expired: bool, json: bool) -> anyhow::Result<()> {
    let store = ws.version_store()?;
    let list = store.get_deprecations(include_expired)?;
    if json {
        return print_json(&list);
    }

    if list.is_empty() {
        println!("No deprecated specs.");
        return Ok(());
    }
    println!(
        "{:<20}  {:<10}  {:>7}  {:>8}  {:<12}",
        "SPEC", "STATUS", "URGENCY", "IMPACTED", "DEADLINE"
    );
    println!("{}", "-".repeat(65));
    for d in &list {
        let deadline = match d.deadline {
            Some(at) if d.expired => format!("{} (expired)", at.format("%Y-%m-%d")),
            Some(at) => at.format("%Y-%m-%d").to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:<20}  {:<10}  {:>7.3}  {:>8}  {:<12}",
            d.spec_id,
            d.status.to_string(),
            d.urgency,
            d.impacted,
            deadline
        );
    }
    Ok(())
}

/// `specmem audit`: the hash-chained transition log.
pub fn audit(ws: &Workspace, id: Option<&str>, verify: bool, json: bool) -> anyhow::Result<()> {
    let governance = ws.governance()?;
    let log = governance.log();
    if verify {
        log.verify_integrity().context("audit log failed verification")?;
    }
    let entries = match id {
        Some(id) => log.entries_for(&audit_entity(id)),
        None => log.entries(),
    };

    if json {
        return print_json(&entries);
    }
    if verify {
        println!("Audit chain verified ({} entries).", log.len());
    }
    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }
    for e in &entries {
        println!("{}", format_entry(e));
    }
    Ok(())
}

fn audit_entity(id: &str) -> String {
    if id.starts_with("spec:") {
        id.to_string()
    } else {
        format!("spec:{id}")
    }
}

fn format_entry(e: &AuditEntry) -> String {
    let mut line = format!(
        "#{:<4} {}  {:<16} {} -> {}",
        e.sequence,
        e.timestamp.format("%Y-%m-%d %H:%M:%S"),
        e.entity_id,
        e.from,
        e.to
    );
    if let Some(actor) = &e.actor {
        line.push_str(&format!("  by {actor}"));
    }
    if let Some(reason) = &e.reason {
        line.push_str(&format!("  ({reason})"));
    }
    line
}
