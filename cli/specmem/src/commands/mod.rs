//! CLI command implementations.

pub mod graph;
pub mod history;
pub mod impact;
pub mod lifecycle;
pub mod stale;

use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
