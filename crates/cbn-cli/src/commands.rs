//! One-shot subcommands

use anyhow::{Context, Result};
use cbn_diff::{diff_with_policy, DiffPolicy};
use cbn_ingest::Pipeline;
use cbn_model::{seed_network, Network};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Read and validate a network JSON file
///
/// # Errors
///
/// Fails if the file cannot be read, parsed or validated.
pub fn read_network(path: &Path) -> Result<Network> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading network {}", path.display()))?;
    let network = Network::from_json(&text)
        .with_context(|| format!("parsing network {}", path.display()))?;
    network
        .validate()
        .with_context(|| format!("validating network {}", path.display()))?;
    Ok(network)
}

/// Print the seed network as JSON or Mermaid
///
/// # Errors
///
/// Fails if writing to `out` fails.
pub fn seed_command(out: &mut impl Write, mermaid: bool) -> Result<()> {
    let seed = seed_network();
    if mermaid {
        write!(out, "{}", seed.to_mermaid())?;
    } else {
        writeln!(out, "{}", seed.to_json_pretty()?)?;
    }
    Ok(())
}

/// Ingest a saved reply against `current` (seed when `None`)
///
/// Prints the ingestion result and the narrative diff as one JSON document.
///
/// # Errors
///
/// Fails if serialization or writing fails. Bad replies are not errors.
pub fn ingest_command(
    out: &mut impl Write,
    reply: &str,
    current: Option<Network>,
    policy: DiffPolicy,
) -> Result<()> {
    let current = current.unwrap_or_else(seed_network);
    let result = Pipeline::new().ingest(reply, &current);
    let changes = diff_with_policy(&current, &result.updated_network, policy);
    info!(disposition = ?result.disposition, changes = changes.len(), "reply ingested");

    let report = json!({
        "result": result,
        "changes": changes.descriptions(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

/// Print the changes from `previous` to `candidate`, one per line
///
/// # Errors
///
/// Fails if writing to `out` fails.
pub fn diff_command(
    out: &mut impl Write,
    previous: &Network,
    candidate: &Network,
    policy: DiffPolicy,
) -> Result<()> {
    let changes = diff_with_policy(previous, candidate, policy);
    if changes.is_empty() {
        writeln!(out, "no changes")?;
    }
    for line in changes.descriptions() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
