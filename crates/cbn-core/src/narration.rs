//! Turning turn results into conversation entries
//!
//! Narration order: preamble, changes, suggestions, reflection prompts,
//! subclaims, then any newly introduced feedback loops.

use cbn_diff::{Change, NetworkDiff};
use cbn_ingest::IngestResult;
use cbn_model::{ConversationEntry, EdgeProbability, EntryKind, EntryMetadata, Network};
use std::collections::BTreeSet;

/// Narrated when the call or ingestion panics
pub const APOLOGY: &str =
    "Sorry, something went wrong while processing that request. Please try again.";

/// Narrated when an interpretation cannot be produced
pub const INTERPRETATION_FAILED: &str = "Error: Unable to generate interpretation.";

/// Entries for one applied turn
#[must_use]
pub fn narrate_turn(
    changes: &NetworkDiff,
    result: &IngestResult,
    new_loops: &[Vec<String>],
    network: &Network,
) -> Vec<ConversationEntry> {
    let mut entries = Vec::new();

    if result.is_fallback() {
        entries.extend(
            result
                .tentative_suggestions
                .iter()
                .map(|text| ConversationEntry::bot(text.clone()).with_kind(EntryKind::Error)),
        );
        entries.extend(questions(&result.reflection_prompts));
        return entries;
    }

    if let Some(preamble) = &result.preamble {
        entries.push(ConversationEntry::bot(preamble.clone()).with_kind(EntryKind::Analysis));
    }

    if let Some(summary) = summarize_changes(changes) {
        entries.push(summary);
    }

    entries.extend(
        result
            .tentative_suggestions
            .iter()
            .map(|text| ConversationEntry::bot(text.clone()).with_kind(EntryKind::Suggestion)),
    );
    entries.extend(questions(&result.reflection_prompts));

    if !result.subclaims.is_empty() {
        entries.push(
            ConversationEntry::bot(bullets("Subclaims:", &result.subclaims))
                .with_kind(EntryKind::Analysis),
        );
    }

    for cycle in new_loops {
        entries.push(feedback_loop_entry(cycle, network));
    }

    entries
}

fn questions(prompts: &[String]) -> impl Iterator<Item = ConversationEntry> + '_ {
    prompts
        .iter()
        .map(|text| ConversationEntry::bot(text.clone()).with_kind(EntryKind::Question))
}

fn bullets(heading: &str, lines: &[String]) -> String {
    let mut text = heading.to_string();
    for line in lines {
        text.push_str("\n- ");
        text.push_str(line);
    }
    text
}

/// One entry listing every change, pointing at the subject when single
fn summarize_changes(changes: &NetworkDiff) -> Option<ConversationEntry> {
    if changes.is_empty() {
        return None;
    }
    let entry = ConversationEntry::bot(bullets("Changes made:", &changes.descriptions()))
        .with_kind(EntryKind::Analysis);

    if let [only] = changes.changes.as_slice() {
        let metadata = match only {
            Change::NodeAdded { id, .. }
            | Change::NodeUpdated { id, .. }
            | Change::NodeRemoved { id, .. } => EntryMetadata::for_node(id.clone()),
            Change::EdgeAdded { id, .. }
            | Change::EdgeUpdated { id, .. }
            | Change::EdgeRemoved { id, .. } => EntryMetadata::for_edge(id.clone()),
        };
        return Some(entry.with_metadata(metadata));
    }
    Some(entry)
}

fn feedback_loop_entry(cycle: &[String], network: &Network) -> ConversationEntry {
    let mut names: Vec<&str> = cycle.iter().map(|id| network.display_name(id)).collect();
    if let Some(first) = names.first().copied() {
        names.push(first);
    }
    let metadata = EntryMetadata {
        references: cycle.to_vec(),
        ..EntryMetadata::default()
    };

    ConversationEntry::bot(format!("Feedback loop detected: {}", names.join(" -> ")))
        .with_kind(EntryKind::Analysis)
        .with_metadata(metadata)
}

/// Loops in `after` whose member set did not exist in `before`
#[must_use]
pub fn new_feedback_loops(before: &Network, after: &Network) -> Vec<Vec<String>> {
    let known: BTreeSet<BTreeSet<String>> = before
        .feedback_loops()
        .into_iter()
        .map(|cycle| cycle.into_iter().collect())
        .collect();

    after
        .feedback_loops()
        .into_iter()
        .filter(|cycle| !known.contains(&cycle.iter().cloned().collect::<BTreeSet<_>>()))
        .collect()
}

/// Details shown when a node is clicked
#[must_use]
pub fn describe_node(network: &Network, id: &str) -> Option<ConversationEntry> {
    let node = network.node(id)?;
    let mut text = format!("{} ({})", node.name, node.category);
    if !node.states.is_empty() {
        text.push_str(&format!("\nStates: {}", node.states.join(", ")));
    }
    if !node.probabilities.is_empty() {
        let probabilities: Vec<String> = node
            .probabilities
            .iter()
            .map(|(state, p)| format!("{state}={p}"))
            .collect();
        text.push_str(&format!("\nProbabilities: {}", probabilities.join(", ")));
    }
    if let Some(description) = &node.description {
        text.push('\n');
        text.push_str(description);
    }
    Some(
        ConversationEntry::bot(text)
            .with_kind(EntryKind::Analysis)
            .with_metadata(EntryMetadata::for_node(id)),
    )
}

/// Details shown when an edge is clicked
#[must_use]
pub fn describe_edge(network: &Network, id: &str) -> Option<ConversationEntry> {
    let edge = network.edge(id)?;
    let mut text = format!(
        "{} -> {}",
        network.display_name(&edge.from),
        network.display_name(&edge.to)
    );
    match &edge.probability {
        Some(EdgeProbability::Scalar(p)) => text.push_str(&format!("\nProbability: {p}")),
        Some(EdgeProbability::Table(rows)) => {
            for (parent, row) in rows {
                let cells: Vec<String> = row.iter().map(|(child, p)| format!("{child}={p}")).collect();
                text.push_str(&format!("\nGiven {parent}: {}", cells.join(", ")));
            }
        }
        None => {}
    }
    Some(
        ConversationEntry::bot(text)
            .with_kind(EntryKind::Analysis)
            .with_metadata(EntryMetadata::for_edge(id)),
    )
}
