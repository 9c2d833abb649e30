//! Subcommands and the chat loop against scripted agents

use cbn_cli::{diff_command, ingest_command, read_network, run_chat, seed_command};
use cbn_core::{AppConfig, Orchestrator, WELCOME_MESSAGE};
use cbn_diff::DiffPolicy;
use cbn_model::seed_network;
use cbn_test_utils::{no_update_reply, reply_json, seed_with_rainfall, ScriptedAgent};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn write_network(dir: &tempfile::TempDir, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn seed_prints_json_or_mermaid() {
    let mut json = Vec::new();
    seed_command(&mut json, false).unwrap();
    let parsed = cbn_model::Network::from_json(&String::from_utf8(json).unwrap()).unwrap();
    assert_eq!(parsed, seed_network());

    let mut mermaid = Vec::new();
    seed_command(&mut mermaid, true).unwrap();
    assert!(String::from_utf8(mermaid).unwrap().starts_with("flowchart TD"));
}

#[test]
fn ingest_reports_fallback_for_prose() {
    let mut out = Vec::new();
    ingest_command(&mut out, "no json here", None, DiffPolicy::Narrative).unwrap();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["result"]["disposition"], "fallback");
    assert_eq!(report["changes"], serde_json::json!([]));
}

#[test]
fn ingest_reports_additions() {
    let mut out = Vec::new();
    ingest_command(
        &mut out,
        &reply_json(&seed_with_rainfall()),
        None,
        DiffPolicy::Narrative,
    )
    .unwrap();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        report["changes"],
        serde_json::json!(["added node: Rainfall", "added edge: Rainfall -> Water Quality"])
    );
}

#[test]
fn diff_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let previous = write_network(&dir, "prev.json", &seed_with_rainfall().to_json_pretty().unwrap());
    let candidate = write_network(&dir, "cand.json", &seed_network().to_json_pretty().unwrap());
    let previous = read_network(&previous).unwrap();
    let candidate = read_network(&candidate).unwrap();

    let mut narrative = Vec::new();
    diff_command(&mut narrative, &previous, &candidate, DiffPolicy::Narrative).unwrap();
    assert_eq!(String::from_utf8(narrative).unwrap(), "no changes\n");

    let mut audit = Vec::new();
    diff_command(&mut audit, &previous, &candidate, DiffPolicy::Audit).unwrap();
    assert_eq!(
        String::from_utf8(audit).unwrap(),
        "removed node: Rainfall\nremoved edge: Rainfall -> Water Quality\n"
    );
}

#[test]
fn invalid_network_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dangling = write_network(
        &dir,
        "bad.json",
        r#"{"nodes": [{"id": "a", "name": "A", "category": "Social"}], "edges": [{"id": "e", "from": "a", "to": "b"}]}"#,
    );
    let err = read_network(&dangling).unwrap_err();
    assert!(format!("{err:#}").contains("bad.json"));

    assert!(read_network(&dir.path().join("missing.json")).is_err());
}

#[tokio::test]
async fn chat_session_narrates_turns() {
    let agent = Arc::new(ScriptedAgent::replying([
        reply_json(&seed_with_rainfall()),
        no_update_reply("ignored"),
    ]));
    let orchestrator = Orchestrator::new(agent, AppConfig::default());
    let input: &[u8] = b"Add rainfall\n\n/select rainfall\n/bogus\n/quit\nnever sent\n";

    let mut out = Vec::new();
    run_chat(&orchestrator, input, &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with(&format!("[bot] {WELCOME_MESSAGE}\n")));
    assert!(out.contains(
        "[analysis] Changes made:\n- added node: Rainfall\n- added edge: Rainfall -> Water Quality\n"
    ));
    assert!(out.contains("[analysis] Rainfall (Environmental)"));
    assert!(out.contains("unknown command: /bogus"));
    assert_eq!(orchestrator.latest_turn(), 1);
}
