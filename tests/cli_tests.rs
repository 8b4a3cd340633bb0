#![allow(deprecated)]
//! Integration tests for the ignis CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn ignis_cmd() -> Command {
    Command::cargo_bin("ignis").expect("binary not found")
}

/// A two-future module: a deployment and a call on it.
fn write_module_json(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("module.json");
    let module = serde_json::json!({
        "module": "Module1",
        "futures": [
            {
                "kind": "contract-deployment",
                "contract_name": "Token",
                "artifact": { "contract_name": "Token", "bytecode": "0x6080604052" },
                "args": [
                    { "parameter": "supply", "default": 1000 },
                    { "account": 0 }
                ]
            },
            {
                "kind": "contract-call",
                "contract": { "future": "Module1:Token" },
                "function_name": "transfer",
                "args": [ { "account": 1 }, 50 ]
            }
        ]
    });
    fs::write(&path, serde_json::to_string_pretty(&module).unwrap()).expect("write module file");
    path
}

fn write_module_with_unknown_reference(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("broken.json");
    let module = serde_json::json!({
        "module": "Module1",
        "futures": [
            {
                "kind": "contract-call",
                "contract": { "future": "Module1:Ghost" },
                "function_name": "transfer"
            }
        ]
    });
    fs::write(&path, serde_json::to_string_pretty(&module).unwrap()).expect("write module file");
    path
}

fn simulated_deploy(module: &Path, dir: &Path) -> Command {
    let mut cmd = ignis_cmd();
    cmd.arg("deploy")
        .arg(module)
        .arg("--simulate")
        .arg("--deployment-dir")
        .arg(dir);
    cmd
}

fn journal_lines(dir: &Path) -> Vec<String> {
    let content = fs::read_to_string(dir.join("journal.jsonl")).expect("read journal");
    content.lines().map(str::to_string).collect()
}

// ============================================================================
// Help and Basic CLI Tests
// ============================================================================

#[test]
fn test_help_output() {
    ignis_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("wipe"))
        .stdout(predicate::str::contains("journal"));
}

#[test]
fn test_version_output() {
    ignis_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ignis"));
}

#[test]
fn test_deploy_help() {
    ignis_cmd()
        .arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--rpc-url"))
        .stdout(predicate::str::contains("--simulate"))
        .stdout(predicate::str::contains("--parameters"))
        .stdout(predicate::str::contains("--deployment-dir"));
}

#[test]
fn test_deploy_requires_a_chain_backend() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);

    ignis_cmd()
        .arg("deploy")
        .arg(&module)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no chain backend configured"));
}

#[test]
fn test_deploy_rejects_a_module_with_unknown_references() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_with_unknown_reference(&temp_dir);
    let dir = temp_dir.path().join("deployment");

    simulated_deploy(&module, &dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("module validation failed"))
        .stderr(predicate::str::contains("unknown future"));
}

// ============================================================================
// Deploy End-to-End Tests
// ============================================================================

#[test]
fn test_simulated_deploy_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");

    simulated_deploy(&module, &dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 succeeded"))
        .stdout(predicate::str::contains("addresses written"));

    // Journal: one JSON record per line, each carrying its type tag
    let lines = journal_lines(&dir);
    assert_eq!(lines.len(), 12, "six records per future");
    for line in &lines {
        let record: Value = serde_json::from_str(line).expect("journal line is JSON");
        assert!(record.get("type").is_some());
    }

    // Manifest identifies the module and network
    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["module"], "Module1");
    assert_eq!(manifest["network"], "simulated");

    // Address file holds the deployment's contract address
    let addresses: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("deployed_addresses.json")).unwrap())
            .unwrap();
    let token = addresses["Module1:Token"].as_str().expect("token address");
    assert!(token.starts_with("0x"));
    assert_eq!(token.len(), 42);
}

#[test]
fn test_second_run_replays_without_new_journal_records() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");

    simulated_deploy(&module, &dir).assert().success();
    let first = journal_lines(&dir);

    simulated_deploy(&module, &dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("resuming deployment"))
        .stdout(predicate::str::contains("2 succeeded"));
    let second = journal_lines(&dir);

    assert_eq!(first, second, "a fully-deployed module journals nothing new");
}

// ============================================================================
// Status and Journal Tests
// ============================================================================

#[test]
fn test_status_reports_recorded_futures() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    ignis_cmd()
        .arg("status")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Module1:Token"))
        .stdout(predicate::str::contains("Module1:Token#transfer"))
        .stdout(predicate::str::contains("2 recorded: 2 succeeded"));
}

#[test]
fn test_status_json_emits_the_replayed_states() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    let output = ignis_cmd()
        .arg("status")
        .arg(&dir)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let states: Value = serde_json::from_slice(&output).expect("status --json is JSON");
    let states = states.as_array().expect("array of states");
    assert_eq!(states.len(), 2);
    assert_eq!(states[0]["future_id"], "Module1:Token");
    assert_eq!(states[0]["status"], "success");
}

#[test]
fn test_status_fails_without_a_deployment() {
    let temp_dir = TempDir::new().unwrap();

    ignis_cmd()
        .arg("status")
        .arg(temp_dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no deployment found"));
}

#[test]
fn test_journal_lists_numbered_records() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    ignis_cmd()
        .arg("journal")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("   1  {"))
        .stdout(predicate::str::contains("execution-start"))
        .stdout(predicate::str::contains("execution-success"));
}

// ============================================================================
// Wipe Tests
// ============================================================================

#[test]
fn test_wipe_refuses_while_dependents_are_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    ignis_cmd()
        .arg("wipe")
        .arg(&dir)
        .arg("Module1:Token")
        .assert()
        .failure()
        .stderr(predicate::str::contains("recorded dependents"))
        .stderr(predicate::str::contains("Module1:Token#transfer"));
}

#[test]
fn test_wipe_unknown_future_fails() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    ignis_cmd()
        .arg("wipe")
        .arg(&dir)
        .arg("Module1:Ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no recorded state"));
}

#[test]
fn test_wiped_future_reruns_on_the_next_deploy() {
    let temp_dir = TempDir::new().unwrap();
    let module = write_module_json(&temp_dir);
    let dir = temp_dir.path().join("deployment");
    simulated_deploy(&module, &dir).assert().success();

    ignis_cmd()
        .arg("wipe")
        .arg(&dir)
        .arg("Module1:Token#transfer")
        .assert()
        .success()
        .stdout(predicate::str::contains("wiped"));
    assert_eq!(journal_lines(&dir).len(), 13);

    ignis_cmd()
        .arg("journal")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\":\"wipe\""));

    // The wiped call re-executes; the untouched deployment is reused.
    simulated_deploy(&module, &dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 succeeded"));
    assert_eq!(journal_lines(&dir).len(), 19);

    ignis_cmd()
        .arg("status")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 recorded: 2 succeeded"));
}
