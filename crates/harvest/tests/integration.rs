//! End-to-end CLI integration tests for the `harvest` binary.
//!
//! Each test creates its own temporary directory, initializes a harvest
//! project, and exercises the binary as a subprocess via `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `Command` targeting the cargo-built `harvest` binary, isolated
/// from any `HARVEST_*` settings in the caller's environment.
fn harvest() -> Command {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    for key in ["HARVEST_DIR", "HARVEST_LOG", "HARVEST_JSON", "HARVEST_DATABASE"] {
        cmd.env_remove(key);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Initialize a fresh project in a temp directory and return the handle.
fn init_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    harvest()
        .args(["init", "--quiet"])
        .current_dir(tmp.path())
        .assert()
        .success();
    tmp
}

/// Run a command with `--json` and parse stdout.
fn json(tmp: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = harvest()
        .args(args)
        .arg("--json")
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn id_of(value: &serde_json::Value) -> i64 {
    value["id"].as_i64().expect("id should be a number")
}

fn ids_of(value: &serde_json::Value) -> Vec<i64> {
    let mut ids: Vec<i64> = value
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(id_of)
        .collect();
    ids.sort();
    ids
}

/// Registers repo `core` with branch `main`.
fn setup_branch(tmp: &TempDir) {
    json(tmp, &["repo", "add", "core", "git@example.com:core.git"]);
    json(tmp, &["branch", "add", "--repo", "core", "main"]);
}

/// Records a change on core/main at minute `minute` past 09:00.
fn add_change(tmp: &TempDir, rev: &str, minute: u32, extra: &[&str]) -> i64 {
    let timestamp = format!("2024-06-01T09:{minute:02}:00Z");
    let mut args = vec![
        "change", "add", "--repo", "core", "--branch", "main", "--rev", rev, "--summary", rev,
        "--author", "dev", "--timestamp", timestamp.as_str(),
    ];
    args.extend_from_slice(extra);
    id_of(&json(tmp, &args))
}

/// Registers project `fw` and the Jenkins integration.
fn setup_ledger(tmp: &TempDir) {
    json(tmp, &["project", "add", "fw"]);
    json(tmp, &["integration", "add", "Jenkins", "--abbrev", "JNK"]);
}

/// Records a passed build started at minute `minute` past 10:00.
fn add_build(tmp: &TempDir, ci_id: &str, minute: u32, last_change: Option<i64>) -> i64 {
    let started = format!("2024-06-01T10:{minute:02}:00Z");
    let change = last_change.map(|c| c.to_string());
    let mut args = vec![
        "build",
        "record",
        "--project",
        "fw",
        "--integration",
        "Jenkins",
        "--ci-id",
        ci_id,
        "--status",
        "PASSED",
        "--started",
        started.as_str(),
    ];
    if let Some(change) = &change {
        args.extend_from_slice(&["--last-change", change.as_str()]);
    }
    id_of(&json(tmp, &args))
}

// ---------------------------------------------------------------------------
// Init and config
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_and_refuses_twice() {
    let tmp = init_project();
    let harvest_dir = tmp.path().join(".harvest");
    assert!(harvest_dir.join("harvest.db").is_file());
    assert!(harvest_dir.join("config.yaml").is_file());
    assert!(harvest_dir.join(".gitignore").is_file());

    harvest()
        .arg("init")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    harvest()
        .args(["init", "--force", "--quiet"])
        .current_dir(tmp.path())
        .assert()
        .success();
}

#[test]
fn commands_without_init_point_to_init() {
    let tmp = TempDir::new().unwrap();
    harvest()
        .args(["repo", "list"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("harvest init"));
}

#[test]
fn config_get_set_roundtrip() {
    let tmp = init_project();
    harvest()
        .args(["config", "get", "closure.max-nodes"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("100000\n");

    harvest()
        .args(["config", "set", "closure.merge-traversal", "symmetric"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let value = json(&tmp, &["config", "get", "closure.merge-traversal"]);
    assert_eq!(value["value"], "symmetric");

    harvest()
        .args(["config", "set", "ledger.page-size", "0"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ledger.page-size"));

    harvest()
        .args(["config", "get", "no.such.key"])
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn commands_work_from_subdirectory() {
    let tmp = init_project();
    let nested = tmp.path().join("jobs").join("nightly");
    std::fs::create_dir_all(&nested).unwrap();
    harvest()
        .args(["project", "add", "fw"])
        .current_dir(&nested)
        .assert()
        .success();
    let projects = json(&tmp, &["project", "list"]);
    assert_eq!(projects.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Change graph
// ---------------------------------------------------------------------------

#[test]
fn change_graph_closures() {
    let tmp = init_project();
    setup_branch(&tmp);

    let c1 = add_change(&tmp, "c1", 0, &[]);
    let c4 = add_change(&tmp, "c4", 1, &[]);
    let c1s = c1.to_string();
    let c4s = c4.to_string();
    let c2 = add_change(&tmp, "c2", 2, &["--parent", c1s.as_str(), "--merged-from", c4s.as_str()]);
    let c2s = c2.to_string();
    let c3 = add_change(&tmp, "c3", 3, &["--parent", c2s.as_str()]);

    let ancestors = json(&tmp, &["change", "ancestors", c3.to_string().as_str()]);
    let mut expected = vec![c1, c4, c2, c3];
    expected.sort();
    assert_eq!(ids_of(&ancestors), expected);

    let descendants = json(&tmp, &["change", "descendants", c4s.as_str()]);
    let mut expected = vec![c4, c2, c3];
    expected.sort();
    assert_eq!(ids_of(&descendants), expected);

    let shown = json(&tmp, &["change", "show", c2s.as_str()]);
    assert_eq!(ids_of(&shown["merge_sources"]), vec![c4]);
    assert_eq!(ids_of(&shown["children"]), vec![c3]);
}

#[test]
fn merge_cycle_is_rejected() {
    let tmp = init_project();
    setup_branch(&tmp);
    let c1 = add_change(&tmp, "c1", 0, &[]);
    let c2 = add_change(&tmp, "c2", 1, &["--parent", c1.to_string().as_str()]);

    harvest()
        .args(["change", "merge", c2.to_string().as_str(), c1.to_string().as_str()])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn re_recording_a_change_differently_fails() {
    let tmp = init_project();
    setup_branch(&tmp);
    let first = add_change(&tmp, "c1", 0, &[]);
    // Identical re-record returns the stored change.
    assert_eq!(add_change(&tmp, "c1", 0, &[]), first);

    harvest()
        .args([
            "change", "add", "--repo", "core", "--branch", "main", "--rev", "c1", "--summary",
            "rewritten", "--author", "dev", "--timestamp", "2024-06-01T09:00:00Z",
        ])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity violation"));
}

#[test]
fn closure_bound_comes_from_environment() {
    let tmp = init_project();
    setup_branch(&tmp);
    let c1 = add_change(&tmp, "c1", 0, &[]);
    let c2 = add_change(&tmp, "c2", 1, &["--parent", c1.to_string().as_str()]);

    harvest()
        .args(["change", "ancestors", c2.to_string().as_str()])
        .env("HARVEST_CLOSURE__MAX_NODES", "1")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeded 1 nodes"));
}

#[test]
fn issues_link_to_changes() {
    let tmp = init_project();
    setup_branch(&tmp);
    let c1 = add_change(&tmp, "c1", 0, &[]);

    let issue = json(&tmp, &["issue", "add", "FW-12", "--system", "jira"]);
    let issue_id = id_of(&issue).to_string();
    json(&tmp, &["issue", "link", issue_id.as_str(), c1.to_string().as_str()]);

    let linked = json(&tmp, &["issue", "list", "--change", c1.to_string().as_str()]);
    assert_eq!(linked[0]["tracking_code"], "FW-12");
    assert_eq!(linked[0]["change_id"], c1);
}

// ---------------------------------------------------------------------------
// Build ledger and provenance
// ---------------------------------------------------------------------------

#[test]
fn build_provenance_flow() {
    let tmp = init_project();
    setup_branch(&tmp);
    setup_ledger(&tmp);

    let c1 = add_change(&tmp, "c1", 0, &[]);
    let c2 = add_change(&tmp, "c2", 1, &["--parent", c1.to_string().as_str()]);
    let c3 = add_change(&tmp, "c3", 2, &["--parent", c2.to_string().as_str()]);

    let b1 = add_build(&tmp, "1", 0, Some(c2));
    let b2 = add_build(&tmp, "2", 10, Some(c3));

    let last = json(&tmp, &["build", "last-good", "--project", "fw"]);
    assert_eq!(id_of(&last), b2);

    let prev = json(&tmp, &["build", "prev-good", b2.to_string().as_str()]);
    assert_eq!(id_of(&prev), b1);

    let report = json(&tmp, &["build", "changes", b2.to_string().as_str()]);
    assert_eq!(id_of(&report["previous"]), b1);
    assert_eq!(ids_of(&report["introduced"]), vec![c3]);

    let first = json(&tmp, &["build", "changes", b1.to_string().as_str()]);
    assert!(first["previous"].is_null());
    assert_eq!(ids_of(&first["introduced"]), vec![c1, c2]);

    let good = json(&tmp, &["build", "good", "--project", "fw"]);
    let order: Vec<i64> = good.as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(order, vec![b1, b2]);

    harvest()
        .args(["build", "changes", b2.to_string().as_str()])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("c3"));
}

#[test]
fn build_record_upserts_by_key() {
    let tmp = init_project();
    setup_ledger(&tmp);

    let pending = json(
        &tmp,
        &[
            "build", "record", "--project", "fw", "--integration", "Jenkins", "--ci-id", "7",
            "--jenkins-project", "nightly",
        ],
    );
    assert!(pending["status"].is_null());

    let done = json(
        &tmp,
        &[
            "build", "record", "--project", "fw", "--integration", "Jenkins", "--ci-id", "7",
            "--status", "FAILED", "--started", "2024-06-01T10:00:00Z",
        ],
    );
    assert_eq!(id_of(&done), id_of(&pending));
    assert_eq!(done["status"], "FAILED");
    // No variant flag on update: the stored payload is kept.
    assert_eq!(done["variant"]["kind"], "jenkins");

    let listed = json(&tmp, &["build", "list", "--project", "fw"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn unresolved_build_is_an_error() {
    let tmp = init_project();
    setup_ledger(&tmp);
    let build = add_build(&tmp, "1", 0, None);

    harvest()
        .args(["build", "changes", build.to_string().as_str(), "--json"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not yet resolvable"))
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn stats_counts_rows() {
    let tmp = init_project();
    setup_branch(&tmp);
    setup_ledger(&tmp);
    let c1 = add_change(&tmp, "c1", 0, &[]);
    add_build(&tmp, "1", 0, Some(c1));

    let stats = json(&tmp, &["stats"]);
    assert_eq!(stats["changes"], 1);
    assert_eq!(stats["builds"], 1);
    assert_eq!(stats["good_builds"], 1);
}

#[test]
fn version_prints() {
    harvest()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("harvest version"));
}
