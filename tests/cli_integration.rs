//! Integration tests for the `gtree` CLI.
//!
//! Each test runs `gtree` as a subprocess against a temp state directory.
//! Commands that need the task store talk to `tests/fixtures/fake_gorev.sh`,
//! a shell stand-in that serves a fixed three-task tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the built `gtree` binary.
fn gtree_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gtree"))
}

fn fake_server() -> String {
    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake_gorev.sh");
    format!("sh {}", script.display())
}

/// Run `gtree -C <dir>` with args, return (stdout, stderr, success).
fn run_gtree(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(gtree_bin())
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("FAKE_GOREV_LOG", dir.join("requests.log"))
        .env_remove("GOREV_TREE_LOG")
        .output()
        .expect("failed to run gtree");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `gtree` against the fake store expecting success, return stdout.
fn run_ok(dir: &Path, args: &[&str]) -> String {
    let server = fake_server();
    let mut full = vec!["--server", server.as_str()];
    full.extend_from_slice(args);
    let (stdout, stderr, success) = run_gtree(dir, &full);
    if !success {
        panic!("gtree {:?} failed:\nstdout: {}\nstderr: {}", args, stdout, stderr);
    }
    stdout
}

fn requests(dir: &Path) -> String {
    fs::read_to_string(dir.join("requests.log")).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Local commands
// ---------------------------------------------------------------------------

#[test]
fn test_help_lists_commands() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (stdout, _, success) = run_gtree(tmp.path(), &["--help"]);
    assert!(success);
    for cmd in ["tree", "show", "move", "status", "profiles"] {
        assert!(stdout.contains(cmd), "help is missing {cmd}");
    }
}

#[test]
fn test_profiles_need_no_server() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (stdout, _, success) = run_gtree(
        tmp.path(),
        &["--server", "/nonexistent/gorev", "profiles"],
    );
    assert!(success);
    assert!(stdout.contains("No saved filters."));
}

#[test]
fn test_unreachable_server_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_gtree(tmp.path(), &["--server", "/nonexistent/gorev", "tree"]);
    assert!(!success);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("failed to start"), "stderr: {stderr}");
}

// ---------------------------------------------------------------------------
// Tree view
// ---------------------------------------------------------------------------

#[test]
fn test_tree_groups_by_status() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["tree"]);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("▾ Pending"));
    assert!(out.contains("Triage bugs [t3]"));
    assert!(out.contains("▾ Ship release [t1]"));
    assert!(out.contains("• Write notes [t2]"));
    assert!(!out.contains("Completed"));
}

#[test]
fn test_tree_json_order() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["tree", "--json", "--group", "none"]);
    let view: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(view["order"], serde_json::json!(["t1", "t2", "t3"]));
    assert_eq!(view["nodes"][0]["kind"], "task");
    assert_eq!(view["nodes"][0]["children"][0]["id"], "t2");
}

#[test]
fn test_search_without_results() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["tree", "--search", "nothing here"]);
    assert_eq!(out.trim(), "No results for \"nothing here\".");
}

#[test]
fn test_saved_profile_is_listed() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ok(tmp.path(), &["tree", "--status", "pending", "--save-profile", "todo"]);

    let (stdout, _, success) = run_gtree(tmp.path(), &["profiles"]);
    assert!(success);
    assert!(stdout.contains("todo: status=Pending"), "stdout: {stdout}");

    let (_, _, success) = run_gtree(tmp.path(), &["profiles", "--remove", "todo"]);
    assert!(success);
    let (stdout, _, _) = run_gtree(tmp.path(), &["profiles"]);
    assert!(stdout.contains("No saved filters."));
}

#[test]
fn test_remember_keeps_view_settings() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ok(tmp.path(), &["tree", "--group", "none", "--remember"]);
    let out = run_ok(tmp.path(), &["tree", "--json"]);
    let view: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(view["nodes"][0]["kind"], "task");
}

#[test]
fn test_save_default_writes_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ok(tmp.path(), &["tree", "--group", "priority", "--save-default"]);
    let config = fs::read_to_string(tmp.path().join("gorev-tree.toml")).unwrap();
    assert!(config.contains("grouping = \"by-priority\""), "config: {config}");
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[test]
fn test_move_sends_reparent() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["move", "t3", "--onto", "t1"]);
    assert!(out.contains("moved t3"));

    let log = requests(tmp.path());
    assert!(log.contains("\"name\":\"gorev_ust_degistir\""));
    assert!(log.contains("\"yeni_parent_id\":\"t1\""));
}

#[test]
fn test_move_to_status_group_sets_status() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["move", "t3", "--to-group", "in-progress"]);
    assert!(out.contains("moved t3"));

    let log = requests(tmp.path());
    assert!(log.contains("\"name\":\"gorev_guncelle\""));
    assert!(log.contains("\"durum\":\"devam_ediyor\""));
    assert!(!log.contains("gorev_ust_degistir"));
}

#[test]
fn test_move_root_to_canvas_sends_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["move", "t3", "--root"]);
    assert!(out.contains("nothing to move"));
    assert!(!requests(tmp.path()).contains("gorev_ust_degistir"));
}

#[test]
fn test_status_without_selection_warns() {
    let tmp = tempfile::TempDir::new().unwrap();
    let server = fake_server();
    let (_, stderr, success) = run_gtree(tmp.path(), &["--server", &server, "status", "completed"]);
    assert!(!success);
    assert!(stderr.contains("Select at least one task first."), "stderr: {stderr}");
    assert!(!requests(tmp.path()).contains("gorev_guncelle"));
}

#[test]
fn test_status_uses_remembered_selection() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["select", "t3"]);
    assert!(out.contains("1 selected: t3"));

    let out = run_ok(tmp.path(), &["status", "in-progress"]);
    assert!(out.contains("ok    t3"));
    let log = requests(tmp.path());
    assert!(log.contains("\"durum\":\"devam_ediyor\""));

    let (_, _, success) = run_gtree(tmp.path(), &["select", "--clear"]);
    assert!(success);
    let state = fs::read_to_string(tmp.path().join(".state.json")).unwrap();
    assert!(!state.contains("t3"));
}
