//! Integration tests for CLI commands.
//!
//! Every test builds a scratch folder with migrations at the top and a `dev`
//! target below it that keeps its state in a local file.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let target = root.path().join("dev");
        fs::create_dir(&target).unwrap();
        fs::write(
            target.join("cairn.yaml"),
            "project: demo\nstate_file: .cairn-state\nenv:\n  BUCKET: assets\n",
        )
        .unwrap();
        Self { root }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn target(&self) -> PathBuf {
        self.path().join("dev")
    }

    fn target_arg(&self) -> String {
        self.target().to_str().unwrap().to_string()
    }

    fn state(&self) -> String {
        fs::read_to_string(self.target().join(".cairn-state")).unwrap_or_default()
    }

    /// Migration that appends its name to `trail.txt` in `do` and `-name` in `undo`.
    fn migration(&self, name: &str) -> &Self {
        fs::write(
            self.path().join(name),
            format!(
                "do:\n- echo {name} >> \"$CAIRN_CONFIG_DIR/../trail.txt\"\n\
                 undo:\n- echo -{name} >> \"$CAIRN_CONFIG_DIR/../trail.txt\"\n\
                 view:\n- echo viewing {name}\n"
            ),
        )
        .unwrap();
        self
    }

    fn trail(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("trail.txt"))
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    fn cairn(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("cairn").unwrap();
        cmd.args(["--no-color"])
            .args(args)
            .current_dir(self.path())
            .env_remove("RUST_LOG");
        cmd
    }
}

// ============================================================================
// Init / New
// ============================================================================

#[test]
fn init_writes_starter_config() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("staging");

    Command::cargo_bin("cairn")
        .unwrap()
        .args(["init", target.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("cairn.yaml"));

    let written = fs::read_to_string(target.join("cairn.yaml")).unwrap();
    assert!(written.contains("project: my-project"));
}

#[test]
fn init_reports_existing_config() {
    let ws = Workspace::new();

    ws.cairn(&["init", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("already present"))
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn new_creates_numbered_files() {
    let ws = Workspace::new();

    ws.cairn(&["new", "Add storage bucket"])
        .assert()
        .success()
        .stdout(predicate::str::contains("010_add_storage_bucket.yaml"));

    ws.cairn(&[
        "new",
        "grant access",
        "--do",
        "echo one\necho two",
        "--if",
        "PROJECT == 'demo'",
    ])
    .assert()
    .success();

    let second = fs::read_to_string(ws.path().join("015_grant_access.yaml")).unwrap();
    assert!(second.contains("# grant access"));
    assert!(second.contains("- echo one"));
    assert!(second.contains("- echo two"));
    assert!(second.contains("PROJECT == 'demo'"));
}

#[test]
fn new_honors_migrations_folder() {
    let ws = Workspace::new();
    let elsewhere = ws.path().join("elsewhere");

    ws.cairn(&["--migrations", elsewhere.to_str().unwrap(), "new", "first"])
        .assert()
        .success();

    assert!(elsewhere.join("010_first.yaml").is_file());
}

// ============================================================================
// Up / Down
// ============================================================================

#[test]
fn up_applies_pending_and_saves_state() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml").migration("020_two.yaml");

    ws.cairn(&["up", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 2 migration(s)"));

    assert_eq!(ws.trail(), vec!["010_one.yaml", "020_two.yaml"]);
    assert_eq!(ws.state(), "020_two.yaml");

    ws.cairn(&["up", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending migrations"));
    assert_eq!(ws.trail().len(), 2);
}

#[test]
fn up_stops_after_requested_migration() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml")
        .migration("020_two.yaml")
        .migration("030_three.yaml");

    ws.cairn(&["up", &ws.target_arg(), "020_two.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"));

    assert_eq!(ws.state(), "020_two.yaml");
    assert_eq!(ws.trail(), vec!["010_one.yaml", "020_two.yaml"]);
}

#[test]
fn up_rejects_unknown_stop_without_running() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");

    ws.cairn(&["up", &ws.target_arg(), "999_typo.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such migration file: 999_typo.yaml"));

    assert!(ws.trail().is_empty());
    assert_eq!(ws.state(), "");
}

#[test]
fn up_with_missing_migrations_folder_fails() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");
    let typo = ws.path().join("migratoins");

    ws.cairn(&["--migrations", typo.to_str().unwrap(), "up", &ws.target_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read migrations from"))
        .stdout(predicate::str::contains("No pending migrations").not());

    assert!(ws.trail().is_empty());
    assert_eq!(ws.state(), "");
}

#[test]
fn failing_migration_prints_diagnostics_and_keeps_progress() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");
    fs::write(
        ws.path().join("020_broken.yaml"),
        "do:\n- echo about to fail\n- exit 4\n",
    )
    .unwrap();
    ws.migration("030_three.yaml");

    ws.cairn(&["up", &ws.target_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("executing [do] failed"))
        .stderr(predicate::str::contains("checking cairn config"))
        .stderr(predicate::str::contains("\"project\": \"demo\""))
        .stderr(predicate::str::contains("about to fail"));

    assert_eq!(ws.state(), "010_one.yaml");
    assert_eq!(ws.trail(), vec!["010_one.yaml"]);
}

#[test]
fn down_without_history_fails() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");

    ws.cairn(&["down", &ws.target_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no applied migrations"));

    assert!(ws.trail().is_empty());
}

#[test]
fn down_undoes_one_step() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml").migration("020_two.yaml");
    fs::write(ws.target().join(".cairn-state"), "020_two.yaml").unwrap();

    ws.cairn(&["down", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("010_one.yaml"));

    assert_eq!(ws.state(), "010_one.yaml");
    assert_eq!(ws.trail(), vec!["-020_two.yaml"]);
}

#[test]
fn unknown_state_file_entry_is_rejected() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");
    fs::write(ws.target().join(".cairn-state"), "005_removed.yaml").unwrap();

    ws.cairn(&["up", &ws.target_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong project?, git pull?"));

    assert!(ws.trail().is_empty());
}

// ============================================================================
// Status / Plan / View
// ============================================================================

#[test]
fn status_lists_every_state() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml").migration("020_two.yaml");
    fs::write(
        ws.path().join("030_elsewhere.yaml"),
        "if: PROJECT == 'prod'\ndo:\n- echo never\n",
    )
    .unwrap();
    fs::write(ws.target().join(".cairn-state"), "010_one.yaml").unwrap();

    ws.cairn(&["status", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied"))
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("skip-pending"))
        .stdout(predicate::str::contains("020 two"));

    assert_eq!(ws.state(), "010_one.yaml");
}

#[test]
fn plan_substitutes_without_running() {
    let ws = Workspace::new();
    fs::write(
        ws.path().join("010_bucket.yaml"),
        "do:\n- gsutil mb gs://$PROJECT-${BUCKET}\n",
    )
    .unwrap();

    ws.cairn(&["plan", &ws.target_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("gsutil mb gs://demo-assets"));

    assert_eq!(ws.state(), "");
}

#[test]
fn view_stops_at_pending() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml").migration("020_two.yaml");
    fs::write(ws.target().join(".cairn-state"), "010_one.yaml").unwrap();

    ws.cairn(&["view", &ws.target_arg()])
        .assert()
        .success()
        .stderr(predicate::str::contains("viewing 010_one.yaml"))
        .stderr(predicate::str::contains("viewing 020_two.yaml").not())
        .stdout(predicate::str::contains("020 two is pending"));
}

// ============================================================================
// Force
// ============================================================================

#[test]
fn force_state_overwrites_pointer() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml").migration("020_two.yaml");

    ws.cairn(&["-q", "force", "state", &ws.target_arg(), "020_two.yaml"])
        .assert()
        .success();

    assert_eq!(ws.state(), "020_two.yaml");
    assert!(ws.trail().is_empty());
}

#[test]
fn force_state_rejects_missing_file() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");

    ws.cairn(&["-q", "force", "state", &ws.target_arg(), "099_nope.yaml"])
        .assert()
        .failure();

    assert_eq!(ws.state(), "");
}

#[test]
fn force_state_declined_at_prompt() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");

    ws.cairn(&["force", "state", &ws.target_arg(), "010_one.yaml"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));

    assert_eq!(ws.state(), "");
}

#[test]
fn force_do_and_undo_leave_state() {
    let ws = Workspace::new();
    ws.migration("010_one.yaml");

    ws.cairn(&["-q", "force", "do", &ws.target_arg(), "010_one.yaml"])
        .assert()
        .success();
    ws.cairn(&["-q", "force", "undo", &ws.target_arg(), "010_one.yaml"])
        .assert()
        .success();

    assert_eq!(ws.trail(), vec!["010_one.yaml", "-010_one.yaml"]);
    assert_eq!(ws.state(), "");
}
