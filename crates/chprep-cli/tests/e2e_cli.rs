//! E2E tests for the `chprep` binary: exit codes, stdout/stderr contract and
//! the artifact left on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn chprep_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chprep"));
    cmd.current_dir(dir);
    cmd.env("CHPREP_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("CHPREP_TIMING");
    cmd
}

fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// Directed 4-cycle with one chord, as an adjacency listing.
const RING_ADJ: &str = "AdjacencyGraph\n4\n5\n0 2 3 4\n1 3 2 3 0\n2.0 1.5 4 1 3.9\n";

fn ring_bin() -> Vec<u8> {
    let mut bytes = Vec::new();
    for word in [4_u64, 4, 0] {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    for offset in [0_u64, 1, 2, 3, 4] {
        bytes.extend_from_slice(&offset.to_le_bytes());
    }
    for head in [1_u32, 2, 3, 0] {
        bytes.extend_from_slice(&head.to_le_bytes());
    }
    bytes
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[test]
fn text_input_produces_artifact() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.adj", RING_ADJ.as_bytes());

    chprep_cmd(dir.path())
        .args(["ring.adj", "ring.ch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading adjacency format..."))
        .stdout(predicate::str::contains("contracting 4 nodes with 5 arcs"))
        .stdout(predicate::str::contains("contraction finished"))
        .stdout(predicate::str::contains("wrote ring.ch (4 nodes, 5 arcs)"));

    let artifact = std::fs::read(dir.path().join("ring.ch")).expect("artifact");
    assert_eq!(&artifact[..4], b"CHPH");
}

#[test]
fn binary_input_produces_artifact() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.bin", &ring_bin());

    chprep_cmd(dir.path())
        .args(["ring.bin", "ring.ch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading binary format..."));

    assert!(dir.path().join("ring.ch").exists());
}

#[test]
fn json_report_is_the_only_stdout() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.bin", &ring_bin());

    let output = chprep_cmd(dir.path())
        .args(["--json", "ring.bin", "ring.ch"])
        .output()
        .expect("run should not crash");
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["format"], "binary");
    assert_eq!(json["node_count"], 4);
    assert_eq!(json["arc_count"], 4);
    let stages: Vec<&str> = json["stages"]
        .as_array()
        .expect("stages array")
        .iter()
        .map(|s| s["name"].as_str().expect("stage name"))
        .collect();
    assert_eq!(stages, ["read", "validate", "build", "check", "save"]);
}

#[test]
fn timing_flag_prints_table_to_stderr() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.adj", RING_ADJ.as_bytes());

    chprep_cmd(dir.path())
        .args(["--timing", "ring.adj", "ring.ch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("timing report:"))
        .stderr(predicate::str::contains("pipeline.build"));
}

#[test]
fn project_config_is_honoured() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.adj", RING_ADJ.as_bytes());
    write(
        dir.path(),
        "chprep.toml",
        b"[contraction]\nprogress_percent = 0\n",
    );

    chprep_cmd(dir.path())
        .args(["ring.adj", "ring.ch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contracted ").not());
}

// ---------------------------------------------------------------------------
// Usage errors (exit 1) and help (exit 0)
// ---------------------------------------------------------------------------

#[test]
fn missing_arguments_exit_with_usage() {
    let dir = TempDir::new().expect("tempdir");
    chprep_cmd(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn surplus_positionals_exit_with_usage() {
    let dir = TempDir::new().expect("tempdir");
    chprep_cmd(dir.path())
        .args(["a.adj", "b.ch", "c", "d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    chprep_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<INPUT>"));
}

// ---------------------------------------------------------------------------
// Setup errors (exit 3)
// ---------------------------------------------------------------------------

#[test]
fn unsupported_extension_exits_three() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.gr", RING_ADJ.as_bytes());

    chprep_cmd(dir.path())
        .args(["ring.gr", "ring.ch"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("error[E2004]"));
    assert!(!dir.path().join("ring.ch").exists());
}

#[test]
fn missing_input_exits_three() {
    let dir = TempDir::new().expect("tempdir");
    chprep_cmd(dir.path())
        .args(["absent.bin", "out.ch"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn malformed_text_exits_three() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "short.adj", b"AdjacencyGraph 4 5 0 2");

    chprep_cmd(dir.path())
        .args(["short.adj", "out.ch"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("error[E2005]"));
}

#[test]
fn broken_config_exits_three() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.adj", RING_ADJ.as_bytes());
    write(dir.path(), "bad.toml", b"[contraction]\nunknown = 1\n");

    chprep_cmd(dir.path())
        .args(["--config", "bad.toml", "ring.adj", "ring.ch"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("error[E1002]"));
    assert!(!dir.path().join("ring.ch").exists());
}

// ---------------------------------------------------------------------------
// Validation errors (exit 2)
// ---------------------------------------------------------------------------

#[test]
fn invalid_graph_exits_two_and_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "bad.adj", b"AdjacencyGraph\n2 1\n0 1\n2\n5.0\n");

    chprep_cmd(dir.path())
        .args(["bad.adj", "bad.ch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[E3001]"))
        .stderr(predicate::str::contains("out-of-bounds node id"));
    assert!(!dir.path().join("bad.ch").exists());
}

#[test]
fn json_mode_reports_errors_as_json() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "bad.adj", b"AdjacencyGraph 2 1 1 1 1 5.0");

    let output = chprep_cmd(dir.path())
        .args(["--json", "bad.adj", "bad.ch"])
        .output()
        .expect("run should not crash");
    assert_eq!(output.status.code(), Some(2));

    let json: Value = serde_json::from_slice(&output.stderr).expect("valid JSON");
    assert_eq!(json["error"]["error_code"], "E3001");
    assert!(
        json["error"]["message"]
            .as_str()
            .expect("message")
            .contains("first element of first_out must be 0")
    );
}

// ---------------------------------------------------------------------------
// Builder errors (exit 2)
// ---------------------------------------------------------------------------

#[test]
fn unwritable_output_exits_two_and_leaves_nothing() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ring.adj", RING_ADJ.as_bytes());

    chprep_cmd(dir.path())
        .args(["ring.adj", "nodir/ring.ch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[E4003]"));
    assert!(!dir.path().join("nodir").exists());
    let left: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name())
        .collect();
    assert_eq!(left, [std::ffi::OsString::from("ring.adj")]);
}
