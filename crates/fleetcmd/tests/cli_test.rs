//! Integration tests for the `fleetcmd` CLI binary.
//!
//! These tests validate argument parsing, planning output, configuration
//! commands, and exit codes, without requiring any reachable device.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fleetcmd` binary with env isolation.
///
/// Clears all `FLEETCMD_*` env vars and points the config file into `home`
/// so tests never touch the user's real configuration.
fn fleetcmd_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetcmd");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("FLEETCMD_CONFIG", home.join("config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("FLEETCMD_PROFILE")
        .env_remove("FLEETCMD_USERNAME")
        .env_remove("FLEETCMD_PASSWORD")
        .env_remove("FLEETCMD_OUTPUT")
        .env_remove("FLEETCMD_LOG_FILE")
        .env_remove("FLEETCMD_BATCH_SIZE")
        .env_remove("FLEETCMD_SCHEDULING")
        .env_remove("FLEETCMD_OUTPUT_DIR");
    cmd
}

fn workspace_with(devices: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("devices.csv"), devices).unwrap();
    dir
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = fleetcmd_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    fleetcmd_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("network device")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("plan"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    fleetcmd_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetcmd"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    fleetcmd_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Plan ────────────────────────────────────────────────────────────

#[test]
fn test_plan_plain_lists_items_in_order() {
    let ws = workspace_with("10.0.0.1;show version\n10.0.0.2\n# spare\n10.0.0.1;show clock\n");
    fleetcmd_cmd(ws.path())
        .args(["plan", "--devices", "devices.csv", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            "0\t10.0.0.1\tshow version\n\
             0\t10.0.0.1\tshow clock\n\
             0\t10.0.0.2\tshow mac address-table | e CPU\n",
        );
}

#[test]
fn test_plan_partitions_by_batch_size() {
    let devices: String = (1..=5).map(|i| format!("10.0.0.{i}\n")).collect();
    let ws = workspace_with(&devices);
    let output = fleetcmd_cmd(ws.path())
        .args(["plan", "-d", "devices.csv", "-b", "2", "-o", "plain", "-c", "show clock"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let batches: Vec<&str> = stdout.lines().map(|l| l.split('\t').next().unwrap()).collect();
    assert_eq!(batches, vec!["0", "0", "1", "1", "2"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("in 3 batches"));
}

#[test]
fn test_plan_config_mode_uses_snippet() {
    let ws = workspace_with("10.0.0.1;show version\n10.0.0.2\n");
    std::fs::write(
        ws.path().join("snippet.txt"),
        "! access ports\ninterface Gi0/1\n shutdown\n",
    )
    .unwrap();

    fleetcmd_cmd(ws.path())
        .args(["plan", "-d", "devices.csv", "-m", "config", "-s", "snippet.txt", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"configuration\"")
                .and(predicate::str::contains("interface Gi0/1"))
                .and(predicate::str::contains("access ports").not()),
        );
}

#[test]
fn test_plan_missing_directory_exits_not_found() {
    let home = tempfile::tempdir().unwrap();
    let output = fleetcmd_cmd(home.path())
        .args(["plan", "--devices", "nope.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Device directory not found"));
}

#[test]
fn test_config_mode_without_snippet_is_usage_error() {
    let ws = workspace_with("10.0.0.1\n");
    let output = fleetcmd_cmd(ws.path())
        .args(["plan", "-d", "devices.csv", "--mode", "config"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_snippet_in_show_mode_is_usage_error() {
    let ws = workspace_with("10.0.0.1\n");
    std::fs::write(ws.path().join("snippet.txt"), "interface Gi0/1\n").unwrap();
    let output = fleetcmd_cmd(ws.path())
        .args(["plan", "-d", "devices.csv", "--snippet", "snippet.txt"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("show"));
}

#[test]
fn test_empty_address_is_invalid_directory() {
    let ws = workspace_with("10.0.0.1\n ;show clock\n");
    let output = fleetcmd_cmd(ws.path())
        .args(["plan", "-d", "devices.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("line 2"));
}

// ── Run ─────────────────────────────────────────────────────────────

#[test]
fn test_run_without_credentials_exits_auth() {
    let ws = workspace_with("10.0.0.1\n");
    let output = fleetcmd_cmd(ws.path())
        .args(["run", "-d", "devices.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("No credentials"));
}

#[test]
fn test_run_reports_unreachable_device_and_completes() {
    // Nothing listens on port 1; the connection is refused immediately.
    let ws = workspace_with("127.0.0.1\n");
    let output = fleetcmd_cmd(ws.path())
        .args([
            "run",
            "-d",
            "devices.csv",
            "-u",
            "netops",
            "--port",
            "1",
            "--connect-timeout",
            "5",
        ])
        .env("FLEETCMD_PASSWORD", "hunter2")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let text = combined_output(&output);
    assert!(text.contains("127.0.0.1"), "Expected device in output:\n{text}");
    assert!(text.contains("Failed:    1"), "Expected summary in output:\n{text}");
}

#[test]
fn test_run_fail_on_error_exits_nine() {
    let ws = workspace_with("127.0.0.1\n");
    let output = fleetcmd_cmd(ws.path())
        .args([
            "run",
            "-d",
            "devices.csv",
            "-u",
            "netops",
            "--port",
            "1",
            "--connect-timeout",
            "5",
            "--fail-on-error",
            "--quiet",
        ])
        .env("FLEETCMD_PASSWORD", "hunter2")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(9));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_set_then_show_redacts_password() {
    let home = tempfile::tempdir().unwrap();

    for (key, value) in [
        ("username", "netops"),
        ("password", "hunter2"),
        ("defaults.batch_size", "25"),
    ] {
        fleetcmd_cmd(home.path())
            .args(["config", "set", key, value])
            .assert()
            .success();
    }

    fleetcmd_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.default]")
                .and(predicate::str::contains("username = \"netops\""))
                .and(predicate::str::contains("batch_size = 25"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_set_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = fleetcmd_cmd(home.path())
        .args(["config", "set", "colour", "red"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_use_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = fleetcmd_cmd(home.path())
        .args(["config", "use", "staging"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("staging"));
}
