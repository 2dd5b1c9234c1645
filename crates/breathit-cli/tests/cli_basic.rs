//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data dir.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "breathit-cli", "--"])
        .args(args)
        .env("BREATHIT_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("session"));
    assert!(stdout.contains("history"));
}

#[test]
fn test_config_list_creates_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["practice"]["minutes"], 5);
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "practice.hold_secs", "7"]);
    assert_eq!(code, 0, "config set failed: {stderr}");
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "practice.hold_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "7");
}

#[test]
fn test_config_set_rejects_bad_value() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "practice.minutes", "lots"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_history_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(dir.path(), &["history", "list", "--json"]);
    assert_eq!(code, 0, "history list failed: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn test_sounds_list_filters_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let sounds = dir.path().join("sounds");
    std::fs::create_dir(&sounds).unwrap();
    for name in ["gong.wav", "notes.txt", "bell.mp3"] {
        std::fs::write(sounds.join(name), b"").unwrap();
    }
    let (code, stdout, _) = run_cli(dir.path(), &["sounds", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sounds"], serde_json::json!(["bell.mp3", "gong.wav"]));
}

#[test]
fn test_simulate_one_minute() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(dir.path(), &["session", "simulate", "--minutes", "1"]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    let summary: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(summary["outcome"], "completed");
    assert_eq!(summary["cycles_completed"], 4);
    assert_eq!(summary["elapsed_ms"], 60_000);
}

#[test]
fn test_config_set_rejects_out_of_range_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "practice.minutes", "500"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("1..=120"), "unexpected error: {stderr}");
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "practice.minutes"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_reports_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "practice.exhale_secs", "8"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("practice.exhale_secs = 8"));
    assert!(stdout.contains("next session: 4-4-8-4 for 05:00"));
}

#[test]
fn test_simulate_clamps_huge_fps() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) =
        run_cli(dir.path(), &["session", "simulate", "--minutes", "1", "--fps", "1e12"]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    let summary: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(summary["outcome"], "completed");
    // 240 fps is the ceiling: 60 s of frames plus the opening one.
    assert_eq!(summary["frames"], 14_401);
}
