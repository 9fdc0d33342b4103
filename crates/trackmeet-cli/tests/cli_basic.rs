//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify the JSON it prints.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_trackmeet-cli"))
        .args(args)
        .env("TRACKMEET_DATA_DIR", data_dir)
        .env_remove("TRACKMEET_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON from {args:?}: {e}\n{stdout}"))
}

#[test]
fn test_classify_boundaries() {
    let dir = TempDir::new().unwrap();
    let out = run_json(dir.path(), &["classify", "--activity", "running", "--score", "7"]);
    assert_eq!(out["tier"], "Intermediate");
    assert_eq!(out["unit"], "km");

    let out = run_json(dir.path(), &["classify", "--activity", "push-ups", "--score", "29.9"]);
    assert_eq!(out["tier"], "Beginner");
}

#[test]
fn test_unknown_activity_fails() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["classify", "--activity", "curling", "--score", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown activity"), "{stderr}");
}

#[test]
fn test_leaderboard_submit_and_show() {
    let dir = TempDir::new().unwrap();
    for (subject, score, location) in [("asha", "40", "north"), ("bilal", "60", "south"), ("chen", "50", "north")] {
        run_json(
            dir.path(),
            &["leaderboard", "submit", "--activity", "push-ups", "--subject", subject, "--score", score, "--location", location],
        );
    }

    let out = run_json(dir.path(), &["leaderboard", "show", "--activity", "push-ups"]);
    let entries = out["entries"].as_array().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e["subject_id"].as_str().unwrap()).collect();
    assert_eq!(names, ["bilal", "chen", "asha"]);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(out["locations"], serde_json::json!(["north", "south"]));

    let out = run_json(dir.path(), &["leaderboard", "show", "--activity", "push-ups", "--location", "north"]);
    let entries = out["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["subject_id"], "chen");
    assert_eq!(entries[1]["rank"], 2);
}

#[test]
fn test_session_replay_saves_history() {
    let dir = TempDir::new().unwrap();
    let track = dir.path().join("track.json");
    std::fs::write(
        &track,
        r#"[
            {"latitude": 0.0, "longitude": 0.0, "captured_at_ms": 1700000000000},
            {"latitude": 0.0, "longitude": 0.001, "captured_at_ms": 1700000030000},
            {"latitude": 0.0, "longitude": 0.002, "captured_at_ms": 1700000060000}
        ]"#,
    )
    .unwrap();

    let out = run_json(
        dir.path(),
        &["session", "replay", track.to_str().unwrap(), "--activity", "endurance-run", "--subject", "asha", "--save"],
    );
    let distance = out["summary"]["distance_meters"].as_f64().unwrap();
    assert!((distance - 222.39).abs() < 1.0);
    assert_eq!(out["summary"]["elapsed_seconds"], 60);
    assert_eq!(out["standing"]["rank"], 1);

    let history = run_json(dir.path(), &["history", "--limit", "5"]);
    let sessions = history.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["activity_type"], "endurance-run");
}

#[test]
fn test_config_set_get_and_validation() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "session.countdown_ticks", "5"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "session.countdown_ticks"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "session.tick_interval_ms", "0"]);
    assert_ne!(code, 0, "zero tick interval must be rejected");

    let (code, _, _) = run_cli(dir.path(), &["config", "get", "session.nope"]);
    assert_ne!(code, 0);

    let config = run_json(dir.path(), &["config", "list"]);
    assert_eq!(config["session"]["countdown_ticks"], 5);
}

#[test]
fn test_threshold_override_changes_classification() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "thresholds.pushups.advanced", "70"]);
    assert_eq!(code, 0, "{stderr}");

    let out = run_json(dir.path(), &["classify", "--activity", "push-ups", "--score", "75"]);
    assert_eq!(out["tier"], "Elite");
}
