#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Run the binary with an isolated home and data directory
fn run_cchh(home: &Path, json: &str, env: &[(&str, &str)]) -> (String, String, i32) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cchh"));
    command
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("CCHH_HOME", home.join("data"))
        .env("CCHH_TEST_ENVIRONMENT", "true");
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(json.as_bytes()).expect("failed to write");
    }

    let output = child.wait_with_output().expect("failed to wait");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn event_log(home: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(home.join("data/logs/events.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_input_is_echoed() {
    let home = TempDir::new().unwrap();
    let json = r#"{"hook_event_name":"Stop","session_id":"abc","cwd":"/tmp"}"#;
    let (stdout, _stderr, code) = run_cchh(home.path(), json, &[]);

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), json);
}

#[test]
fn test_invalid_json_fails() {
    let home = TempDir::new().unwrap();
    let (stdout, _stderr, code) = run_cchh(home.path(), "not valid json", &[]);

    assert_ne!(code, 0, "Invalid JSON should cause non-zero exit");
    assert_eq!(stdout.trim(), "{}");
}

#[test]
fn test_missing_event_name_fails() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cchh(home.path(), r#"{"session_id":"abc"}"#, &[]);

    assert_ne!(code, 0);
    assert_eq!(stdout.trim(), "{}");
    assert!(stderr.contains("hook_event_name"), "stderr: {stderr}");
}

#[test]
fn test_events_are_logged_in_order() {
    let home = TempDir::new().unwrap();
    for name in ["UserPromptSubmit", "PreToolUse", "Stop"] {
        let json = format!(r#"{{"hook_event_name":"{name}","session_id":"s1"}}"#);
        let (_stdout, _stderr, code) = run_cchh(home.path(), &json, &[]);
        assert_eq!(code, 0);
    }

    let entries = event_log(home.path());
    let names: Vec<&str> = entries
        .iter()
        .map(|e| e["hook_event_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["UserPromptSubmit", "PreToolUse", "Stop"]);
    assert_eq!(entries[0]["raw_input"]["session_id"], "s1");
}

#[test]
fn test_event_logging_can_be_disabled() {
    let home = TempDir::new().unwrap();
    let json = r#"{"hook_event_name":"Stop","session_id":"s1"}"#;
    let (_stdout, _stderr, code) =
        run_cchh(home.path(), json, &[("CCHH_EVENT_LOGGING_ENABLED", "false")]);

    assert_eq!(code, 0);
    assert!(!home.path().join("data/logs/events.jsonl").exists());
}

#[test]
fn test_test_environment_suppresses_slack() {
    let home = TempDir::new().unwrap();
    let json = r#"{"hook_event_name":"PreToolUse","session_id":"s1","tool_name":"Bash","tool_input":{"command":"git push"}}"#;
    let (_stdout, _stderr, code) = run_cchh(
        home.path(),
        json,
        &[
            ("CCHH_SLACK_BOT_TOKEN", "xoxb-test"),
            ("CCHH_SLACK_CHANNEL_ID", "C123"),
        ],
    );

    assert_eq!(code, 0);
    assert!(!home.path().join("data/sessions").exists());
    assert!(!home.path().join("data/slack_threads").exists());
    assert!(!home.path().join("data/errors.log").exists());
}

#[test]
fn test_unknown_event_noop() {
    let home = TempDir::new().unwrap();
    let json = r#"{"hook_event_name":"SubagentStop","session_id":"s1"}"#;
    let (stdout, _stderr, code) = run_cchh(home.path(), json, &[]);

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), json);
    assert_eq!(event_log(home.path()).len(), 1);
}

#[test]
fn test_echo_can_be_disabled() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config/cchh");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yaml"), "echo_input: false\n").unwrap();

    let (stdout, _stderr, code) =
        run_cchh(home.path(), r#"{"hook_event_name":"Stop"}"#, &[]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
}

#[test]
fn test_invalid_config_fails_but_echoes() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("broken.yaml");
    fs::write(&config_path, "slack: [not, a, map]\n").unwrap();

    let json = r#"{"hook_event_name":"Stop","session_id":"s1"}"#;
    let (stdout, _stderr, code) = run_cchh(
        home.path(),
        json,
        &[("CCHH_CONFIG", config_path.to_str().unwrap())],
    );

    assert_ne!(code, 0);
    assert_eq!(stdout.trim(), json);
    let errors = fs::read_to_string(home.path().join("data/errors.log")).unwrap();
    assert!(errors.contains("config_error"));
}

#[test]
fn test_mistyped_fields_still_logged() {
    let home = TempDir::new().unwrap();
    let json = r#"{"hook_event_name":"UserPromptSubmit","session_id":42,"prompt":["a"],"message":{"text":"x"}}"#;
    let (stdout, _stderr, code) = run_cchh(home.path(), json, &[]);

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), json);
    let entries = event_log(home.path());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["hook_event_name"], "UserPromptSubmit");
    assert_eq!(entries[0]["session_id"], "unknown");
    assert_eq!(entries[0]["raw_input"]["session_id"], 42);
}

#[test]
fn test_closed_stdout_does_not_crash() {
    let home = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_cchh"))
        .env_clear()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("CCHH_HOME", home.path().join("data"))
        .env("CCHH_TEST_ENVIRONMENT", "true")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn");

    // Reader goes away before the hook writes anything
    drop(child.stdout.take());
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(br#"{"hook_event_name":"Stop","session_id":"s1"}"#)
            .expect("failed to write");
    }

    let output = child.wait_with_output().expect("failed to wait");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(event_log(home.path()).len(), 1);
}
