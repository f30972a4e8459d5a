//! Integration tests for the `sensilink` CLI binary.
//!
//! Argument parsing, completions, and error exit codes run without any
//! network. The end-to-end cases drive the binary against a mock hub.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sensilink` binary with env isolation.
///
/// Clears all `SENSILINK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn sensilink_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sensilink");
    cmd.env("HOME", "/tmp/sensilink-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/sensilink-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/sensilink-cli-test-nonexistent")
        .env(
            "SENSILINK_CONFIG",
            "/tmp/sensilink-cli-test-nonexistent/config.toml",
        )
        .env_remove("SENSILINK_PROFILE")
        .env_remove("SENSILINK_BASE_URL")
        .env_remove("SENSILINK_USERNAME")
        .env_remove("SENSILINK_PASSWORD")
        .env_remove("SENSILINK_DEVICE")
        .env_remove("SENSILINK_POLICY")
        .env_remove("SENSILINK_STORE_DIR")
        .env_remove("SENSILINK_OUTPUT")
        .env_remove("SENSILINK_LOG_JSON")
        .env_remove("SENSILINK_INSECURE")
        .env_remove("SENSILINK_TIMEOUT")
        .env_remove("SENSILINK_POLL_TIMEOUT")
        .env_remove("SENSILINK_TOPIC_URL")
        .env_remove("SENSILINK_BATCH_URL");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn sample_event(id: &str, mode: &str) -> String {
    json!({
        "id": id,
        "deviceId": "dev-1",
        "deviceStatus": { "Temperature": { "F": 71 }, "Humidity": 40, "Mode": mode },
        "sourceEventId": "tick-1",
        "sourceEventTime": "2026-01-05T12:00:00Z"
    })
    .to_string()
}

fn ingest(store: &Path, message: &str) {
    sensilink_cmd()
        .arg("--store-dir")
        .arg(store)
        .arg("ingest")
        .write_stdin(message.to_owned())
        .assert()
        .success()
        .stderr(predicate::str::contains("stored"));
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sensilink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    sensilink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Sensi")
            .and(predicate::str::contains("poll"))
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("relay")),
    );
}

#[test]
fn test_version_flag() {
    sensilink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sensilink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    sensilink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    sensilink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_policy_is_rejected_by_parser() {
    let output = sensilink_cmd()
        .args(["--policy", "sticky", "poll"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_poll_without_config() {
    sensilink_cmd()
        .arg("poll")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config").or(predicate::str::contains("Configuration")));
}

#[test]
fn test_poll_without_password_exits_auth() {
    let output = sensilink_cmd()
        .args(["--username", "me@example.com", "--device", "dev-1", "poll"])
        .output()
        .unwrap();
    // Keyring lookups fail closed in the test environment.
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let output = sensilink_cmd()
        .args(["--profile", "nope", "records"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nope"));
}

#[test]
fn test_config_show_no_config() {
    sensilink_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path_honours_override() {
    sensilink_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sensilink-cli-test-nonexistent/config.toml"));
}

#[test]
fn test_config_set_then_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    sensilink_cmd()
        .env("SENSILINK_CONFIG", &config)
        .args(["config", "set", "policy", "cached"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&config).unwrap();
    assert!(written.contains("policy = \"cached\""), "{written}");

    sensilink_cmd()
        .env("SENSILINK_CONFIG", &config)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let output = sensilink_cmd()
        .env("SENSILINK_CONFIG", dir.path().join("config.toml"))
        .args(["config", "set", "colour", "red"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Record store ────────────────────────────────────────────────────

#[test]
fn test_ingest_rejects_empty_message() {
    let store = tempfile::tempdir().unwrap();
    sensilink_cmd()
        .arg("--store-dir")
        .arg(store.path())
        .arg("ingest")
        .write_stdin("   \n")
        .assert()
        .failure();
}

#[test]
fn test_ingest_then_list_records() {
    let store = tempfile::tempdir().unwrap();
    ingest(store.path(), &sample_event("0b6e2f5c-1d1a-4c58-9d0a-6f1f3f0a9e01", "Heat"));

    sensilink_cmd()
        .arg("--store-dir")
        .arg(store.path())
        .args(["--output", "plain", "records"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0b6e2f5c-1d1a-4c58-9d0a-6f1f3f0a9e01"));
}

#[test]
fn test_relay_to_stdout_projects_records() {
    let store = tempfile::tempdir().unwrap();
    ingest(store.path(), &sample_event("0b6e2f5c-1d1a-4c58-9d0a-6f1f3f0a9e01", "Cool"));

    let output = sensilink_cmd()
        .arg("--store-dir")
        .arg(store.path())
        .args(["--output", "json", "relay"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch[0]["Id"], "0b6e2f5c-1d1a-4c58-9d0a-6f1f3f0a9e01");
    assert_eq!(batch[0]["Temperature"], 71);
    assert_eq!(batch[0]["Humidity"], 40);
    assert_eq!(batch[0]["Status"], "Cool");
}

#[test]
fn test_relay_empty_store_prints_nothing() {
    let store = tempfile::tempdir().unwrap();
    sensilink_cmd()
        .arg("--store-dir")
        .arg(store.path())
        .args(["--output", "json", "relay"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ── End to end against a mock hub ───────────────────────────────────

async fn mount_hub(server: &MockServer, poll_body: Value) {
    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", ".ASPXAUTH=abc; path=/; HttpOnly")
                .set_body_json(json!({})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ConnectionToken": "t1" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "C": "cur-1", "M": [] })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/realtime/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "I": "0" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poll_body))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/realtime/abort"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

fn poll_cmd(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = sensilink_cmd();
    cmd.env("SENSILINK_PASSWORD", "hunter2").args([
        "--base-url",
        &server.uri(),
        "--username",
        "me@example.com",
        "--device",
        "dev-1",
    ]);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_poll_prints_status_event() {
    let server = MockServer::start().await;
    mount_hub(
        &server,
        json!({ "M": [{ "A": ["dev-1", { "OperationalStatus": { "Mode": "Heat" } }] }] }),
    )
    .await;

    let mut cmd = poll_cmd(&server);
    cmd.args(["--output", "json", "poll"]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let event: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(event["deviceId"], "dev-1");
    assert_eq!(event["deviceStatus"]["Mode"], "Heat");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_poll_with_no_status_exits_no_data() {
    let server = MockServer::start().await;
    mount_hub(&server, json!({ "M": [] })).await;

    let mut cmd = poll_cmd(&server);
    cmd.arg("poll");
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}
