//! Integration tests for the `ipmon` CLI binary.
//!
//! Argument parsing, help output and completions run without a server;
//! the status and config commands run against a wiremock backend.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `ipmon` binary with env isolation.
///
/// Clears all `IPMON_*` env vars and points the config and data
/// directories at `home`, so tests never touch the user's real
/// configuration or drafts.
fn ipmon_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ipmon");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("IPMON_PROFILE")
        .env_remove("IPMON_SERVER")
        .env_remove("IPMON_OUTPUT")
        .env_remove("IPMON_INSECURE")
        .env_remove("IPMON_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a command off the async runtime so wiremock keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn devices(n: usize) -> serde_json::Value {
    (1..=n)
        .map(|i| json!({ "descricao": format!("Impressora {i}"), "ip": format!("10.0.85.{i}"), "status": "on" }))
        .collect()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    ipmon_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("profile")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    ipmon_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ipmon"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    ipmon_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["-o", "xml", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_status_without_server_explains_setup() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(
        text.contains("No IP monitor server configured"),
        "unexpected output:\n{text}"
    );
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["--profile", "ghost", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_profile_init_then_show() {
    let home = TempDir::new().unwrap();
    ipmon_cmd(home.path())
        .args([
            "profile",
            "init",
            "--name",
            "lab",
            "--url",
            "http://10.0.0.5:5000",
            "--segment",
            "204",
        ])
        .assert()
        .success();

    ipmon_cmd(home.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("default_profile = \"lab\"")
                .and(predicate::str::contains("server = \"http://10.0.0.5:5000\""))
                .and(predicate::str::contains("default_segment = \"204\"")),
        );
}

#[test]
fn test_profile_init_rejects_bad_url() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["profile", "init", "--name", "x", "--url", "ftp://nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_renders_grid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/start-check/85"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices(4)))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "status"]);
    let output = run(cmd).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "status failed:\n{text}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Segment 85 · 4 device(s)"));
    assert!(stdout.contains("Impressora 4"));
    assert_eq!(stdout.matches("unreachable").count(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_for_named_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/start-check/204"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices(2)))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "-o", "json", "status", "204"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["segment"], "204");
    assert_eq!(body["devices"].as_array().unwrap().len(), 2);
    assert_eq!(body["devices"][1]["ip"], "10.0.85.2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_unscanned_segment_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/start-check/86"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "status", "86"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[test]
fn test_status_connection_refused() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["--server", "http://127.0.0.1:9", "--timeout", "5", "status"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "{}",
        combined_output(&output)
    );
}

// ── Config form ─────────────────────────────────────────────────────

#[test]
fn test_config_set_clamps_and_keeps_draft() {
    let home = TempDir::new().unwrap();
    let server = ["--server", "http://127.0.0.1:9"];

    ipmon_cmd(home.path())
        .args(server)
        .args(["config", "set", "network_settings.ping_timeout=50"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Value adjusted to the maximum allowed: 10",
        ));

    ipmon_cmd(home.path())
        .args(server)
        .args(["-o", "plain", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("network_settings.ping_timeout=10"));

    ipmon_cmd(home.path())
        .args(server)
        .args(["config", "draft", "clear"])
        .assert()
        .success();

    ipmon_cmd(home.path())
        .args(server)
        .args(["-o", "plain", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("network_settings.ping_timeout=2"));
}

#[test]
fn test_config_set_rejects_bad_input() {
    let home = TempDir::new().unwrap();
    let server = ["--server", "http://127.0.0.1:9"];

    let output = ipmon_cmd(home.path())
        .args(server)
        .args(["config", "set", "system_info.admin_contact=not-an-email"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Please enter an email address."));

    let output = ipmon_cmd(home.path())
        .args(server)
        .args(["config", "set", "nope.field=1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_config_set_disabled_field_refused() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["--server", "http://127.0.0.1:9", "config", "set"])
        .args(["ui_settings.auto_refresh=false", "ui_settings.refresh_rate=30"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("disabled"));
}

#[test]
fn test_config_export_writes_dated_file() {
    let home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    ipmon_cmd(home.path())
        .args(["--server", "http://127.0.0.1:9", "config", "export", "--dir"])
        .arg(out_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ipmonitor_config_"));

    let files: Vec<_> = std::fs::read_dir(out_dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_config_import_garbage_fails() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("broken.json");
    std::fs::write(&file, "{ not json").unwrap();

    let output = ipmon_cmd(home.path())
        .args(["--server", "http://127.0.0.1:9", "config", "import"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[test]
fn test_config_reset_needs_yes_off_terminal() {
    let home = TempDir::new().unwrap();
    let output = ipmon_cmd(home.path())
        .args(["--server", "http://127.0.0.1:9", "config", "reset"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

// ── Config against the backend ──────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_config_save_sends_draft_values() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .and(body_partial_json(json!({
            "ui_settings": { "theme": "dark", "auto_refresh": true }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "message": "ok" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut set = ipmon_cmd(home.path());
    set.args(["--server", &server.uri(), "config", "set", "ui_settings.theme=dark"]);
    assert!(run(set).await.status.success());

    let mut save = ipmon_cmd(home.path());
    save.args(["--server", &server.uri(), "config", "save"]);
    let output = run(save).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "save failed:\n{text}");
    assert!(text.contains("Configuration saved successfully!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_save_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "disk full" })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "config", "save"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Failed to save: disk full"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_test_prints_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Configuração válida",
            "details": { "ping_tests": 6, "network_connectivity": true, "config_validity": false }
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "-o", "plain", "config", "test"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ping tests\t6"));
    assert!(stdout.contains("Network connectivity\tyes"));
    assert!(stdout.contains("Config validity\tno"));
    assert!(combined_output(&output).contains("Test complete: Configuração válida"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_reset_with_yes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = ipmon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "--yes", "config", "reset"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Configuration restored to default values!"));
}
