//! CLI integration tests for the Tome command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Config commands work against an isolated config directory
//!
//! Note: These tests do not require kiwix-serve or Ollama.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the tome binary with an isolated config directory.
fn tome(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tome").unwrap();
    cmd.env("TOME_CONFIG_DIR", config_dir.path())
        .env_remove("TOME_CONFIG")
        .env_remove("TOME_KIWIX_URL")
        .env_remove("TOME_OLLAMA_URL")
        .current_dir(config_dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tome"))
        .stdout(predicate::str::contains("offline encyclopedia"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tome"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_ask_help_shows_options() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--selection-model"))
        .stdout(predicate::str::contains("--max-results"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_ask_requires_question() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .arg("ask")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_max_results_must_be_positive() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["ask", "--max-results", "0", "What is photosynthesis?"])
        .assert()
        .failure();
}

#[test]
fn test_batch_requires_input() {
    let dir = TempDir::new().unwrap();
    tome(&dir).arg("batch").assert().failure();
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    tome(&dir).arg("summon").assert().failure();
}

#[test]
fn test_global_flags_accepted() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args([
            "--verbose",
            "--json",
            "--no-auto-start",
            "--kiwix-url",
            "http://localhost:9999",
            "--ollama-url",
            "http://localhost:9998",
            "--help",
        ])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(dir.path().to_string_lossy().as_ref()));
}

#[test]
fn test_config_show_defaults() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config files loaded"))
        .stdout(predicate::str::contains("[kiwix]"))
        .stdout(predicate::str::contains("http://localhost:8080"));
}

#[test]
fn test_config_show_applies_cli_override() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["--ollama-url", "http://gpu-box:11434", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://gpu-box:11434"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(dir.path().join("config.toml").is_file());

    tome(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    tome(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config files"));
}

#[test]
fn test_config_show_json() {
    let dir = TempDir::new().unwrap();
    let output = tome(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["synthesis"]["max_tokens"], 1500);
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = TempDir::new().unwrap();
    tome(&dir)
        .args(["--config", "does-not-exist.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.toml"));
}
