//! Binary-level tests for argument handling, exit codes and error envelopes
//!
//! None of these reach a real AWS endpoint.

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

/// A command with no ambient AWS configuration
fn secman() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("secman").unwrap();
    cmd.env_remove("AWS_REGION")
        .env_remove("AWS_DEFAULT_REGION")
        .env_remove("AWS_PROFILE")
        .env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_SESSION_TOKEN")
        .env_remove("SECMAN_ENDPOINT_URL")
        .env_remove("SECMAN_TIMEOUT")
        .env_remove("SECMAN_MAX_ATTEMPTS")
        .env_remove("RUST_LOG")
        .env("AWS_CONFIG_FILE", "/nonexistent/secman/config")
        .env("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/secman/credentials")
        .env("AWS_EC2_METADATA_DISABLED", "true");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    secman()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("list"))
                .and(predicate::str::contains("update-value"))
                .and(predicate::str::contains("update-tags"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn test_invalid_json_is_usage_error() {
    secman()
        .args(["create", "--name", "x", "--data", "{not json", "--region", "us-east-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn test_bad_recovery_window_is_usage_error() {
    secman()
        .args(["delete", "--name", "x", "--recovery-window-days", "3"])
        .assert()
        .code(2);
}

#[test]
fn test_update_tags_without_tags_is_usage_error() {
    secman()
        .args(["update-tags", "--name", "x"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_region_reports_configuration() {
    secman()
        .args(["--json", "get", "--name", "db-creds"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(r#""code":"configuration""#))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_region_text_mode() {
    secman()
        .args(["list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("region"));
}

#[test]
fn test_invalid_endpoint_is_configuration_error() {
    secman()
        .args([
            "--json",
            "--region",
            "us-east-1",
            "--endpoint-url",
            "localhost:4566",
            "list",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(r#""code":"configuration""#));
}

#[test]
fn test_unreachable_endpoint_is_operation_failure() {
    secman()
        .env("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")
        .env("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .args([
            "--json",
            "--region",
            "us-east-1",
            "--endpoint-url",
            "http://127.0.0.1:1",
            "--max-attempts",
            "1",
            "--timeout",
            "20",
            "get",
            "--name",
            "db-creds",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains(r#""status":"error""#));
}

#[test]
fn test_completions() {
    secman()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("secman"));
}

#[test]
fn test_no_subcommand_is_usage_error() {
    secman().assert().code(2);
}

#[test]
fn test_command_events_carry_root_span() {
    secman()
        .args(["--log-format", "json", "--level", "debug", "list"])
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("Dispatching command")
                .and(predicate::str::contains(r#"{"name":"secman"}"#)),
        );
}
