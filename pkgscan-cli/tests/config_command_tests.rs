//! Integration tests for `pkgscan config` command.
//!
//! Tests config validation and display functionality with real TOML files.

use std::fs;

use tempfile::TempDir;

use pkgscan_cli::cli::{ConfigAction, ConfigArgs, OutputFormat};
use pkgscan_cli::commands::config;
use pkgscan_cli::error::CliError;
use pkgscan_cli::output::OutputWriter;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write config");
    path
}

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(
        &temp_dir,
        "pkgscan.toml",
        r#"
[general]
log_level = "info"
log_format = "json"

[server]
port = "8005"
concurrency = 3

[console]
url = "console.example.com"
access_key = "abc"
"#,
    );

    // When: Validating the config
    let result = config::execute(
        ConfigArgs {
            action: ConfigAction::Validate,
        },
        &config_path,
        &OutputWriter::new(OutputFormat::Json),
    )
    .await;

    // Then: Should succeed
    assert!(result.is_ok(), "valid config should validate: {result:?}");
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    // Given: A malformed TOML file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "bad.toml", "[general\nlog_level = \"info\"\n");

    // When: Validating the config
    let err = config::execute(
        ConfigArgs {
            action: ConfigAction::Validate,
        },
        &config_path,
        &OutputWriter::new(OutputFormat::Json),
    )
    .await
    .unwrap_err();

    // Then: Should fail with a configuration exit code
    assert!(matches!(err, CliError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_config_validate_mutually_exclusive_listeners() {
    // Given: Both a port and a socket path
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(
        &temp_dir,
        "pkgscan.toml",
        r#"
[server]
port = "8005"
socket_path = "/tmp/pkgscan.sock"
"#,
    );

    // When: Validating the config
    let result = config::execute(
        ConfigArgs {
            action: ConfigAction::Validate,
        },
        &config_path,
        &OutputWriter::new(OutputFormat::Json),
    )
    .await;

    // Then: Should be rejected
    assert!(result.is_err(), "port and socket_path together must be rejected");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("absent.toml");

    let err = config::execute(
        ConfigArgs {
            action: ConfigAction::Validate,
        },
        &missing,
        &OutputWriter::new(OutputFormat::Json),
    )
    .await
    .unwrap_err();

    assert_eq!(err.exit_code(), 2, "missing file is a configuration error");
}

#[tokio::test]
async fn test_config_show_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("absent.toml");

    let result = config::execute(
        ConfigArgs {
            action: ConfigAction::Show { section: None },
        },
        &missing,
        &OutputWriter::new(OutputFormat::Json),
    )
    .await;

    assert!(result.is_ok(), "show falls back to defaults: {result:?}");
}

#[tokio::test]
async fn test_config_show_unknown_section() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "pkgscan.toml", "[general]\nlog_level = \"debug\"\n");

    let err = config::execute(
        ConfigArgs {
            action: ConfigAction::Show {
                section: Some("storage".to_owned()),
            },
        },
        &config_path,
        &OutputWriter::new(OutputFormat::Text),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::Command(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_config_show_redacts_access_key() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(
        &temp_dir,
        "pkgscan.toml",
        "[console]\nurl = \"console.example.com\"\naccess_key = \"top-secret\"\n",
    );

    let mut loaded = pkgscan_core::PkgscanConfig::load(&config_path)
        .await
        .expect("should load");
    config::redact_credentials(&mut loaded);
    let toml = config::section_toml(&loaded, Some("console")).expect("console section");

    assert!(!toml.contains("top-secret"), "access key must not be shown");
    assert!(toml.contains(config::REDACTED));
}
