//! Unit tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing TOML file does not prevent startup (defaults are used)
//! - Partial TOML files fill the remaining keys with defaults
//! - Priority order for locating the config file
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CWA_CONFIG are marked with #[serial].

use cwa_common::config::{
    load_or_default, load_toml_config, resolve_config_path, ConfigSource, StoreBackend,
    TomlConfig, CONFIG_PATH_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let (config, source) = load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::MissingFile(missing));
}

#[test]
fn test_no_path_yields_defaults() {
    let (config, source) = load_or_default(None).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
}

#[test]
fn test_partial_file_keeps_defaults_for_missing_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 9000

[sheets]
spreadsheet_id = "1AbCdEf"

[annotation]
batch_size = 3
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("1AbCdEf"));
    assert_eq!(config.sheets.allow_list_sheet, "allowed_users_Checkworthiness");
    assert_eq!(config.annotation.batch_size, 3);
    assert_eq!(config.corpus.root, PathBuf::from("data/clean"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_memory_backend_with_seed_users() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[sheets]
backend = "memory"

[memory]
allowed_users = ["anna", "bo"]
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.sheets.backend, StoreBackend::Memory);
    assert_eq!(config.memory.allowed_users, vec!["anna", "bo"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_toml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();

    assert!(load_or_default(Some(&path)).is_err());
}

#[test]
fn test_config_roundtrips_through_toml() {
    let mut config = TomlConfig::default();
    config.sheets.spreadsheet_id = Some("doc".to_string());
    config.memory.allowed_users = vec!["anna".to_string()];

    let text = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    env::set_var(CONFIG_PATH_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_PATH_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_PATH_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_PATH_ENV_VAR);
}
