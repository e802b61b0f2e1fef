//! Bootstrap configuration loading
//!
//! Settings are resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment overrides are applied by the service binary;
//! this module locates and parses the TOML file and supplies the defaults.
//! A missing config file is not an error: the service starts on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV_VAR: &str = "CWA_CONFIG";

/// Environment variable holding the Sheets API access token
pub const ACCESS_TOKEN_ENV_VAR: &str = "CWA_SHEETS_ACCESS_TOKEN";

/// Environment variable naming a service-account JSON key file
pub const SERVICE_ACCOUNT_KEY_ENV_VAR: &str = "CWA_SHEETS_SERVICE_ACCOUNT_KEY";

/// Default name of the allow-list worksheet
pub const DEFAULT_ALLOW_LIST_SHEET: &str = "allowed_users_Checkworthiness";

/// Default per-user corpus file name
pub const DEFAULT_CORPUS_FILE: &str = "processed_texts_test_check_worthy.txt";

/// Default number of buffered annotations that triggers a background save
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Which spreadsheet backend the service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Google Sheets REST v4
    #[default]
    Google,
    /// In-process store, seeded from `[memory]` (local runs only; nothing persists)
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(StoreBackend::Google),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!(
                "unknown store backend '{}' (expected 'google' or 'memory')",
                other
            ))),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Spreadsheet store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Google Sheets document id
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Service-account JSON key; tokens are refreshed automatically
    #[serde(default)]
    pub service_account_key: Option<PathBuf>,
    /// Fixed OAuth2 bearer token, used only without a service-account key.
    /// Expires after about an hour.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_allow_list_sheet")]
    pub allow_list_sheet: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            spreadsheet_id: None,
            service_account_key: None,
            access_token: None,
            api_base_url: default_api_base_url(),
            allow_list_sheet: default_allow_list_sheet(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Local corpus layout: `<root>/<user_id>/<file_name>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,
    #[serde(default = "default_corpus_file")]
    pub file_name: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            file_name: default_corpus_file(),
        }
    }
}

/// Annotation workflow settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sessions untouched for this long are swept (buffer flushed first)
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            session_idle_minutes: default_session_idle_minutes(),
        }
    }
}

/// Seed data for the in-memory backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent keys take compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub memory: MemoryStoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_allow_list_sheet() -> String {
    DEFAULT_ALLOW_LIST_SHEET.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("data").join("clean")
}

fn default_corpus_file() -> String {
    DEFAULT_CORPUS_FILE.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_session_idle_minutes() -> u64 {
    12 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Check settings that would otherwise fail later at request time
    pub fn validate(&self) -> Result<()> {
        if self.annotation.batch_size == 0 {
            return Err(Error::Config("annotation.batch_size must be at least 1".to_string()));
        }
        if self.annotation.session_idle_minutes == 0 {
            return Err(Error::Config(
                "annotation.session_idle_minutes must be at least 1".to_string(),
            ));
        }
        if self.sheets.allow_list_sheet.trim().is_empty() {
            return Err(Error::Config("sheets.allow_list_sheet must not be empty".to_string()));
        }
        if self.corpus.file_name.trim().is_empty() {
            return Err(Error::Config("corpus.file_name must not be empty".to_string()));
        }
        if self.sheets.backend == StoreBackend::Google {
            let id_ok = self
                .sheets
                .spreadsheet_id
                .as_deref()
                .is_some_and(is_valid_key);
            if !id_ok {
                return Err(Error::Config(
                    "sheets.spreadsheet_id is required for the google backend".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Non-empty, non-whitespace secret or identifier
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Platform config file location: `<config_dir>/checkworthy/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("checkworthy").join("config.toml"))
}

/// Locate the config file: CLI argument, then `CWA_CONFIG`, then the platform default
///
/// The platform default is only returned if the file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
        if is_valid_key(&path) {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was requested but does not exist; defaults in use
    MissingFile(PathBuf),
    /// No file requested or found; defaults in use
    Defaults,
}

/// Load the config file if there is one, otherwise fall back to defaults
///
/// A missing file yields defaults; a file that exists but cannot be read or
/// parsed is an error. Nothing is logged here because this runs before the
/// tracing subscriber is installed; callers log the returned source.
pub fn load_or_default(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            Ok((config, ConfigSource::File(path.to_path_buf())))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigSource::MissingFile(path.to_path_buf()))),
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}

/// Resolve the service-account key path
///
/// **Priority:** CLI/ENV (clap merges both) → TOML
pub fn resolve_service_account_key(
    cli_or_env: Option<&Path>,
    sheets: &SheetsConfig,
) -> Option<PathBuf> {
    let usable = |path: &&Path| !path.as_os_str().is_empty();
    match cli_or_env.filter(usable) {
        Some(path) => {
            info!("Service account key path from environment/CLI: {}", path.display());
            Some(path.to_path_buf())
        }
        None => sheets
            .service_account_key
            .as_deref()
            .filter(usable)
            .map(Path::to_path_buf),
    }
}

/// Resolve the Sheets access token
///
/// **Priority:** CLI/ENV (clap merges both) → TOML
pub fn resolve_access_token(cli_or_env: Option<&str>, sheets: &SheetsConfig) -> Option<String> {
    let toml_token = sheets.access_token.as_deref().filter(|t| is_valid_key(t));

    match cli_or_env.filter(|t| is_valid_key(t)) {
        Some(token) => {
            if toml_token.is_some() {
                warn!("Sheets access token found in both environment/CLI and TOML; using environment/CLI");
            }
            info!("Sheets access token loaded from environment/CLI");
            Some(token.trim().to_string())
        }
        None => toml_token.map(|token| {
            info!("Sheets access token loaded from TOML config");
            token.trim().to_string()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployed_layout() {
        let config = TomlConfig::default();
        assert_eq!(config.sheets.allow_list_sheet, "allowed_users_Checkworthiness");
        assert_eq!(config.corpus.root, PathBuf::from("data/clean"));
        assert_eq!(config.corpus.file_name, "processed_texts_test_check_worthy.txt");
        assert_eq!(config.annotation.batch_size, 5);
        assert_eq!(config.sheets.backend, StoreBackend::Google);
    }

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(" Google ".parse::<StoreBackend>().unwrap(), StoreBackend::Google);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_validate_requires_spreadsheet_id_for_google() {
        let mut config = TomlConfig::default();
        assert!(config.validate().is_err());

        config.sheets.spreadsheet_id = Some("abc".to_string());
        assert!(config.validate().is_ok());

        config.sheets.backend = StoreBackend::Memory;
        config.sheets.spreadsheet_id = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = TomlConfig::default();
        config.sheets.backend = StoreBackend::Memory;
        config.annotation.batch_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_access_token_priority() {
        let mut sheets = SheetsConfig::default();
        assert_eq!(resolve_access_token(None, &sheets), None);

        sheets.access_token = Some("from-toml".to_string());
        assert_eq!(resolve_access_token(None, &sheets).as_deref(), Some("from-toml"));
        assert_eq!(
            resolve_access_token(Some("from-env"), &sheets).as_deref(),
            Some("from-env")
        );
        assert_eq!(resolve_access_token(Some("   "), &sheets).as_deref(), Some("from-toml"));
    }

    #[test]
    fn test_resolve_service_account_key_priority() {
        let mut sheets = SheetsConfig::default();
        assert_eq!(resolve_service_account_key(None, &sheets), None);

        sheets.service_account_key = Some(PathBuf::from("/etc/cwa/key.json"));
        assert_eq!(
            resolve_service_account_key(None, &sheets),
            Some(PathBuf::from("/etc/cwa/key.json"))
        );
        assert_eq!(
            resolve_service_account_key(Some(Path::new("/run/key.json")), &sheets),
            Some(PathBuf::from("/run/key.json"))
        );
        assert_eq!(
            resolve_service_account_key(Some(Path::new("")), &sheets),
            Some(PathBuf::from("/etc/cwa/key.json"))
        );
    }

    #[test]
    fn test_service_account_key_parses_from_toml() {
        let config: TomlConfig = toml::from_str(
            r#"
            [sheets]
            spreadsheet_id = "doc"
            service_account_key = "/etc/cwa/key.json"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.sheets.service_account_key,
            Some(PathBuf::from("/etc/cwa/key.json"))
        );
        assert_eq!(config.sheets.access_token, None);
    }
}
