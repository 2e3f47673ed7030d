//! Configuration management for StockScope services.
//!
//! The service reads a single JSON file, `~/.stockscope/config.json` by
//! default, or the path in `STOCKSCOPE_CONFIG`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (STOCKSCOPE_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `STOCKSCOPE_HOST` → server.host
//! - `STOCKSCOPE_PORT` → server.port
//! - `STOCKSCOPE_REPORT_DIR` → reports.directory
//! - `STOCKSCOPE_LOG_LEVEL` → observability.log_level
//! - `STOCKSCOPE_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "STOCKSCOPE_CONFIG";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".stockscope"),
        |dirs| dirs.home_dir().join(".stockscope"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("config.json"))
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Market data provider endpoints
    #[serde(default)]
    pub market: MarketConfig,

    /// Yearly performance report snapshots
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Symbol → display name table
    #[serde(default)]
    pub symbols: SymbolsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Where the active configuration was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at this path; built-in defaults
    Defaults(PathBuf),
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<(Self, ConfigSource)> {
        Self::load_or_default(&config_path())
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// Runs before the subscriber is installed, so the source is returned
    /// for the caller to log.
    pub fn load_or_default(path: &Path) -> Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(path.to_path_buf())));
        }

        let config = Self::load_from(path)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::load()?;
        config.apply_env_overrides();
        Ok((config, source))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Split out from [`Config::apply_env_overrides`] so the mapping can be
    /// exercised without touching the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("STOCKSCOPE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STOCKSCOPE_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid STOCKSCOPE_PORT"),
            }
        }
        if let Some(dir) = lookup("STOCKSCOPE_REPORT_DIR") {
            self.reports.directory = PathBuf::from(dir);
        }
        if let Some(level) = lookup("STOCKSCOPE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("STOCKSCOPE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Socket address string the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host. Default is `127.0.0.1` (local only).
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the browser front end (index.html, script.js, ...)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Origins allowed to call the API routes
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5000".into()]
}

// ============================================================================
// Market Data Configuration
// ============================================================================

/// Market data provider configuration (Eastmoney public quote API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Historical K-line endpoint
    #[serde(default = "default_kline_url")]
    pub kline_url: String,

    /// Single-stock snapshot endpoint
    #[serde(default = "default_profile_url")]
    pub profile_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent to the provider
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            kline_url: default_kline_url(),
            profile_url: default_profile_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_kline_url() -> String {
    "https://push2his.eastmoney.com/api/qt/stock/kline/get".into()
}
fn default_profile_url() -> String {
    "https://push2.eastmoney.com/api/qt/stock/get".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)".into()
}

// ============================================================================
// Reports Configuration
// ============================================================================

/// Location and naming of the yearly performance report CSV files.
///
/// Files are expected as `<directory>/<file_prefix>_<year>1231.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_report_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_report_prefix")]
    pub file_prefix: String,

    /// First fiscal year the per-stock report reader looks at
    #[serde(default = "default_first_year")]
    pub first_year: i32,

    /// Last fiscal year the per-stock report reader looks at (inclusive)
    #[serde(default = "default_last_year")]
    pub last_year: i32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_report_dir(),
            file_prefix: default_report_prefix(),
            first_year: default_first_year(),
            last_year: default_last_year(),
        }
    }
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("financial_reports")
}
fn default_report_prefix() -> String {
    "业绩报表".into()
}
fn default_first_year() -> i32 {
    2019
}
fn default_last_year() -> i32 {
    2024
}

// ============================================================================
// Symbols Configuration
// ============================================================================

/// Symbol directory source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsConfig {
    /// CSV file with `code,name` columns
    #[serde(default = "default_symbols_path")]
    pub path: PathBuf,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            path: default_symbols_path(),
        }
    }
}

fn default_symbols_path() -> PathBuf {
    PathBuf::from("stock_symbols.csv")
}

// ============================================================================
// Observability Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to hold at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.reports.file_prefix, "业绩报表");
        assert_eq!(config.reports.first_year, 2019);
        assert_eq!(config.reports.last_year, 2024);
        assert_eq!(config.market.timeout_secs, 30);
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "server": { "port": 8080 }, "reports": { "directory": "/data/reports" } }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.reports.directory, PathBuf::from("/data/reports"));
        assert_eq!(config.reports.file_prefix, "业绩报表");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_observability_aliases() {
        let config: Config =
            serde_json::from_str(r#"{ "observability": { "level": "debug", "format": "json" } }"#)
                .unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "symbols": { "path": "names.csv" } }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.symbols.path, PathBuf::from("names.csv"));
    }

    #[test]
    fn test_missing_file_reports_defaults_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let (config, source) = Config::load_or_default(&path).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(source, ConfigSource::Defaults(path.clone()));
    }

    #[test]
    fn test_existing_file_reports_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "server": { "port": 7000 } }"#).unwrap();

        let (config, source) = Config::load_or_default(&path).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCKSCOPE_HOST", "0.0.0.0"),
            ("STOCKSCOPE_PORT", "9000"),
            ("STOCKSCOPE_REPORT_DIR", "/srv/reports"),
            ("STOCKSCOPE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.reports.directory, PathBuf::from("/srv/reports"));
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "STOCKSCOPE_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 5000);
    }
}
