//! Configuration management for Findash services.
//!
//! Services read a single configuration file at `~/.findash/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (FINDASH_* prefix, plus `DATABASE_PATH`)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `FINDASH_BIND_ADDRESS` → network.bind
//! - `FINDASH_PORT` → network.port
//! - `FINDASH_LOG_LEVEL` → observability.log_level
//! - `FINDASH_LOG_FORMAT` → observability.log_format
//! - `DATABASE_PATH` → storage.database_path
//! - `FINDASH_PRELOAD_SNAPSHOT` → storage.preload_snapshot
//! - `FINDASH_REFERENCE_SYMBOL` → screener.reference_symbol

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".findash"),
        |dirs| dirs.home_dir().join(".findash"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// HTTP listener configuration.
///
/// Default is `127.0.0.1:8080` (local only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Set to "0.0.0.0" for remote access.
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout enforced by the HTTP layer
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Allow cross-origin requests from any origin (the dashboard front end
    /// is usually served from a different port)
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_allow_any: true,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to pin at `warn`.
    ///
    /// Built-in noisy modules (hyper, h2, tower_http, ...) are always
    /// filtered; this list allows adding custom modules.
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

// ============================================================================
// Storage Configuration
// ============================================================================

/// Bar store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding `stock_data_daily`
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Load the whole table into an in-memory indexed snapshot at startup
    /// and serve every request from it
    #[serde(default)]
    pub preload_snapshot: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            preload_snapshot: false,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("stockdb.sqlite")
}

// ============================================================================
// Screener Configuration
// ============================================================================

/// Screening behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Symbol whose latest bar date marks data freshness
    #[serde(default = "default_reference_symbol")]
    pub reference_symbol: String,

    /// Day count used by the price history endpoint when none is given
    #[serde(default = "default_history_days")]
    pub default_history_days: u32,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            reference_symbol: default_reference_symbol(),
            default_history_days: default_history_days(),
        }
    }
}

fn default_reference_symbol() -> String {
    "SPY".into()
}

fn default_history_days() -> u32 {
    90
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure for Findash services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// HTTP listener configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Bar store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Screening configuration
    #[serde(default)]
    pub screener: ScreenerConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable numeric or boolean values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("FINDASH_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("FINDASH_PORT") {
            if let Ok(p) = port.parse() {
                self.network.port = p;
            }
        }

        if let Some(level) = lookup("FINDASH_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("FINDASH_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(preload) = lookup("FINDASH_PRELOAD_SNAPSHOT") {
            if let Ok(p) = preload.parse() {
                self.storage.preload_snapshot = p;
            }
        }

        if let Some(symbol) = lookup("FINDASH_REFERENCE_SYMBOL") {
            self.screener.reference_symbol = symbol;
        }
    }

    /// Get the effective listen address as `host:port`.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.network.port, 8080);
        assert_eq!(config.listen_address(), "127.0.0.1:8080");
        assert_eq!(config.storage.database_path, PathBuf::from("stockdb.sqlite"));
        assert!(!config.storage.preload_snapshot);
        assert_eq!(config.screener.reference_symbol, "SPY");
        assert_eq!(config.screener.default_history_days, 90);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"network": {"port": 9000}, "observability": {"level": "debug"}}"#,
        )
        .unwrap();

        assert_eq!(config.network.port, 9000);
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
        assert_eq!(config.screener.reference_symbol, "SPY");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("FINDASH_PORT", "9090"),
            ("DATABASE_PATH", "/data/bars.sqlite"),
            ("FINDASH_REFERENCE_SYMBOL", "QQQ"),
            ("FINDASH_PRELOAD_SNAPSHOT", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network.port, 9090);
        assert_eq!(config.storage.database_path, PathBuf::from("/data/bars.sqlite"));
        assert_eq!(config.screener.reference_symbol, "QQQ");
        assert!(config.storage.preload_snapshot);
        // untouched
        assert_eq!(config.network.bind, "127.0.0.1");
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|key| match key {
            "FINDASH_PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert_eq!(config.network.port, 8080);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"screener": {"reference_symbol": "IWM"}, "storage": {"preload_snapshot": true}}"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.screener.reference_symbol, "IWM");
        assert!(loaded.storage.preload_snapshot);
        assert_eq!(loaded.network.port, 8080);
    }

    #[test]
    fn test_load_from_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
