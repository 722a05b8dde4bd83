//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `OBSERVIO_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::ClickHouseConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ApiConfig,

    #[serde(default)]
    pub clickhouse: ClickHouseConfig,

    #[serde(default)]
    pub explore: ExploreConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Server-wide request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Query builder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExploreConfig {
    /// Rows returned when a request leaves `limit` at 0
    #[serde(default = "default_explore_limit")]
    pub default_limit: u32,

    /// Largest `limit` a request may ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Check referenced columns against `system.columns` before running
    #[serde(default = "default_validate_identifiers")]
    pub validate_identifiers: bool,
}

fn default_explore_limit() -> u32 {
    crate::explore::builder::DEFAULT_LIMIT
}

fn default_max_limit() -> u32 {
    crate::explore::builder::MAX_LIMIT
}

fn default_validate_identifiers() -> bool {
    true
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            default_limit: default_explore_limit(),
            max_limit: default_max_limit(),
            validate_identifiers: default_validate_identifiers(),
        }
    }
}

/// Log search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_logs_table")]
    pub table: String,

    /// Database holding the table; the connection default when unset
    #[serde(default)]
    pub database: Option<String>,
}

fn default_logs_table() -> String {
    "otel_logs".to_string()
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            table: default_logs_table(),
            database: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate().map_err(|error| ConfigError::Invalid {
            path: path.to_path_buf(),
            error,
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("observio").join("config.toml")),
            Some(PathBuf::from("/etc/observio/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn validate(&self) -> Result<(), String> {
        if self.server.request_timeout_secs == 0 {
            return Err("server.request_timeout_secs must be greater than 0".to_string());
        }
        if self.explore.max_limit == 0 {
            return Err("explore.max_limit must be greater than 0".to_string());
        }
        if self.explore.default_limit == 0 || self.explore.default_limit > self.explore.max_limit {
            return Err(format!(
                "explore.default_limit must be between 1 and {}",
                self.explore.max_limit
            ));
        }
        if self.logs.table.is_empty() {
            return Err("logs.table must not be empty".to_string());
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("OBSERVIO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("OBSERVIO_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // ClickHouse overrides
        if let Some(url) = var("OBSERVIO_CLICKHOUSE_URL") {
            self.clickhouse.url = url;
        }
        if let Some(user) = var("OBSERVIO_CLICKHOUSE_USER") {
            self.clickhouse.username = user;
        }
        if let Some(password) = var("OBSERVIO_CLICKHOUSE_PASSWORD") {
            self.clickhouse.password = password;
        }
        if let Some(database) = var("OBSERVIO_CLICKHOUSE_DATABASE") {
            self.clickhouse.database = database;
        }

        // Logging overrides
        if let Some(level) = var("OBSERVIO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("OBSERVIO_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config file {path:?}: {error}")]
    Invalid { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# ObservIO Configuration
#
# Environment variables override these settings:
# - OBSERVIO_HOST
# - OBSERVIO_PORT
# - OBSERVIO_CLICKHOUSE_URL
# - OBSERVIO_CLICKHOUSE_USER
# - OBSERVIO_CLICKHOUSE_PASSWORD
# - OBSERVIO_CLICKHOUSE_DATABASE
# - OBSERVIO_LOG_LEVEL
# - OBSERVIO_LOG_FORMAT

[server]
# Host to bind to
host = "0.0.0.0"

# Port to listen on
port = 8080

# Allowed CORS origins (empty allows any origin)
cors_origins = []

# Requests running longer than this are aborted (seconds)
request_timeout_secs = 30

[clickhouse]
# HTTP interface of the ClickHouse server
url = "http://localhost:8123"

username = "default"
password = ""

# Database for statements that do not name one
database = "default"

# Connect timeout (seconds)
connect_timeout_secs = 5

# Ask the server to refuse writes
readonly = true

[explore]
# Rows returned when a query does not set a limit
default_limit = 1000

# Largest limit a query may request
max_limit = 10000

# Check column names against the table schema before running a query
validate_identifiers = true

[logs]
# OpenTelemetry logs table searched by /api/v1/logs
table = "otel_logs"

# Database of the logs table (defaults to clickhouse.database)
# database = "otel"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty, json
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.clickhouse.url, "http://localhost:8123");
        assert_eq!(config.explore.default_limit, 1000);
        assert_eq!(config.explore.max_limit, 10000);
        assert!(config.explore.validate_identifiers);
        assert_eq!(config.logs.table, "otel_logs");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.clickhouse.database, "default");
        assert!(config.clickhouse.readonly);
        assert_eq!(config.logs.database, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[clickhouse]\nurl = \"http://ch:8123\"\n\n[explore]\ndefault_limit = 50\n\n[logs]\ndatabase = \"otel\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.clickhouse.url, "http://ch:8123");
        assert_eq!(config.clickhouse.username, "default");
        assert_eq!(config.explore.default_limit, 50);
        assert_eq!(config.explore.max_limit, 10000);
        assert_eq!(config.logs.database.as_deref(), Some("otel"));
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/observio.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a port\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[explore]\ndefault_limit = 20000").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nrequest_timeout_secs = 0").unwrap();
        match Config::load(file.path()).unwrap_err() {
            ConfigError::Invalid { error, .. } => {
                assert_eq!(error, "server.request_timeout_secs must be greater than 0")
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OBSERVIO_HOST", "127.0.0.1"),
            ("OBSERVIO_PORT", "9000"),
            ("OBSERVIO_CLICKHOUSE_URL", "http://clickhouse:8123"),
            ("OBSERVIO_CLICKHOUSE_USER", "reader"),
            ("OBSERVIO_CLICKHOUSE_PASSWORD", "secret"),
            ("OBSERVIO_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.addr(), "127.0.0.1:9000");
        assert_eq!(config.clickhouse.url, "http://clickhouse:8123");
        assert_eq!(config.clickhouse.username, "reader");
        assert_eq!(config.clickhouse.password, "secret");
        assert_eq!(config.clickhouse.database, "default");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "OBSERVIO_PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 8080);
    }
}
