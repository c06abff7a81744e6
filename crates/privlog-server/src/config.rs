//! Server configuration loading from file and environment variables.
//!
//! The [`Config`] value is built once in `main` and handed to each component;
//! nothing reads the environment after startup.

use privlog_events::TimeRangeMode;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API key settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Health report settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Query behavior.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `DEBUG`, `INFO`, `WARNING`, or an `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output console logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Directory for the daily rolling log files and the health probe file.
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    /// Number of daily log files to keep.
    #[serde(default = "default_retention_days")]
    pub retention_days: usize,
}

/// API key configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Newline separated `key:identity` pairs.
    #[serde(default)]
    pub api_keys: String,

    /// Whether `POST /privileges` requires an API key as well.
    #[serde(default)]
    pub require_key_for_ingest: bool,
}

/// Health report configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Whether `/health` includes `disk_free_gb`.
    #[serde(default)]
    pub report_disk_space: bool,

    /// Free space below this many GiB reports `disk_space: low`.
    #[serde(default = "default_min_free_disk_gb")]
    pub min_free_disk_gb: f64,
}

/// Query configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryConfig {
    /// Comparison used by `/get-event-by-time`.
    #[serde(default)]
    pub time_range_mode: TimeRangeMode,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "Data/data.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("Logs")
}

fn default_retention_days() -> usize {
    7
}

fn default_min_free_disk_gb() -> f64 {
    1.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: default_log_dir(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            report_disk_space: false,
            min_free_disk_gb: default_min_free_disk_gb(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override holds a value that cannot be used.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The environment variable name.
        key: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if an override is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`], with environment lookups read through `env`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env<F>(path: Option<&str>, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

/// Applies environment overrides read through `env`.
///
/// - `PRIVLOG_HOST`, `PRIVLOG_PORT` override `server.*`
/// - `PRIVLOG_DB_PATH` overrides `database.path`
/// - `LOG_LEVEL` overrides `logging.level`
/// - `PRIVLOG_LOG_JSON` overrides `logging.json`
/// - `PRIVLOG_LOG_DIR` overrides `logging.directory`
/// - `LOGFILE_RETENTION_DAYS` overrides `logging.retention_days`
/// - `API_KEYS` overrides `auth.api_keys`
/// - `PRIVLOG_REQUIRE_INGEST_KEY` overrides `auth.require_key_for_ingest`
/// - `HEALTH_OUTPUT_DISKSPACE` overrides `health.report_disk_space`
/// - `PRIVLOG_TIME_RANGE_MODE` overrides `query.time_range_mode`
///
/// Unparseable numbers and addresses are ignored, keeping the previous value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for an unknown time range mode.
pub fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(parsed) = env("PRIVLOG_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = env("PRIVLOG_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db_path) = env("PRIVLOG_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = env("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("PRIVLOG_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }
    if let Some(dir) = env("PRIVLOG_LOG_DIR") {
        config.logging.directory = PathBuf::from(dir);
    }
    if let Some(parsed) = env("LOGFILE_RETENTION_DAYS").and_then(|v| v.trim().parse().ok()) {
        config.logging.retention_days = parsed;
    }
    if let Some(keys) = env("API_KEYS") {
        config.auth.api_keys = keys;
    }
    if let Some(required) = env("PRIVLOG_REQUIRE_INGEST_KEY") {
        config.auth.require_key_for_ingest = is_truthy(&required);
    }
    if let Some(report) = env("HEALTH_OUTPUT_DISKSPACE") {
        config.health.report_disk_space = is_truthy(&report);
    }
    if let Some(mode) = env("PRIVLOG_TIME_RANGE_MODE") {
        config.query.time_range_mode =
            mode.parse().map_err(|e: privlog_events::ParseTimeRangeModeError| {
                ConfigError::InvalidValue {
                    key: "PRIVLOG_TIME_RANGE_MODE",
                    message: e.to_string(),
                }
            })?;
    }
    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "true" | "True" | "TRUE" | "1")
}
