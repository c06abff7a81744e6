//! Tracing subscriber setup: console output plus a daily rolling log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// File name prefix of the rolling log files (`privlog.YYYY-MM-DD.log`).
pub const LOG_FILE_PREFIX: &str = "privlog";

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("failed to create log directory: {0}")]
    CreateDir(#[from] std::io::Error),

    /// The rolling file appender could not be built.
    #[error("failed to open rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Translates a configured level into an `EnvFilter` directive.
///
/// The legacy names `DEBUG`, `INFO`, `WARNING` (and `WARN`, `ERROR`) are
/// accepted in any case. Anything else is used as a directive if it parses,
/// otherwise `info`.
pub fn level_directive(level: &str) -> String {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ if EnvFilter::try_new(level.trim()).is_ok() && !level.trim().is_empty() => {
            level.trim().to_string()
        }
        _ => "info".to_string(),
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns `LoggingError` if the log directory or file cannot be opened or a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(&config.directory)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.retention_days.max(1))
        .build(&config.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::new(level_directive(&config.level));

    let console_json = config.json.then(|| fmt::layer().json());
    let console_plain = (!config.json).then(fmt::layer);
    let file = fmt::layer().with_ansi(false).with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_plain)
        .with(file)
        .try_init()?;

    Ok(guard)
}
