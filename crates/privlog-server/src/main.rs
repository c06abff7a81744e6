//! privlog server binary.
//!
//! Loads configuration, installs logging, opens and migrates the database,
//! then serves the HTTP API until SIGINT/SIGTERM.

use privlog_events::SqliteEventStore;
use privlog_server::{
    app,
    auth::{CredentialError, CredentialStore},
    config::{self, Config, ConfigError},
    health::HealthSettings,
    logging::{self, LoggingError},
    AppState,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Fatal startup and serve failures.
#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),
    #[error("invalid API_KEYS configuration: {0}")]
    Credentials(#[from] CredentialError),
    #[error("{0}")]
    Pool(#[from] privlog_db::PoolError),
    #[error("failed to get database connection for migrations: {0}")]
    Connection(#[from] r2d2::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(#[from] privlog_db::MigrationError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PRIVLOG_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().unwrap_or("privlog.toml");

    let config = match config::load_config(Some(selected_config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("privlog-server: {}", StartupError::from(e));
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("privlog-server: {}", StartupError::from(e));
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        source = config_source,
        path = selected_config_path,
        "resolved startup configuration path"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("privlog server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "privlog server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let credentials = CredentialStore::from_pairs(&config.auth.api_keys)?;
    if credentials.is_empty() {
        tracing::warn!("no API keys configured; every query request will be rejected");
    } else {
        tracing::info!(count = credentials.len(), "loaded API keys");
    }

    if !config.auth.require_key_for_ingest {
        tracing::warn!(
            "POST /privileges accepts events without an API key; \
             set auth.require_key_for_ingest to require one"
        );
    }

    let pool = privlog_db::create_pool(
        &config.database.path,
        privlog_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )?;

    {
        let conn = pool.get()?;
        let applied = privlog_db::run_migrations(&conn)?;
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    tracing::info!(
        mode = %config.query.time_range_mode,
        "time range queries configured"
    );

    let state = AppState {
        store: Arc::new(SqliteEventStore::new(pool, config.query.time_range_mode)),
        credentials: Arc::new(credentials),
        health: HealthSettings {
            log_dir: config.logging.directory.clone(),
            report_disk_space: config.health.report_disk_space,
            min_free_disk_gb: config.health.min_free_disk_gb,
        },
        require_key_for_ingest: config.auth.require_key_for_ingest,
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, "starting privlog server");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(StartupError::Serve)
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
