//! `GET /health`: store reachability, log sink writability and free disk
//! space, folded into one overall status.
//!
//! Degraded probes show up as field values; the endpoint itself always
//! answers `200` while the process is alive.

use crate::AppState;
use axum::{extract::Extension, Json};
use privlog_events::EventStore;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// File inside the log directory that the write probe appends to.
pub const HEALTH_PROBE_FILE: &str = "health_check.log";

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Overall health, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

/// Settings the health probes run with.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Directory probed for writability and free space.
    pub log_dir: PathBuf,
    /// Whether to include `disk_free_gb` in the report.
    pub report_disk_space: bool,
    /// Threshold below which disk space is reported as `low`.
    pub min_free_disk_gb: f64,
}

/// Body of the `/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_sample: Option<&'static str>,
    pub log_write: &'static str,
    pub disk_space: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_free_gb: Option<String>,
}

impl HealthReport {
    fn degrade(&mut self, to: HealthStatus) {
        self.status = self.status.max(to);
    }

    /// Report used when the probes themselves could not run.
    fn unavailable() -> Self {
        Self {
            status: HealthStatus::Error,
            database: "unknown",
            database_sample: None,
            log_write: "unknown",
            disk_space: "unknown",
            disk_free_gb: None,
        }
    }
}

/// Runs all probes. Blocking.
pub fn check_health(store: &dyn EventStore, settings: &HealthSettings) -> HealthReport {
    let mut report = HealthReport {
        status: HealthStatus::Ok,
        database: "reachable",
        database_sample: None,
        log_write: "ok",
        disk_space: "sufficient",
        disk_free_gb: None,
    };

    match store.probe() {
        Ok(true) => report.database_sample = Some("found"),
        Ok(false) => {
            report.database_sample = Some("empty");
            report.degrade(HealthStatus::Warning);
        }
        Err(e) => {
            tracing::error!(error = %e, "health check database query failed");
            report.database = "unreachable";
            report.degrade(HealthStatus::Error);
        }
    }

    if let Err(e) = probe_log_write(settings) {
        tracing::error!(error = %e, "health check log write failed");
        report.log_write = "failed";
        report.degrade(HealthStatus::Error);
    }

    match fs4::available_space(&settings.log_dir) {
        Ok(bytes) => {
            let free_gb = bytes as f64 / BYTES_PER_GIB;
            if settings.report_disk_space {
                report.disk_free_gb = Some(format!("{free_gb:.2}"));
            }
            if free_gb < settings.min_free_disk_gb {
                report.disk_space = "low";
                report.degrade(HealthStatus::Warning);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "health check disk probe failed");
            report.disk_space = "unknown";
            report.degrade(HealthStatus::Error);
        }
    }

    report
}

fn probe_log_write(settings: &HealthSettings) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(settings.log_dir.join(HEALTH_PROBE_FILE))?;
    writeln!(
        file,
        "Health check log test at {}",
        chrono::Utc::now().to_rfc3339()
    )
}

/// Handler for `GET /health`.
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthReport> {
    let store = Arc::clone(&state.store);
    let settings = state.health.clone();

    let report = tokio::task::spawn_blocking(move || check_health(store.as_ref(), &settings))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "health check task failed");
            HealthReport::unavailable()
        });

    Json(report)
}
