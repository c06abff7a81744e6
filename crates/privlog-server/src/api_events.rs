//! Authenticated read endpoints over stored events.
//!
//! Provides:
//! - `GET /get-event-by-serial/{serial}`
//! - `GET /get-event-by-user/{username}`
//! - `GET /get-event-by-time?start=..&end=..`
//!
//! All three run behind [`crate::middleware::api_key_middleware`] and reject
//! malformed parameters before the store is touched.

use crate::api::{with_store, ApiError};
use crate::middleware::IdentityContext;
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use privlog_events::{validate_lookup_key, EventRecord, TimeRange};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for `GET /get-event-by-time`.
#[derive(Debug, Deserialize)]
pub struct TimeRangeQuery {
    /// Lower bound, ISO 8601.
    pub start: Option<String>,
    /// Upper bound, ISO 8601.
    pub end: Option<String>,
}

fn log_results(records: &[EventRecord]) {
    tracing::debug!(count = records.len(), records = ?records, "events read from store");
}

/// Handler for `GET /get-event-by-serial/{serial}`.
pub async fn events_by_serial_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(IdentityContext(identity)): Extension<IdentityContext>,
    Path(serial): Path<String>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    validate_lookup_key("serial", &serial)?;
    tracing::info!(%identity, %serial, "events requested by serial");

    let records = with_store(&state, move |store| store.query_by_serial(&serial)).await?;
    log_results(&records);
    Ok(Json(records))
}

/// Handler for `GET /get-event-by-user/{username}`.
pub async fn events_by_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(IdentityContext(identity)): Extension<IdentityContext>,
    Path(username): Path<String>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    validate_lookup_key("username", &username)?;
    tracing::info!(%identity, %username, "events requested by user");

    let records = with_store(&state, move |store| store.query_by_user(&username)).await?;
    log_results(&records);
    Ok(Json(records))
}

/// Handler for `GET /get-event-by-time`.
///
/// A range whose start lies after its end is not an error; it matches
/// nothing.
pub async fn events_by_time_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(IdentityContext(identity)): Extension<IdentityContext>,
    Query(params): Query<TimeRangeQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let range = TimeRange::parse(params.start.as_deref(), params.end.as_deref())?;
    tracing::info!(
        %identity,
        start = %range.start,
        end = %range.end,
        "events requested by time range"
    );

    let records = with_store(&state, move |store| store.query_by_time_range(&range)).await?;
    log_results(&records);
    Ok(Json(records))
}
