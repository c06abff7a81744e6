//! Error mapping and the event ingestion handler.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use privlog_events::{validate_event, EventStore, NewEvent, StoreError, ValidationError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not validate request")]
    Forbidden,
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => {
                let mut body = serde_json::json!({ "error": err.to_string() });
                if !err.fields().is_empty() {
                    body["fields"] = serde_json::json!(err.fields());
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "could not validate request" })),
            )
                .into_response(),
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "event store operation failed");
                internal_error()
            }
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "internal server error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal server error" })),
    )
        .into_response()
}

/// Runs a blocking store operation off the async executor.
///
/// The pooled connection is checked out and returned inside `op`, so it is
/// released even if the client has already gone away.
pub(crate) async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn EventStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
        .map_err(ApiError::from)
}

/// Response body for a stored event.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always `"success"`.
    pub status: &'static str,
    /// The id the store assigned.
    pub id: i64,
    /// The validated payload, in the shape it was received.
    pub received: NewEvent,
}

/// Handler for `POST /privileges`.
///
/// Validates the body against the event schema and appends it to the store.
/// Unauthenticated unless `auth.require_key_for_ingest` is set.
pub async fn receive_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let event = validate_event(&body)?;
    tracing::debug!(?event, "validated event payload");

    let to_store = event.clone();
    let stored = with_store(&state, move |store| store.insert(&to_store)).await?;

    tracing::info!(
        id = stored.id,
        serial = %stored.custom_serial,
        user = %stored.user,
        event = %stored.event,
        "stored privilege event"
    );

    Ok(Json(IngestResponse {
        status: "success",
        id: stored.id,
        received: event,
    }))
}
