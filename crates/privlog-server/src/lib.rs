//! HTTP service for ingesting and querying privilege events.

pub mod api;
pub mod api_events;
pub mod auth;
pub mod config;
pub mod health;
pub mod logging;
pub mod middleware;

use auth::CredentialStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use health::HealthSettings;
use privlog_events::EventStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event storage.
    pub store: Arc<dyn EventStore>,
    /// API keys, immutable after startup.
    pub credentials: Arc<CredentialStore>,
    /// Health probe settings.
    pub health: HealthSettings,
    /// Whether `POST /privileges` sits behind the API key check.
    pub require_key_for_ingest: bool,
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let mut protected_routes = Router::new()
        .route(
            "/get-event-by-serial/{serial}",
            get(api_events::events_by_serial_handler),
        )
        .route(
            "/get-event-by-user/{username}",
            get(api_events::events_by_user_handler),
        )
        .route(
            "/get-event-by-time",
            get(api_events::events_by_time_handler),
        );

    let mut open_routes = Router::new().route("/health", get(health::health_handler));

    let ingest = post(api::receive_event_handler);
    if state.require_key_for_ingest {
        protected_routes = protected_routes.route("/privileges", ingest);
    } else {
        open_routes = open_routes.route("/privileges", ingest);
    }

    let protected_routes = protected_routes
        .route_layer(axum::middleware::from_fn(middleware::api_key_middleware));

    open_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::request_log_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
