#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use privlog_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use privlog_events::{
    EventRecord, EventStore, NewEvent, SqliteEventStore, StoreError, TimeRange, TimeRangeMode,
};
use privlog_server::{auth::CredentialStore, health::HealthSettings, AppState};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const VALID_KEY: &str = "abc123";
pub const API_KEYS: &str = "abc123:jamf\ndef456:reporting";

/// A router over a migrated SQLite database inside a temp dir.
pub struct TestServer {
    pub app: Router,
    pub pool: DbPool,
    pub dir: TempDir,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_options(false, TimeRangeMode::Lexical)
    }

    pub fn with_options(require_key_for_ingest: bool, mode: TimeRangeMode) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("data.db");
        let pool = create_pool(
            db_path.to_str().expect("utf-8 path"),
            DbRuntimeSettings::default(),
        )
        .expect("pool");
        {
            let conn = pool.get().expect("connection");
            run_migrations(&conn).expect("migrations");
        }

        let store = Arc::new(SqliteEventStore::new(pool.clone(), mode));
        let state = state_with(store, health_settings(&dir), require_key_for_ingest);

        Self {
            app: privlog_server::app(state),
            pool,
            dir,
        }
    }

    pub fn row_count(&self) -> i64 {
        let conn = self.pool.get().expect("connection");
        conn.query_row("SELECT COUNT(*) FROM priv_data", [], |row| row.get(0))
            .expect("count")
    }
}

pub fn health_settings(dir: &TempDir) -> HealthSettings {
    HealthSettings {
        log_dir: dir.path().to_path_buf(),
        report_disk_space: false,
        min_free_disk_gb: 0.0,
    }
}

pub fn state_with(
    store: Arc<dyn EventStore>,
    health: HealthSettings,
    require_key_for_ingest: bool,
) -> AppState {
    AppState {
        store,
        credentials: Arc::new(CredentialStore::from_pairs(API_KEYS).expect("keys")),
        health,
        require_key_for_ingest,
    }
}

/// Store that records how often it is touched and can be told to fail.
#[derive(Default)]
pub struct CountingStore {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingStore {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(StoreError::Database(rusqlite::Error::InvalidQuery))
        } else {
            Ok(())
        }
    }
}

impl EventStore for CountingStore {
    fn insert(&self, event: &NewEvent) -> Result<EventRecord, StoreError> {
        self.touch()?;
        Ok(event.clone().into_record(1))
    }

    fn query_by_serial(&self, _serial: &str) -> Result<Vec<EventRecord>, StoreError> {
        self.touch()?;
        Ok(Vec::new())
    }

    fn query_by_user(&self, _username: &str) -> Result<Vec<EventRecord>, StoreError> {
        self.touch()?;
        Ok(Vec::new())
    }

    fn query_by_time_range(&self, _range: &TimeRange) -> Result<Vec<EventRecord>, StoreError> {
        self.touch()?;
        Ok(Vec::new())
    }

    fn probe(&self) -> Result<bool, StoreError> {
        self.touch()?;
        Ok(false)
    }
}

pub fn event_json(serial: &str, user: &str, timestamp: &str) -> Value {
    serde_json::json!({
        "admin": true,
        "custom_data": { "serial": serial },
        "delayed": false,
        "event": "promoted",
        "expires": "2024-01-01T13:00:00",
        "machine": "MBP-01",
        "reason": "install",
        "timestamp": timestamp,
        "user": user
    })
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).expect("request")
}

/// Sends one request through the router and returns status and JSON body.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
