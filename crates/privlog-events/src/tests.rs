//! Unit tests for the event store.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::event::{CustomData, NewEvent};
use crate::store::{
    events_by_serial, events_by_user, events_in_range, has_events, insert_event, EventStore,
    SqliteEventStore,
};
use crate::time_range::{TimeRange, TimeRangeMode};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    privlog_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn event(serial: &str, user: &str, timestamp: &str) -> NewEvent {
    NewEvent {
        admin: true,
        custom_data: CustomData {
            serial: serial.to_string(),
        },
        delayed: false,
        event: "login".to_string(),
        expires: "2025-01-01T00:00:00".to_string(),
        machine: "M1".to_string(),
        reason: "test".to_string(),
        timestamp: timestamp.to_string(),
        user: user.to_string(),
    }
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange {
        start: start.to_string(),
        end: end.to_string(),
    }
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM priv_data", [], |row| row.get(0))
        .expect("should count rows")
}

// ── insert tests ─────────────────────────────────────────────────────

#[test]
fn insert_assigns_increasing_ids() {
    let conn = test_db();

    let first = insert_event(&conn, &event("SN-1", "alice", "2024-01-01T00:00:00"))
        .expect("insert should succeed");
    let second = insert_event(&conn, &event("SN-2", "bob", "2024-01-02T00:00:00"))
        .expect("insert should succeed");

    assert!(first.id > 0);
    assert!(second.id > first.id);
    assert_eq!(row_count(&conn), 2);
}

#[test]
fn insert_stores_serial_from_custom_data() {
    let conn = test_db();
    let stored = insert_event(&conn, &event("SN-1", "alice", "2024-01-01T00:00:00"))
        .expect("insert should succeed");

    let (serial, admin, delayed): (String, bool, bool) = conn
        .query_row(
            "SELECT custom_serial, admin, delayed FROM priv_data WHERE id = ?1",
            [stored.id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("should query inserted row");

    assert_eq!(serial, "SN-1");
    assert!(admin);
    assert!(!delayed);
}

#[test]
fn insert_on_missing_table_returns_database_error() {
    let conn = Connection::open_in_memory().expect("open db");

    let result = insert_event(&conn, &event("SN-1", "alice", "2024-01-01T00:00:00"));

    assert!(
        matches!(result, Err(StoreError::Database(_))),
        "should return database error when table is missing"
    );
}

// ── query tests ──────────────────────────────────────────────────────

#[test]
fn round_trip_through_every_query() {
    let conn = test_db();
    let input = event("SN-1", "alice", "2024-01-01T00:00:00");
    let stored = insert_event(&conn, &input).expect("insert");

    let by_serial = events_by_serial(&conn, "SN-1").expect("by serial");
    let by_user = events_by_user(&conn, "alice").expect("by user");
    let by_time = events_in_range(
        &conn,
        &range("2024-01-01T00:00:00", "2024-01-01T00:00:00"),
        TimeRangeMode::Lexical,
    )
    .expect("by time");

    for results in [&by_serial, &by_user, &by_time] {
        assert_eq!(results.as_slice(), &[stored.clone()]);
    }
    assert_eq!(stored, input.into_record(stored.id));
}

#[test]
fn queries_match_exactly_and_in_id_order() {
    let conn = test_db();
    insert_event(&conn, &event("SN-1", "alice", "2024-01-03T00:00:00")).expect("insert");
    insert_event(&conn, &event("SN-10", "alice", "2024-01-01T00:00:00")).expect("insert");
    insert_event(&conn, &event("SN-1", "alicia", "2024-01-02T00:00:00")).expect("insert");

    let serial = events_by_serial(&conn, "SN-1").expect("by serial");
    assert_eq!(serial.len(), 2);
    assert!(serial[0].id < serial[1].id);
    assert!(serial.iter().all(|e| e.custom_serial == "SN-1"));

    let user = events_by_user(&conn, "alice").expect("by user");
    assert_eq!(user.len(), 2);
    assert!(user.iter().all(|e| e.user == "alice"));
}

#[test]
fn no_matches_is_an_empty_vec() {
    let conn = test_db();
    insert_event(&conn, &event("SN-1", "alice", "2024-01-01T00:00:00")).expect("insert");

    assert!(events_by_serial(&conn, "SN-404").expect("query").is_empty());
    assert!(events_by_user(&conn, "nobody").expect("query").is_empty());
}

#[test]
fn lexical_range_is_inclusive() {
    let conn = test_db();
    for ts in [
        "2024-01-01T00:00:00",
        "2024-03-01T00:00:00",
        "2024-06-01T00:00:00",
        "2024-09-01T00:00:00",
    ] {
        insert_event(&conn, &event("SN-1", "alice", ts)).expect("insert");
    }

    let hits = events_in_range(
        &conn,
        &range("2024-03-01T00:00:00", "2024-06-01T00:00:00"),
        TimeRangeMode::Lexical,
    )
    .expect("range query");
    let stamps: Vec<_> = hits.iter().map(|e| e.timestamp.as_str()).collect();
    assert_eq!(stamps, ["2024-03-01T00:00:00", "2024-06-01T00:00:00"]);
}

#[test]
fn reversed_range_matches_nothing() {
    let conn = test_db();
    insert_event(&conn, &event("SN-1", "alice", "2024-03-01T00:00:00")).expect("insert");

    for mode in [TimeRangeMode::Lexical, TimeRangeMode::Chronological] {
        let hits = events_in_range(
            &conn,
            &range("2024-06-01T00:00:00", "2024-01-01T00:00:00"),
            mode,
        )
        .expect("range query");
        assert!(hits.is_empty(), "{mode} should return nothing");
    }
}

#[test]
fn lexical_and_chronological_differ_on_mixed_layouts() {
    let conn = test_db();
    // A space separator sorts before 'T'; an offset moves the instant
    // (16:00-05:00 is 21:00 UTC) without changing the text.
    insert_event(&conn, &event("SN-1", "alice", "2024-01-01 12:00:00")).expect("insert");
    insert_event(&conn, &event("SN-2", "alice", "2024-01-01T16:00:00-05:00")).expect("insert");
    insert_event(&conn, &event("SN-3", "alice", "not a date")).expect("insert");

    let window = range("2024-01-01T06:00:00", "2024-01-01T18:00:00");

    let lexical = events_in_range(&conn, &window, TimeRangeMode::Lexical).expect("lexical");
    let serials: Vec<_> = lexical.iter().map(|e| e.custom_serial.as_str()).collect();
    assert_eq!(serials, ["SN-2"], "text comparison only looks at characters");

    let chrono = events_in_range(&conn, &window, TimeRangeMode::Chronological).expect("chrono");
    let serials: Vec<_> = chrono.iter().map(|e| e.custom_serial.as_str()).collect();
    assert_eq!(serials, ["SN-1"], "julianday compares instants");
}

#[test]
fn has_events_reports_presence() {
    let conn = test_db();
    assert!(!has_events(&conn).expect("probe"));
    insert_event(&conn, &event("SN-1", "alice", "2024-01-01T00:00:00")).expect("insert");
    assert!(has_events(&conn).expect("probe"));
}

#[test]
fn has_events_fails_without_table() {
    let conn = Connection::open_in_memory().expect("open db");
    assert!(matches!(has_events(&conn), Err(StoreError::Database(_))));
}

// ── SqliteEventStore tests ───────────────────────────────────────────

#[test]
fn pooled_store_sees_its_own_writes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("events.db");
    let pool = privlog_db::create_pool(
        path.to_str().expect("utf-8 path"),
        privlog_db::DbRuntimeSettings::default(),
    )
    .expect("pool");
    {
        let conn = pool.get().expect("conn");
        privlog_db::run_migrations(&conn).expect("migrations");
    }

    let store = SqliteEventStore::new(pool, TimeRangeMode::Chronological);
    assert_eq!(store.time_range_mode(), TimeRangeMode::Chronological);
    assert!(!store.probe().expect("probe"));

    let stored = store
        .insert(&event("SN-7", "carol", "2024-05-05T05:05:05"))
        .expect("insert");

    assert_eq!(store.query_by_serial("SN-7").expect("serial"), vec![stored.clone()]);
    assert_eq!(store.query_by_user("carol").expect("user"), vec![stored.clone()]);
    assert_eq!(
        store
            .query_by_time_range(&range("2024-05-01T00:00:00", "2024-05-31T00:00:00"))
            .expect("range"),
        vec![stored]
    );
    assert!(store.probe().expect("probe"));
}
