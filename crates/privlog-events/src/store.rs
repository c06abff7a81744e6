//! Persistence operations for the `priv_data` table.
//!
//! The free functions operate on a borrowed [`Connection`] and execute a
//! single statement each, so every call is its own implicit transaction.
//! [`SqliteEventStore`] wraps them behind the [`EventStore`] trait, checking
//! one connection out of the pool per call.

use privlog_db::DbPool;
use rusqlite::{params, Connection, Row};

use crate::error::StoreError;
use crate::event::{EventRecord, NewEvent};
use crate::time_range::{TimeRange, TimeRangeMode};

const SELECT_COLUMNS: &str =
    "SELECT id, admin, custom_serial, delayed, event, expires, machine, reason, timestamp, user
     FROM priv_data";

/// Appends one event and returns it with its assigned id.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure; no row is written then.
pub fn insert_event(conn: &Connection, event: &NewEvent) -> Result<EventRecord, StoreError> {
    let id: i64 = conn.query_row(
        "INSERT INTO priv_data (
            admin, custom_serial, delayed, event, expires,
            machine, reason, timestamp, user
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         RETURNING id",
        params![
            event.admin,
            event.custom_serial(),
            event.delayed,
            event.event,
            event.expires,
            event.machine,
            event.reason,
            event.timestamp,
            event.user,
        ],
        |row| row.get(0),
    )?;

    Ok(event.clone().into_record(id))
}

/// Returns every event whose `custom_serial` equals `serial`.
pub fn events_by_serial(conn: &Connection, serial: &str) -> Result<Vec<EventRecord>, StoreError> {
    select_events(
        conn,
        &format!("{SELECT_COLUMNS} WHERE custom_serial = ?1 ORDER BY id ASC"),
        params![serial],
    )
}

/// Returns every event whose `user` equals `username`.
pub fn events_by_user(conn: &Connection, username: &str) -> Result<Vec<EventRecord>, StoreError> {
    select_events(
        conn,
        &format!("{SELECT_COLUMNS} WHERE user = ?1 ORDER BY id ASC"),
        params![username],
    )
}

/// Returns every event whose `timestamp` lies within `range`, inclusive.
pub fn events_in_range(
    conn: &Connection,
    range: &TimeRange,
    mode: TimeRangeMode,
) -> Result<Vec<EventRecord>, StoreError> {
    let predicate = match mode {
        TimeRangeMode::Lexical => "timestamp >= ?1 AND timestamp <= ?2",
        TimeRangeMode::Chronological => {
            "julianday(timestamp) >= julianday(?1) AND julianday(timestamp) <= julianday(?2)"
        }
    };
    select_events(
        conn,
        &format!("{SELECT_COLUMNS} WHERE {predicate} ORDER BY id ASC"),
        params![range.start, range.end],
    )
}

/// Reports whether the table holds at least one row.
///
/// Used as the store reachability probe; it fails if the table is missing.
pub fn has_events(conn: &Connection) -> Result<bool, StoreError> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM priv_data LIMIT 1)",
        [],
        |row| row.get(0),
    )?;
    Ok(found)
}

fn select_events(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<EventRecord>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: row.get(0)?,
        admin: row.get(1)?,
        custom_serial: row.get(2)?,
        delayed: row.get(3)?,
        event: row.get(4)?,
        expires: row.get(5)?,
        machine: row.get(6)?,
        reason: row.get(7)?,
        timestamp: row.get(8)?,
        user: row.get(9)?,
    })
}

/// Durable, append-only storage for privilege events.
///
/// Implementations are blocking; async callers run them on
/// `tokio::task::spawn_blocking`.
pub trait EventStore: Send + Sync {
    /// Appends `event` and returns the stored record.
    fn insert(&self, event: &NewEvent) -> Result<EventRecord, StoreError>;

    /// Exact match on `custom_serial`, ascending by id.
    fn query_by_serial(&self, serial: &str) -> Result<Vec<EventRecord>, StoreError>;

    /// Exact match on `user`, ascending by id.
    fn query_by_user(&self, username: &str) -> Result<Vec<EventRecord>, StoreError>;

    /// Inclusive range on `timestamp`, ascending by id.
    fn query_by_time_range(&self, range: &TimeRange) -> Result<Vec<EventRecord>, StoreError>;

    /// Reachability probe: `Ok(true)` when at least one row exists.
    fn probe(&self) -> Result<bool, StoreError>;
}

/// [`EventStore`] backed by the SQLite connection pool.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: DbPool,
    time_range_mode: TimeRangeMode,
}

impl SqliteEventStore {
    /// Wraps a pool whose database has been migrated.
    pub fn new(pool: DbPool, time_range_mode: TimeRangeMode) -> Self {
        Self {
            pool,
            time_range_mode,
        }
    }

    /// The comparison used by [`EventStore::query_by_time_range`].
    pub fn time_range_mode(&self) -> TimeRangeMode {
        self.time_range_mode
    }
}

impl EventStore for SqliteEventStore {
    fn insert(&self, event: &NewEvent) -> Result<EventRecord, StoreError> {
        let conn = self.pool.get()?;
        insert_event(&conn, event)
    }

    fn query_by_serial(&self, serial: &str) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.pool.get()?;
        events_by_serial(&conn, serial)
    }

    fn query_by_user(&self, username: &str) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.pool.get()?;
        events_by_user(&conn, username)
    }

    fn query_by_time_range(&self, range: &TimeRange) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.pool.get()?;
        events_in_range(&conn, range, self.time_range_mode)
    }

    fn probe(&self) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        has_events(&conn)
    }
}
