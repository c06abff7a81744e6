//! Privilege event records: schema, validation and storage.
//!
//! Clients push one event per request. Each event is validated against the
//! [`NewEvent`] schema, appended to the `priv_data` table, and can later be
//! read back by serial number, by user, or by timestamp range. Rows are never
//! updated or deleted.
//!
//! # Usage
//!
//! ```rust,ignore
//! use privlog_events::{validate_event, EventStore, SqliteEventStore, TimeRangeMode};
//!
//! let store = SqliteEventStore::new(pool, TimeRangeMode::Lexical);
//! let event = validate_event(body)?;
//! let stored = store.insert(&event)?;
//! let same_device = store.query_by_serial(&stored.custom_serial)?;
//! ```

mod error;
mod event;
mod store;
mod time_range;
mod validation;

pub use error::StoreError;
pub use event::{CustomData, EventRecord, NewEvent};
pub use store::{
    events_by_serial, events_by_user, events_in_range, has_events, insert_event, EventStore,
    SqliteEventStore,
};
pub use time_range::{canonical_timestamp, ParseTimeRangeModeError, TimeRange, TimeRangeMode};
pub use validation::{
    validate_event, validate_event_value, validate_lookup_key, FieldError, FieldProblem,
    ValidationError,
};

#[cfg(test)]
mod tests;
