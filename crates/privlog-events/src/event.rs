//! Inbound payload and stored record types for privilege events.

use serde::{Deserialize, Serialize};

/// Client-profile specific data attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomData {
    /// Device serial number reported by the client.
    pub serial: String,
}

/// A validated inbound event, in the shape clients send it.
///
/// Produced by [`crate::validate_event`]; the struct itself carries no
/// optional fields, so a value of this type always holds a complete record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Whether the user holds admin privileges after the event.
    pub admin: bool,
    /// Nested client data; `serial` is stored as `custom_serial`.
    pub custom_data: CustomData,
    /// Whether the privilege change was delayed.
    pub delayed: bool,
    /// Event name, e.g. `login` or `privileges.granted`.
    pub event: String,
    /// Expiry as sent by the client. Not interpreted.
    pub expires: String,
    /// Machine name.
    pub machine: String,
    /// Reason the user gave for the change.
    pub reason: String,
    /// Event time as sent by the client. Stored as opaque text.
    pub timestamp: String,
    /// Account name the event refers to.
    pub user: String,
}

impl NewEvent {
    /// Returns the serial that is persisted in the `custom_serial` column.
    pub fn custom_serial(&self) -> &str {
        &self.custom_data.serial
    }

    /// Builds the stored representation once the store has assigned an id.
    pub fn into_record(self, id: i64) -> EventRecord {
        EventRecord {
            id,
            admin: self.admin,
            custom_serial: self.custom_data.serial,
            delayed: self.delayed,
            event: self.event,
            expires: self.expires,
            machine: self.machine,
            reason: self.reason,
            timestamp: self.timestamp,
            user: self.user,
        }
    }
}

/// A single row from the `priv_data` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Auto-incremented row ID.
    pub id: i64,
    pub admin: bool,
    pub custom_serial: String,
    pub delayed: bool,
    pub event: String,
    pub expires: String,
    pub machine: String,
    pub reason: String,
    pub timestamp: String,
    pub user: String,
}
