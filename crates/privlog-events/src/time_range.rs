//! Time range parameters for the `/get-event-by-time` query.
//!
//! Stored timestamps are opaque text. The bounds a client sends are parsed as
//! ISO 8601 and re-rendered in one canonical form (`YYYY-MM-DDTHH:MM:SS`,
//! `.ffffff` only when sub-second precision is present, `+HH:MM` only when
//! the input carried an offset) before they reach the store.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;

use crate::validation::ValidationError;

/// How the store compares the `timestamp` column against a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRangeMode {
    /// Plain text comparison. Chronologically correct only when every stored
    /// timestamp uses the same ISO 8601 layout and timezone convention.
    #[default]
    Lexical,
    /// Compares SQLite `julianday()` values. Rows whose timestamp SQLite
    /// cannot parse never match.
    Chronological,
}

impl TimeRangeMode {
    /// Returns the configuration label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Chronological => "chronological",
        }
    }
}

impl std::fmt::Display for TimeRangeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeRangeMode {
    type Err = ParseTimeRangeModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "chronological" => Ok(Self::Chronological),
            _ => Err(ParseTimeRangeModeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown time range mode.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown time range mode: {0} (expected lexical or chronological)")]
pub struct ParseTimeRangeModeError(pub String);

/// An inclusive range of canonical ISO 8601 strings.
///
/// `start > end` is allowed and simply matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound, inclusive.
    pub start: String,
    /// Upper bound, inclusive.
    pub end: String,
}

impl TimeRange {
    /// Parses both bounds from raw query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Parameter`] naming `start` or `end` when a
    /// bound is missing or not an ISO 8601 timestamp.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }
}

fn parse_bound(name: &'static str, raw: Option<&str>) -> Result<String, ValidationError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        ValidationError::Parameter {
            name,
            reason: "field required".to_string(),
        }
    })?;
    canonical_timestamp(raw).ok_or_else(|| ValidationError::Parameter {
        name,
        reason: format!("not an ISO 8601 timestamp: {raw}"),
    })
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// `%#z` takes `Z`, `+HH:MM` and `+HHMM`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Parses an ISO 8601 timestamp and renders it in canonical form.
///
/// Accepts date-times with or without an offset (`Z`, `±HH:MM` or `±HHMM`),
/// with or without fractional seconds, and bare dates (meaning midnight).
/// Returns `None` for anything else.
pub fn canonical_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(render_with_offset(&dt));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(render_with_offset(&dt));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(render_naive(&dt));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| render_naive(&dt))
}

fn render_naive(dt: &NaiveDateTime) -> String {
    let micros = dt.nanosecond() / 1_000;
    let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    if micros == 0 {
        base
    } else {
        format!("{base}.{micros:06}")
    }
}

fn render_with_offset(dt: &DateTime<FixedOffset>) -> String {
    format!("{}{}", render_naive(&dt.naive_local()), dt.format("%:z"))
}
