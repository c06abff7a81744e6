//! Schema enforcement for inbound event payloads and lookup parameters.
//!
//! Payloads are checked field by field against the [`NewEvent`] shape so that
//! a rejection can name every offending field at once, not just the first
//! one a deserializer trips over. Types are checked strictly: `"true"` is not
//! a boolean and `42` is not a string. Unknown fields are ignored.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::event::{CustomData, NewEvent};

/// What is wrong with a single payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProblem {
    /// The field is absent (or `null`).
    Missing,
    /// The field is present but not a JSON boolean.
    ExpectedBoolean,
    /// The field is present but not a JSON string.
    ExpectedString,
    /// The field is present but not a JSON object.
    ExpectedObject,
}

impl FieldProblem {
    fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "field required",
            Self::ExpectedBoolean => "expected a boolean",
            Self::ExpectedString => "expected a string",
            Self::ExpectedObject => "expected an object",
        }
    }
}

/// A rejected payload field, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `custom_data.serial`.
    pub field: String,
    /// Why the field was rejected.
    pub problem: FieldProblem,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.problem.as_str())
    }
}

/// Errors produced while validating client input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The request body could not be parsed as JSON.
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    /// The request body is JSON but not an object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// One or more event fields are missing or mistyped.
    #[error("invalid event fields: {}", join_fields(.0))]
    Fields(Vec<FieldError>),

    /// A path or query parameter was rejected.
    #[error("invalid {name}: {reason}")]
    Parameter {
        /// Parameter name as it appears in the route or query string.
        name: &'static str,
        /// Human readable reason.
        reason: String,
    },
}

impl ValidationError {
    /// Returns the per-field errors, if this is a field-level rejection.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Fields(fields) => fields,
            _ => &[],
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates a raw request body and builds the event it describes.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedBody`] or
/// [`ValidationError::NotAnObject`] for bodies that are not a JSON object,
/// and [`ValidationError::Fields`] listing every missing or mistyped field.
pub fn validate_event(raw: &[u8]) -> Result<NewEvent, ValidationError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
    validate_event_value(&value)
}

/// Validates an already parsed JSON value. See [`validate_event`].
pub fn validate_event_value(value: &Value) -> Result<NewEvent, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;
    let mut errors = Vec::new();

    let admin = read_bool(object, "admin", &mut errors);
    let custom_data = read_object(object, "custom_data", &mut errors)
        .and_then(|nested| read_string_at(nested, "custom_data.serial", "serial", &mut errors))
        .map(|serial| CustomData { serial });
    let delayed = read_bool(object, "delayed", &mut errors);
    let event = read_string(object, "event", &mut errors);
    let expires = read_string(object, "expires", &mut errors);
    let machine = read_string(object, "machine", &mut errors);
    let reason = read_string(object, "reason", &mut errors);
    let timestamp = read_string(object, "timestamp", &mut errors);
    let user = read_string(object, "user", &mut errors);

    let (
        Some(admin),
        Some(custom_data),
        Some(delayed),
        Some(event),
        Some(expires),
        Some(machine),
        Some(reason),
        Some(timestamp),
        Some(user),
    ) = (
        admin,
        custom_data,
        delayed,
        event,
        expires,
        machine,
        reason,
        timestamp,
        user,
    )
    else {
        return Err(ValidationError::Fields(errors));
    };

    Ok(NewEvent {
        admin,
        custom_data,
        delayed,
        event,
        expires,
        machine,
        reason,
        timestamp,
        user,
    })
}

fn lookup<'a>(
    object: &'a Map<String, Value>,
    path: &str,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Value> {
    match object.get(key) {
        None | Some(Value::Null) => {
            errors.push(FieldError {
                field: path.to_string(),
                problem: FieldProblem::Missing,
            });
            None
        }
        Some(value) => Some(value),
    }
}

fn reject(path: &str, problem: FieldProblem, errors: &mut Vec<FieldError>) {
    errors.push(FieldError {
        field: path.to_string(),
        problem,
    });
}

fn read_bool(object: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<bool> {
    let value = lookup(object, key, key, errors)?;
    let parsed = value.as_bool();
    if parsed.is_none() {
        reject(key, FieldProblem::ExpectedBoolean, errors);
    }
    parsed
}

fn read_string(
    object: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    read_string_at(object, key, key, errors)
}

fn read_string_at(
    object: &Map<String, Value>,
    path: &str,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = lookup(object, path, key, errors)?;
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            reject(path, FieldProblem::ExpectedString, errors);
            None
        }
    }
}

fn read_object<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Map<String, Value>> {
    let value = lookup(object, key, key, errors)?;
    let nested = value.as_object();
    if nested.is_none() {
        reject(key, FieldProblem::ExpectedObject, errors);
    }
    nested
}

/// Checks a serial number or username used as a lookup key.
///
/// Accepted values are non-empty and consist of ASCII letters, digits and
/// `-` only.
///
/// # Errors
///
/// Returns [`ValidationError::Parameter`] naming `name` otherwise.
pub fn validate_lookup_key(name: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Parameter {
            name,
            reason: "must not be empty".to_string(),
        });
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::Parameter {
            name,
            reason: "must match ^[A-Za-z0-9-]+$".to_string(),
        });
    }
    Ok(())
}
