//! API key credentials and identity resolution.
//!
//! Keys are loaded once from newline separated `key:identity` pairs and never
//! change afterwards, so the map is shared behind an `Arc` without a lock.

use std::collections::HashMap;
use std::fmt;

/// The name bound to an API key. Used for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Returns the identity name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while parsing the configured key list.
///
/// Key material is never included in the message; lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// A line does not contain exactly one `:` separator.
    #[error("api key entry on line {line} must have the form key:identity")]
    MalformedEntry {
        /// Line number within the configured value.
        line: usize,
    },

    /// Key or identity is empty.
    #[error("api key entry on line {line} has an empty key or identity")]
    EmptyField {
        /// Line number within the configured value.
        line: usize,
    },

    /// The same key appears twice.
    #[error("api key entry on line {line} repeats an earlier key")]
    DuplicateKey {
        /// Line number within the configured value.
        line: usize,
    },
}

/// Returned for a missing or unknown key. Carries no reason on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("could not validate request")]
pub struct Unauthorized;

/// Immutable mapping from API key to identity.
#[derive(Clone, Default)]
pub struct CredentialStore {
    keys: HashMap<String, Identity>,
}

impl CredentialStore {
    /// Parses newline separated `key:identity` pairs.
    ///
    /// Blank lines are skipped and surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` for the first malformed, empty, or
    /// duplicate entry. Callers treat this as fatal.
    pub fn from_pairs(raw: &str) -> Result<Self, CredentialError> {
        let mut keys = HashMap::new();

        for (index, line) in raw.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split(':');
            let (Some(key), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(CredentialError::MalformedEntry { line: line_no });
            };
            let (key, name) = (key.trim(), name.trim());
            if key.is_empty() || name.is_empty() {
                return Err(CredentialError::EmptyField { line: line_no });
            }
            if keys
                .insert(key.to_string(), Identity(name.to_string()))
                .is_some()
            {
                return Err(CredentialError::DuplicateKey { line: line_no });
            }
        }

        Ok(Self { keys })
    }

    /// Resolves a presented key to its identity.
    ///
    /// # Errors
    ///
    /// Returns [`Unauthorized`] for a missing, empty, or unknown key.
    pub fn resolve(&self, presented: Option<&str>) -> Result<Identity, Unauthorized> {
        presented
            .filter(|key| !key.is_empty())
            .and_then(|key| self.keys.get(key))
            .cloned()
            .ok_or(Unauthorized)
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("keys", &self.keys.len())
            .finish()
    }
}
