//! Session snapshots
//!
//! Converts a [`SessionState`] to and from a portable JSON record. The cookie
//! jar is serialized on its own (as JSON text under `cookies`); scalar fields
//! are written under their camelCase keys from an explicit field list. Adding
//! a field to the session means adding it to [`SnapshotField::ALL`] and
//! deciding whether `SNAPSHOT_VERSION` must change.
//!
//! Checkpoint and challenge payloads are transient and never persisted.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cookies::SerializedJar;
use crate::errors::{IgError, Result};
use crate::session::SessionState;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u64 = 1;

pub const VERSION_KEY: &str = "snapshotVersion";
pub const COOKIES_KEY: &str = "cookies";

/// Scalar session fields that are persisted, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotField {
    Language,
    TimezoneOffset,
    ProxyUrl,
    CsrfToken,
    Host,
    IgWwwClaim,
    Authorization,
    PasswordEncryptionPubKey,
    PasswordEncryptionKeyId,
    DeviceId,
    Uuid,
}

impl SnapshotField {
    pub const ALL: [Self; 11] = [
        Self::Language,
        Self::TimezoneOffset,
        Self::ProxyUrl,
        Self::CsrfToken,
        Self::Host,
        Self::IgWwwClaim,
        Self::Authorization,
        Self::PasswordEncryptionPubKey,
        Self::PasswordEncryptionKeyId,
        Self::DeviceId,
        Self::Uuid,
    ];

    /// Key used in the persisted record.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::TimezoneOffset => "timezoneOffset",
            Self::ProxyUrl => "proxyUrl",
            Self::CsrfToken => "csrftoken",
            Self::Host => "host",
            Self::IgWwwClaim => "igWWWClaim",
            Self::Authorization => "authorization",
            Self::PasswordEncryptionPubKey => "passwordEncryptionPubKey",
            Self::PasswordEncryptionKeyId => "passwordEncryptionKeyId",
            Self::DeviceId => "deviceId",
            Self::Uuid => "uuid",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    const fn is_required(self) -> bool {
        matches!(self, Self::Language | Self::TimezoneOffset | Self::Host)
    }

    fn read(self, state: &SessionState) -> Value {
        let optional = |value: &Option<String>| value.clone().map_or(Value::Null, Value::String);
        match self {
            Self::Language => Value::String(state.language.clone()),
            Self::TimezoneOffset => Value::String(state.timezone_offset.clone()),
            Self::Host => Value::String(state.host.clone()),
            Self::ProxyUrl => optional(&state.proxy_url),
            Self::CsrfToken => optional(&state.csrf_token),
            Self::IgWwwClaim => optional(&state.ig_www_claim),
            Self::Authorization => optional(&state.authorization),
            Self::PasswordEncryptionPubKey => optional(&state.password_encryption_pub_key),
            Self::PasswordEncryptionKeyId => optional(&state.password_encryption_key_id),
            Self::DeviceId => optional(&state.device_id),
            Self::Uuid => optional(&state.uuid),
        }
    }

    /// Validates a raw record value into the field's stored form.
    fn decode(self, value: &Value) -> Result<Option<String>> {
        let decoded = match value {
            Value::String(s) => Some(s.clone()),
            // Older records store the key id and timezone offset as numbers.
            Value::Number(n) => Some(n.to_string()),
            Value::Null if !self.is_required() => None,
            other => {
                return Err(IgError::InvalidState(format!(
                    "field '{}' has unexpected value {other}",
                    self.key()
                )))
            }
        };
        Ok(decoded)
    }

    fn write(self, state: &mut SessionState, value: Option<String>) {
        match self {
            Self::Language => state.language = value.unwrap_or_default(),
            Self::TimezoneOffset => state.timezone_offset = value.unwrap_or_default(),
            Self::Host => state.host = value.unwrap_or_default(),
            Self::ProxyUrl => state.proxy_url = value,
            Self::CsrfToken => state.csrf_token = value,
            Self::IgWwwClaim => state.ig_www_claim = value,
            Self::Authorization => state.authorization = value,
            Self::PasswordEncryptionPubKey => state.password_encryption_pub_key = value,
            Self::PasswordEncryptionKeyId => state.password_encryption_key_id = value,
            Self::DeviceId => state.device_id = value,
            Self::Uuid => state.uuid = value,
        }
    }
}

/// Input accepted by [`SessionState::deserialize`]: a record or JSON text.
#[derive(Debug, Clone)]
pub enum SnapshotSource<'a> {
    Record(Value),
    Text(&'a str),
}

impl From<Value> for SnapshotSource<'_> {
    fn from(value: Value) -> Self {
        Self::Record(value)
    }
}

impl From<Map<String, Value>> for SnapshotSource<'_> {
    fn from(map: Map<String, Value>) -> Self {
        Self::Record(Value::Object(map))
    }
}

impl<'a> From<&'a str> for SnapshotSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl SessionState {
    /// Serializes the whole session into a flat record.
    ///
    /// # Errors
    /// Returns `IgError::InvalidState` if the cookie jar cannot be serialized.
    pub fn serialize(&self) -> Result<Map<String, Value>> {
        let mut record = Map::new();
        record.insert(COOKIES_KEY.to_string(), Value::String(self.cookie_jar().to_json()?));
        record.insert(VERSION_KEY.to_string(), Value::from(SNAPSHOT_VERSION));
        for field in SnapshotField::ALL {
            record.insert(field.key().to_string(), field.read(self));
        }
        debug!(cookies = self.cookie_jar().len(), "Serialized session state");
        Ok(record)
    }

    /// Restores the session from a record or JSON text.
    ///
    /// The cookie jar is rebuilt first, then every known key is assigned.
    /// Keys absent from the record leave the current value untouched; unknown
    /// keys are skipped. Nothing is modified if any value is invalid.
    ///
    /// # Errors
    /// Returns `IgError::InvalidState` if the input is not an object (or JSON
    /// text of one), the snapshot version is newer than supported, or a field
    /// or the cookie jar is malformed.
    pub fn deserialize<'a>(&mut self, source: impl Into<SnapshotSource<'a>>) -> Result<()> {
        let value = match source.into() {
            SnapshotSource::Text(text) => parse_text(text)?,
            SnapshotSource::Record(Value::String(text)) => parse_text(&text)?,
            SnapshotSource::Record(value) => value,
        };

        let Value::Object(mut record) = value else {
            debug!(kind = json_kind(&value), "State deserialization failed, object expected");
            return Err(IgError::InvalidState(
                "state isn't an object or serialized JSON".to_string(),
            ));
        };
        debug!(keys = ?record.keys().collect::<Vec<_>>(), "Deserializing session state");

        if let Some(version) = record.remove(VERSION_KEY) {
            match version.as_u64() {
                Some(v) if v <= SNAPSHOT_VERSION => {}
                _ => {
                    return Err(IgError::InvalidState(format!(
                        "unsupported snapshot version: {version}"
                    )))
                }
            }
        }

        let jar = match record.remove(COOKIES_KEY) {
            Some(cookies) => decode_jar(cookies)?,
            None => None,
        };

        let mut assignments = Vec::with_capacity(record.len());
        for (key, value) in &record {
            match SnapshotField::from_key(key) {
                Some(field) => assignments.push((field, field.decode(value)?)),
                None => warn!(key = %key, "Skipping unknown session field"),
            }
        }

        if let Some(jar) = jar {
            self.cookie_jar().restore(jar)?;
        }
        for (field, value) in assignments {
            field.write(self, value);
        }
        Ok(())
    }
}

fn parse_text(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| IgError::InvalidState(format!("state is not valid JSON: {e}")))
}

fn decode_jar(cookies: Value) -> Result<Option<SerializedJar>> {
    let jar = match cookies {
        Value::Null => return Ok(None),
        Value::String(text) if text.is_empty() => return Ok(None),
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    jar.map(Some).map_err(|e| IgError::InvalidState(format!("invalid cookie jar: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
