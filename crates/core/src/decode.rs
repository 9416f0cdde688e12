//! Response body decoding
//!
//! Bodies are decoded as JSON with integer literals kept exact: any integer
//! outside the IEEE-754 safe range becomes a string of its digits, so
//! identifiers such as media ids survive a round trip through clients that
//! read numbers as doubles.

use igsession_domain::constants::MAX_SAFE_INTEGER;
use igsession_domain::{IgError, Result};
use serde_json::{Number, Value};
use tracing::debug;

/// Whether `status` is in the 2xx success range.
pub const fn is_success_status(status: u16) -> bool {
    status >= 200 && status < 300
}

/// Decodes a response body received with `status`.
///
/// Decoding failure is fatal for 2xx responses, since the caller expects a
/// parsed body. For any other status the raw text is kept as a JSON string so
/// the failure can still be classified.
///
/// # Errors
/// Returns `IgError::Decode` when a 2xx body is not valid JSON.
pub fn decode_body(status: u16, text: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(preserve_large_integers(value)),
        Err(e) if is_success_status(status) => {
            Err(IgError::Decode(format!("status {status}: {e}")))
        }
        Err(e) => {
            debug!(status, error = %e, "Keeping undecodable error body as text");
            Ok(Value::String(text.to_string()))
        }
    }
}

/// Replaces every unsafe integer in `value` with its digit string.
pub fn preserve_large_integers(value: Value) -> Value {
    match value {
        Value::Number(n) if is_unsafe_integer(&n) => Value::String(n.to_string()),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(preserve_large_integers).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter().map(|(key, value)| (key, preserve_large_integers(value))).collect(),
        ),
        other => other,
    }
}

/// An integer literal whose magnitude exceeds 2^53 - 1.
fn is_unsafe_integer(n: &Number) -> bool {
    if let Some(u) = n.as_u64() {
        return u > MAX_SAFE_INTEGER;
    }
    if let Some(i) = n.as_i64() {
        return i.unsigned_abs() > MAX_SAFE_INTEGER;
    }
    // Beyond 64 bits: still an integer if the literal is only digits.
    let text = n.to_string();
    let digits = text.strip_prefix('-').unwrap_or(&text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
