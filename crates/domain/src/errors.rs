//! Error types used throughout the session core
//!
//! [`IgError`] is the public taxonomy. Every failed response is mapped into
//! exactly one variant by the classifier, so callers can match on the kind
//! without inspecting status codes or body fields themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Snapshot of a failed response, kept on classified errors for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDetails {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub status_text: String,
    /// The body's `message` field, when it is a string.
    pub message: Option<String>,
    /// Decoded body, or the raw text as a JSON string when it was not JSON.
    pub body: Value,
}

impl ResponseDetails {
    /// Build details from the request line, status and decoded body.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        body: Value,
    ) -> Self {
        let message = body.get("message").and_then(Value::as_str).map(str::to_owned);
        Self {
            method: method.into(),
            path: path.into(),
            status,
            status_text: status_text.into(),
            message,
            body,
        }
    }
}

impl fmt::Display for ResponseDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} - {} {}; {}",
            self.method,
            self.path,
            self.status,
            self.status_text,
            self.message.as_deref().unwrap_or_default()
        )
    }
}

/// Coarse error kinds, one per taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgErrorKind {
    Network,
    Response,
    NotFound,
    LoginRequired,
    RequestsLimit,
    ActionSpam,
    CheckpointRequired,
    InactiveUser,
    TwoFactorRequired,
    BadPassword,
    CookieNotFound,
    UserIdNotFound,
    InvalidState,
    Decode,
    Config,
    Storage,
}

/// Main error type for the session core
#[derive(Error, Debug, Clone)]
pub enum IgError {
    #[error("Network error after {attempts} attempt(s): {cause}")]
    Network { attempts: u32, cause: String },

    #[error("Response error: {0}")]
    Response(Box<ResponseDetails>),

    #[error("Not found: {0}")]
    NotFound(Box<ResponseDetails>),

    #[error("Login required: {0}")]
    LoginRequired(Box<ResponseDetails>),

    #[error("Requests limit reached: {0}")]
    RequestsLimit(Box<ResponseDetails>),

    #[error("Action blocked as spam: {0}")]
    ActionSpam(Box<ResponseDetails>),

    /// The body is the challenge payload the service returned.
    #[error("Checkpoint required: {0}")]
    CheckpointRequired(Box<ResponseDetails>),

    #[error("Inactive user: {0}")]
    InactiveUser(Box<ResponseDetails>),

    #[error("Two-factor authentication required: {0}")]
    TwoFactorRequired(Box<ResponseDetails>),

    #[error("Bad password: {0}")]
    BadPassword(Box<ResponseDetails>),

    #[error("Cookie not found: {0}")]
    CookieNotFound(String),

    #[error("User id not found")]
    UserIdNotFound,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl IgError {
    /// Get the kind of this error
    pub fn kind(&self) -> IgErrorKind {
        match self {
            Self::Network { .. } => IgErrorKind::Network,
            Self::Response(_) => IgErrorKind::Response,
            Self::NotFound(_) => IgErrorKind::NotFound,
            Self::LoginRequired(_) => IgErrorKind::LoginRequired,
            Self::RequestsLimit(_) => IgErrorKind::RequestsLimit,
            Self::ActionSpam(_) => IgErrorKind::ActionSpam,
            Self::CheckpointRequired(_) => IgErrorKind::CheckpointRequired,
            Self::InactiveUser(_) => IgErrorKind::InactiveUser,
            Self::TwoFactorRequired(_) => IgErrorKind::TwoFactorRequired,
            Self::BadPassword(_) => IgErrorKind::BadPassword,
            Self::CookieNotFound(_) => IgErrorKind::CookieNotFound,
            Self::UserIdNotFound => IgErrorKind::UserIdNotFound,
            Self::InvalidState(_) => IgErrorKind::InvalidState,
            Self::Decode(_) => IgErrorKind::Decode,
            Self::Config(_) => IgErrorKind::Config,
            Self::Storage(_) => IgErrorKind::Storage,
        }
    }

    /// Response snapshot for errors produced from an HTTP response.
    pub fn response(&self) -> Option<&ResponseDetails> {
        match self {
            Self::Response(details)
            | Self::NotFound(details)
            | Self::LoginRequired(details)
            | Self::RequestsLimit(details)
            | Self::ActionSpam(details)
            | Self::CheckpointRequired(details)
            | Self::InactiveUser(details)
            | Self::TwoFactorRequired(details)
            | Self::BadPassword(details) => Some(details),
            _ => None,
        }
    }

    /// Whether the error came out of the response classifier (or the
    /// web-path password check) rather than from local state or I/O.
    pub fn is_classified(&self) -> bool {
        self.response().is_some()
    }
}

/// Result type alias for session core operations
pub type Result<T> = std::result::Result<T, IgError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn response_details_display_includes_message() {
        let details = ResponseDetails::new(
            "GET",
            "/api/v1/users/1/info/",
            400,
            "Bad Request",
            json!({"message": "feedback_required", "status": "fail"}),
        );

        assert_eq!(details.message.as_deref(), Some("feedback_required"));
        assert_eq!(
            details.to_string(),
            "GET /api/v1/users/1/info/ - 400 Bad Request; feedback_required"
        );
    }

    #[test]
    fn response_details_without_message() {
        let details = ResponseDetails::new("POST", "/x/", 500, "Internal Server Error", json!("oops"));

        assert!(details.message.is_none());
        assert!(details.to_string().ends_with("Internal Server Error; "));
    }

    #[test]
    fn kinds_and_response_accessors() {
        let details = Box::new(ResponseDetails::new("GET", "/", 404, "Not Found", Value::Null));

        let not_found = IgError::NotFound(details);
        assert_eq!(not_found.kind(), IgErrorKind::NotFound);
        assert!(not_found.is_classified());
        assert_eq!(not_found.response().map(|r| r.status), Some(404));

        let missing = IgError::CookieNotFound("csrftoken".into());
        assert_eq!(missing.kind(), IgErrorKind::CookieNotFound);
        assert!(!missing.is_classified());
        assert_eq!(missing.to_string(), "Cookie not found: csrftoken");

        let network = IgError::Network { attempts: 3, cause: "connection refused".into() };
        assert_eq!(network.kind(), IgErrorKind::Network);
        assert!(network.response().is_none());
    }
}
