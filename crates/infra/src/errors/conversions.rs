//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use igsession_domain::IgError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub IgError);

impl From<InfraError> for IgError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<IgError> for InfraError {
    fn from(value: IgError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → IgError */
/* -------------------------------------------------------------------------- */

/// Human-readable cause for a transport failure, used in `IgError::Network`.
pub fn transport_cause(err: &HttpError) -> String {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failure"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else if err.is_redirect() {
        "redirect failure"
    } else {
        "request failure"
    };
    format!("{kind}: {err}")
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_builder() {
            return Self(IgError::Config(format!("invalid HTTP request or client: {value}")));
        }
        Self(IgError::Network { attempts: 1, cause: transport_cause(&value) })
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → IgError */
/* -------------------------------------------------------------------------- */

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        let message = match value.kind() {
            ErrorKind::PermissionDenied => format!("permission denied: {value}"),
            ErrorKind::NotFound => format!("path not found: {value}"),
            _ => value.to_string(),
        };
        Self(IgError::Storage(message))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
