//! Session state
//!
//! [`SessionState`] holds everything that identifies one logical session:
//! the cookie jar, the CSRF override, header-issued credentials, checkpoint
//! data and a few configuration-like scalars. Identity values (CSRF token,
//! user id, username) are always derived from the jar on demand so they can
//! never go stale relative to it.
//!
//! Header-issued credentials are private and only change through
//! [`SessionState::apply`] (or a snapshot restore), which keeps them from
//! being invented locally.

use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::constants::{
    COOKIE_CSRF_TOKEN, COOKIE_USERNAME, COOKIE_USER_ID, MISSING_CSRF_TOKEN,
};
use crate::cookies::{Cookie, CookieJar};
use crate::errors::{IgError, Result};

/// Partial update derived from response headers.
///
/// `None` means "leave the field as it is"; a patch never clears a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub ig_www_claim: Option<String>,
    pub authorization: Option<String>,
    pub password_encryption_key_id: Option<String>,
    pub password_encryption_pub_key: Option<String>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.ig_www_claim.is_none()
            && self.authorization.is_none()
            && self.password_encryption_key_id.is_none()
            && self.password_encryption_pub_key.is_none()
    }

    /// Names of the fields this patch sets, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        [
            ("ig_www_claim", self.ig_www_claim.is_some()),
            ("authorization", self.authorization.is_some()),
            ("password_encryption_key_id", self.password_encryption_key_id.is_some()),
            ("password_encryption_pub_key", self.password_encryption_pub_key.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// All session-identifying data for one client.
#[derive(Debug)]
pub struct SessionState {
    cookie_jar: Arc<CookieJar>,

    pub language: String,
    /// Seconds east of UTC, as the service expects it.
    pub timezone_offset: String,
    pub proxy_url: Option<String>,
    /// Explicit CSRF override captured from a login/bootstrap flow.
    pub csrf_token: Option<String>,
    pub host: String,
    pub device_id: Option<String>,
    pub uuid: Option<String>,

    /// Verification payload stored when the service demands a checkpoint.
    pub checkpoint: Option<Value>,
    pub challenge: Option<Value>,

    pub(crate) ig_www_claim: Option<String>,
    pub(crate) authorization: Option<String>,
    pub(crate) password_encryption_key_id: Option<String>,
    pub(crate) password_encryption_pub_key: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl SessionState {
    /// Create a fresh session from client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            cookie_jar: Arc::new(CookieJar::new()),
            language: config.language.clone(),
            timezone_offset: Local::now().offset().local_minus_utc().to_string(),
            proxy_url: config.proxy_url.clone(),
            csrf_token: None,
            host: config.web_base_url.clone(),
            device_id: None,
            uuid: None,
            checkpoint: None,
            challenge: None,
            ig_www_claim: None,
            authorization: None,
            password_encryption_key_id: None,
            password_encryption_pub_key: None,
        }
    }

    /// Shared handle to the cookie jar, for the HTTP transport.
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.cookie_jar
    }

    pub fn ig_www_claim(&self) -> Option<&str> {
        self.ig_www_claim.as_deref()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn password_encryption_key_id(&self) -> Option<&str> {
        self.password_encryption_key_id.as_deref()
    }

    pub fn password_encryption_pub_key(&self) -> Option<&str> {
        self.password_encryption_pub_key.as_deref()
    }

    /// The session host as a URL.
    ///
    /// # Errors
    /// Returns `IgError::InvalidState` when `host` is not an absolute URL.
    pub fn host_url(&self) -> Result<Url> {
        Url::parse(&self.host)
            .map_err(|e| IgError::InvalidState(format!("invalid session host '{}': {e}", self.host)))
    }

    /// Looks up a live cookie by name, scoped to `host`.
    pub fn extract_cookie(&self, name: &str) -> Option<Cookie> {
        self.cookie_jar.get(&self.host_url().ok()?, name)
    }

    /// Looks up a cookie value by name, scoped to `host`.
    ///
    /// # Errors
    /// Returns `IgError::CookieNotFound` when no such cookie exists.
    pub fn extract_cookie_value(&self, name: &str) -> Result<String> {
        self.extract_cookie(name)
            .map(|cookie| cookie.value)
            .ok_or_else(|| IgError::CookieNotFound(name.to_string()))
    }

    pub fn cookie_csrf_token(&self) -> Option<String> {
        self.extract_cookie(COOKIE_CSRF_TOKEN).map(|cookie| cookie.value)
    }

    /// # Errors
    /// Returns `IgError::CookieNotFound` when the identity cookie is absent.
    pub fn cookie_user_id(&self) -> Result<String> {
        self.extract_cookie_value(COOKIE_USER_ID)
    }

    /// # Errors
    /// Returns `IgError::CookieNotFound` when the username cookie is absent.
    pub fn cookie_username(&self) -> Result<String> {
        self.extract_cookie_value(COOKIE_USERNAME)
    }

    /// CSRF token to send: the explicit override, else the cookie value,
    /// else the `"missing"` sentinel.
    pub fn effective_csrf_token(&self) -> String {
        self.csrf_token
            .clone()
            .or_else(|| self.cookie_csrf_token())
            .unwrap_or_else(|| MISSING_CSRF_TOKEN.to_string())
    }

    /// Current user id from the identity cookie.
    ///
    /// Without the cookie this falls back to the challenge value and then to a
    /// scalar checkpoint value. The fallback is best effort, not a verified
    /// identity.
    ///
    /// # Errors
    /// Returns `IgError::UserIdNotFound` when none of the sources are set.
    pub fn extract_user_id(&self) -> Result<String> {
        if let Ok(user_id) = self.cookie_user_id() {
            return Ok(user_id);
        }
        [self.challenge.as_ref(), self.checkpoint.as_ref()]
            .into_iter()
            .flatten()
            .find_map(scalar_to_string)
            .ok_or(IgError::UserIdNotFound)
    }

    /// Drops every cookie, e.g. before a fresh login.
    pub fn clear_cookies(&self) {
        self.cookie_jar.clear();
    }

    /// Applies a header-derived patch in one step.
    ///
    /// Concurrent responses apply their patches in completion order, so the
    /// last response to complete wins for each field.
    pub fn apply(&mut self, patch: SessionPatch) {
        let SessionPatch {
            ig_www_claim,
            authorization,
            password_encryption_key_id,
            password_encryption_pub_key,
        } = patch;

        if ig_www_claim.is_some() {
            self.ig_www_claim = ig_www_claim;
        }
        if authorization.is_some() {
            self.authorization = authorization;
        }
        if password_encryption_key_id.is_some() {
            self.password_encryption_key_id = password_encryption_key_id;
        }
        if password_encryption_pub_key.is_some() {
            self.password_encryption_pub_key = password_encryption_pub_key;
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
