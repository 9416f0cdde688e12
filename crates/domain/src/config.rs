//! Client configuration structures

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_HOST, DEFAULT_APP_USER_AGENT, DEFAULT_LANGUAGE, DEFAULT_WEB_USER_AGENT, WEB_APP_ID,
    WEB_HOST,
};

/// Baseline configuration shared by both request modes.
///
/// Every field has a default, so partial JSON/TOML files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL for web-mode requests; also the session host.
    pub web_base_url: String,
    /// Base URL for app-mode requests.
    pub app_base_url: String,
    pub language: String,
    pub proxy_url: Option<String>,
    /// Total attempts per call at the transport level (1 = no retry).
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    /// Per-request deadline; `None` leaves it to the underlying transport.
    pub request_timeout_secs: Option<u64>,
    /// The legacy service infrastructure needs lenient TLS.
    pub accept_invalid_certs: bool,
    pub gzip: bool,
    pub web_user_agent: String,
    pub app_user_agent: String,
    pub app_id: String,
    /// Baseline headers, overridden by per-mode defaults and caller headers.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            web_base_url: WEB_HOST.to_string(),
            app_base_url: APP_HOST.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            proxy_url: None,
            max_attempts: 1,
            base_backoff_ms: 200,
            request_timeout_secs: None,
            accept_invalid_certs: true,
            gzip: true,
            web_user_agent: DEFAULT_WEB_USER_AGENT.to_string(),
            app_user_agent: DEFAULT_APP_USER_AGENT.to_string(),
            app_id: WEB_APP_ID.to_string(),
            extra_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
