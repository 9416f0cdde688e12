//! Per-mode request header profiles
//!
//! Each request mode has an explicit profile whose fields are derived from
//! the session at send time; nothing is cached. Final headers are merged with
//! the precedence *caller > mode profile > configured baseline*, comparing
//! header names case-insensitively.
//!
//! The service's required header set is unstable; revalidate these profiles
//! against the live service before relying on them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use igsession_domain::constants::{
    COOKIE_MACHINE_ID, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_WWW_CLAIM, FB_HTTP_ENGINE,
};
use igsession_domain::{ClientConfig, IgError, Result, SessionState};
use rand::Rng;

/// Headers for web-mode requests (CSRF based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebHeaders {
    pub user_agent: String,
    pub accept_language: String,
    pub ig_www_claim: String,
    pub csrf_token: String,
    pub app_id: String,
    pub origin: String,
    pub referer: String,
}

impl WebHeaders {
    pub fn from_state(state: &SessionState, config: &ClientConfig) -> Self {
        let accept_language = if state.language.is_empty() {
            DEFAULT_ACCEPT_LANGUAGE.to_string()
        } else {
            state.language.clone()
        };

        Self {
            user_agent: config.web_user_agent.clone(),
            accept_language,
            ig_www_claim: state.ig_www_claim().unwrap_or(DEFAULT_WWW_CLAIM).to_string(),
            csrf_token: state.effective_csrf_token(),
            app_id: config.app_id.clone(),
            origin: config.web_base_url.trim_end_matches('/').to_string(),
            referer: state.host.clone(),
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept-Language", self.accept_language.clone()),
            ("sec-fetch-site", "same-origin".to_string()),
            ("sec-fetch-mode", "cors".to_string()),
            ("sec-fetch-dest", "empty".to_string()),
            ("X-Requested-With", "XMLHttpRequest".to_string()),
            ("X-IG-WWW-Claim", self.ig_www_claim.clone()),
            ("X-Instagram-AJAX", "1".to_string()),
            ("X-CSRFToken", self.csrf_token.clone()),
            ("X-IG-App-ID", self.app_id.clone()),
            ("Origin", self.origin.clone()),
            ("Referer", self.referer.clone()),
        ]
    }
}

/// Headers for app-mode requests (authorization based, device telemetry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppHeaders {
    pub user_agent: String,
    pub locale: String,
    /// Client clock in seconds with millisecond precision.
    pub raw_client_time: String,
    pub connection_speed_kbps: u32,
    pub mid: Option<String>,
    pub ig_www_claim: String,
    pub device_id: Option<String>,
    pub android_id: Option<String>,
    pub accept_language: String,
    pub authorization: Option<String>,
}

impl AppHeaders {
    pub fn from_state(state: &SessionState, config: &ClientConfig) -> Self {
        let speed = rand::thread_rng().gen_range(1000..=3700);
        Self::at(state, config, Utc::now(), speed)
    }

    /// Profile for a fixed clock reading and connection speed.
    pub fn at(
        state: &SessionState,
        config: &ClientConfig,
        now: DateTime<Utc>,
        connection_speed_kbps: u32,
    ) -> Self {
        Self {
            user_agent: config.app_user_agent.clone(),
            locale: state.language.clone(),
            raw_client_time: raw_client_time(now),
            connection_speed_kbps,
            mid: state.extract_cookie(COOKIE_MACHINE_ID).map(|cookie| cookie.value),
            ig_www_claim: state.ig_www_claim().unwrap_or(DEFAULT_WWW_CLAIM).to_string(),
            device_id: state.uuid.clone(),
            android_id: state.device_id.clone(),
            accept_language: state.language.replace('_', "-"),
            authorization: state.authorization().map(str::to_owned),
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("User-Agent", self.user_agent.clone()),
            ("X-Ads-Opt-Out", "0".to_string()),
            ("X-CM-Bandwidth-KBPS", "-1.000".to_string()),
            ("X-CM-Latency", "-1.000".to_string()),
            ("X-IG-App-Locale", self.locale.clone()),
            ("X-IG-Device-Locale", self.locale.clone()),
            ("X-Pigeon-Rawclienttime", self.raw_client_time.clone()),
            ("X-IG-Connection-Speed", format!("{}kbps", self.connection_speed_kbps)),
            ("X-IG-Bandwidth-Speed-KBPS", "-1.000".to_string()),
            ("X-IG-Bandwidth-TotalBytes-B", "0".to_string()),
            ("X-IG-Bandwidth-TotalTime-MS", "0".to_string()),
            ("X-IG-WWW-Claim", self.ig_www_claim.clone()),
            ("Accept-Language", self.accept_language.clone()),
            ("X-FB-HTTP-Engine", FB_HTTP_ENGINE.to_string()),
        ];
        let optional = [
            ("X-MID", &self.mid),
            ("X-IG-Device-ID", &self.device_id),
            ("X-IG-Android-ID", &self.android_id),
            ("Authorization", &self.authorization),
        ];
        pairs.extend(optional.into_iter().filter_map(|(name, value)| Some((name, value.clone()?))));
        pairs
    }
}

fn raw_client_time(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    format!("{}.{:03}", millis.div_euclid(1000), millis.rem_euclid(1000))
}

/// Merges header layers; later layers override earlier ones per name.
///
/// # Errors
/// Returns `IgError::Config` for an invalid header name or value.
pub fn merge_headers(
    baseline: &BTreeMap<String, String>,
    mode: &[(&'static str, String)],
    caller: &[(String, String)],
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let layers = baseline
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain(mode.iter().map(|(name, value)| (*name, value.as_str())))
        .chain(caller.iter().map(|(name, value)| (name.as_str(), value.as_str())));

    for (name, value) in layers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| IgError::Config(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| IgError::Config(format!("invalid value for header '{name}': {e}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
