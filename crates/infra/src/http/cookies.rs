//! Cookie store adapter
//!
//! Lets reqwest read and write the session's [`CookieJar`] directly, so the
//! jar stays the single source of truth for identity cookies.

use std::sync::Arc;

use igsession_domain::CookieJar;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use url::Url;

/// [`CookieStore`] backed by a shared session cookie jar.
#[derive(Debug, Clone)]
pub struct SessionCookieStore {
    jar: Arc<CookieJar>,
}

impl SessionCookieStore {
    pub fn new(jar: Arc<CookieJar>) -> Self {
        Self { jar }
    }
}

impl CookieStore for SessionCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        // All cookies of one response are stored under a single jar lock.
        let headers: Vec<&str> = cookie_headers.filter_map(|value| value.to_str().ok()).collect();
        self.jar.store_response_cookies(url, headers);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.request_header(url).and_then(|header| HeaderValue::from_str(&header).ok())
    }
}
