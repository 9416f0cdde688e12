//! Session cookie jar
//!
//! The jar owns every cookie the service hands out and is the single source
//! of truth for identity-bearing values (CSRF token, user id, username). It is
//! shared between the session state and the HTTP transport behind an `Arc`,
//! and is internally synchronized, so both sides only ever need `&self`.
//!
//! Parsing follows the subset of RFC 6265 the service actually uses:
//! `Path`, `Domain`, `Expires`, `Max-Age`, `Secure`, `HttpOnly` and
//! `SameSite`. Cookies are keyed by `(domain, path, name)`; a newer cookie
//! with the same key replaces the older one.
//!
//! ```rust,ignore
//! let jar = CookieJar::new();
//! let url = Url::parse("https://www.instagram.com/")?;
//! jar.store_set_cookie("csrftoken=abc; Path=/; Secure", &url);
//! assert_eq!(jar.get(&url, "csrftoken").map(|c| c.value), Some("abc".into()));
//! ```

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{IgError, Result};

/// Version tag written into every serialized jar.
pub const JAR_FORMAT_VERSION: &str = "igsession-jar/1";

/// A cookie as stored and serialized by the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Lowercase domain without a leading dot.
    pub domain: String,

    /// `true` when the cookie had no `Domain` attribute and only matches the
    /// exact host that set it.
    #[serde(default)]
    pub host_only: bool,

    pub path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    /// `"Strict"`, `"Lax"` or `"None"` when the server sent one.
    #[serde(default)]
    pub same_site: Option<String>,

    /// Expiry instant; session cookies have `None`.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,

    pub creation: DateTime<Utc>,
}

impl Cookie {
    /// Parse a single `Set-Cookie` header value received from `url`.
    ///
    /// Returns `None` for malformed headers and for cookies whose `Domain`
    /// attribute does not cover the responding host or names a bare
    /// top-level label such as `com`. An `Expires` value in none of the
    /// supported date forms is ignored, leaving a session cookie.
    pub fn parse(header: &str, url: &Url) -> Option<Self> {
        Self::parse_at(header, url, Utc::now())
    }

    fn parse_at(header: &str, url: &Url, now: DateTime<Utc>) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain: host.clone(),
            host_only: true,
            path: default_path(url),
            secure: false,
            http_only: false,
            same_site: None,
            expires: None,
            creation: now,
        };
        let mut max_age: Option<i64> = None;

        for part in parts {
            let part = part.trim();
            let (key, val) = part.split_once('=').map_or((part, ""), |(k, v)| (k.trim(), v.trim()));

            match key.to_ascii_lowercase().as_str() {
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    let single_label = !domain.contains('.') && domain != host;
                    if single_label || !domain_matches(&host, &domain) {
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "expires" => cookie.expires = parse_cookie_date(val),
                "max-age" => max_age = val.parse().ok(),
                "samesite" => {
                    cookie.same_site = Some(if val.eq_ignore_ascii_case("lax") {
                        "Lax".to_string()
                    } else if val.eq_ignore_ascii_case("strict") {
                        "Strict".to_string()
                    } else if val.eq_ignore_ascii_case("none") {
                        "None".to_string()
                    } else {
                        val.to_string()
                    });
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        // Max-Age wins over Expires.
        if let Some(seconds) = max_age {
            cookie.expires = Some(if seconds <= 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                Duration::try_seconds(seconds)
                    .and_then(|delta| now.checked_add_signed(delta))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            });
        }

        Some(cookie)
    }

    /// Whether the cookie has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Whether the cookie should be sent to `url` at `now`.
    pub fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let domain_ok = if self.host_only { host == self.domain } else { domain_matches(&host, &self.domain) };

        domain_ok
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired_at(now)
    }

    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Portable form of the whole jar, serialized independently of the rest of
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedJar {
    pub version: String,
    pub cookies: Vec<Cookie>,
}

/// In-memory cookie jar shared by the session and the transport.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<Cookie>>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one `Set-Cookie` header value received from `url`.
    ///
    /// An already-expired cookie removes any stored cookie with the same key.
    pub fn store_set_cookie(&self, header: &str, url: &Url) {
        let now = Utc::now();
        if let Some(cookie) = Cookie::parse_at(header, url, now) {
            self.upsert(cookie, now);
        }
    }

    /// Stores every `Set-Cookie` header value of a response.
    pub fn store_response_cookies<'a, I>(&self, url: &Url, headers: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now = Utc::now();
        let parsed: Vec<Cookie> =
            headers.into_iter().filter_map(|header| Cookie::parse_at(header, url, now)).collect();
        if parsed.is_empty() {
            return;
        }

        // One lock for the whole response so a response's cookies land together.
        let mut cookies = self.cookies.write();
        for cookie in parsed {
            Self::upsert_locked(&mut cookies, cookie, now);
        }
    }

    /// All live cookies that would be sent to `url`.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<Cookie> {
        let now = Utc::now();
        let mut matched: Vec<Cookie> =
            self.cookies.read().iter().filter(|c| c.matches(url, now)).cloned().collect();
        // RFC 6265 5.4: longer paths first, then older cookies first.
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()).then(a.creation.cmp(&b.creation)));
        matched
    }

    /// The `Cookie` request header value for `url`, if any cookie matches.
    pub fn request_header(&self, url: &Url) -> Option<String> {
        let header = self
            .cookies_for_url(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    /// Looks up a live cookie named `name` that applies to `url`.
    pub fn get(&self, url: &Url, name: &str) -> Option<Cookie> {
        self.cookies_for_url(url).into_iter().find(|c| c.name == name)
    }

    /// Removes all cookies.
    pub fn clear(&self) {
        self.cookies.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }

    /// Snapshot of the jar, expired cookies dropped.
    pub fn snapshot(&self) -> SerializedJar {
        let now = Utc::now();
        SerializedJar {
            version: JAR_FORMAT_VERSION.to_string(),
            cookies: self.cookies.read().iter().filter(|c| !c.is_expired_at(now)).cloned().collect(),
        }
    }

    /// Replaces the jar contents with a snapshot.
    ///
    /// The jar keeps its identity, so transports holding it see the new
    /// cookies immediately.
    ///
    /// # Errors
    /// Returns `IgError::InvalidState` for an unknown jar format version.
    pub fn restore(&self, jar: SerializedJar) -> Result<()> {
        if jar.version != JAR_FORMAT_VERSION {
            return Err(IgError::InvalidState(format!(
                "unsupported cookie jar version: {}",
                jar.version
            )));
        }
        *self.cookies.write() = jar.cookies;
        Ok(())
    }

    /// Serializes the jar to JSON text.
    ///
    /// # Errors
    /// Returns `IgError::InvalidState` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot())
            .map_err(|e| IgError::InvalidState(format!("failed to serialize cookie jar: {e}")))
    }

    fn upsert(&self, cookie: Cookie, now: DateTime<Utc>) {
        Self::upsert_locked(&mut self.cookies.write(), cookie, now);
    }

    fn upsert_locked(cookies: &mut Vec<Cookie>, cookie: Cookie, now: DateTime<Utc>) {
        let existing = cookies.iter().position(|c| c.same_key(&cookie));

        if cookie.is_expired_at(now) {
            if let Some(index) = existing {
                cookies.remove(index);
            }
            return;
        }

        match existing {
            Some(index) => {
                // Keep the original creation time, as browsers do.
                let creation = cookies[index].creation;
                cookies[index] = Cookie { creation, ..cookie };
            }
            None => cookies.push(cookie),
        }
    }
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() && path.starts_with('/') => dir.to_string(),
        _ => "/".to_string(),
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Parses the date forms seen in `Expires`: RFC 1123, the Netscape
/// `19-Oct-2027` variant, RFC 850 and asctime. All are read as GMT.
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc2822(&value.replace('-', " ")))
    {
        return Some(dt.with_timezone(&Utc));
    }

    // asctime pads single-digit days with a space: "Sun Nov  6 08:49:37 1994".
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, "%A, %d-%b-%y %H:%M:%S GMT")
        .or_else(|_| NaiveDateTime::parse_from_str(&collapsed, "%a %b %e %H:%M:%S %Y"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn web() -> Url {
        Url::parse("https://www.instagram.com/accounts/login/ajax/").unwrap()
    }

    #[test]
    fn parses_attributes() {
        let cookie = Cookie::parse(
            "csrftoken=abc123; Domain=.instagram.com; Path=/; Secure; HttpOnly; SameSite=lax",
            &web(),
        )
        .unwrap();

        assert_eq!(cookie.name, "csrftoken");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, "instagram.com");
        assert!(!cookie.host_only);
        assert_eq!(cookie.path, "/");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
    }

    #[test]
    fn single_label_domain_is_rejected() {
        assert!(Cookie::parse("mid=x; Domain=com; Path=/", &web()).is_none());
        assert!(Cookie::parse("mid=x; Domain=.com; Path=/", &web()).is_none());

        let local = Url::parse("http://localhost:8080/").unwrap();
        let cookie = Cookie::parse("mid=x; Domain=localhost; Path=/", &local).unwrap();
        assert_eq!(cookie.domain, "localhost");
    }

    #[test]
    fn default_path_comes_from_request_directory() {
        let cookie = Cookie::parse("rur=FRC", &web()).unwrap();
        assert_eq!(cookie.path, "/accounts/login/ajax");
        assert!(cookie.host_only);
        assert_eq!(cookie.domain, "www.instagram.com");
    }

    #[test]
    fn rejects_foreign_domain_and_malformed_headers() {
        assert!(Cookie::parse("a=b; Domain=example.com", &web()).is_none());
        assert!(Cookie::parse("novalue", &web()).is_none());
        assert!(Cookie::parse("=value", &web()).is_none());
    }

    #[test]
    fn parent_domain_cookie_is_visible_to_sibling_hosts() {
        let jar = CookieJar::new();
        let app = Url::parse("https://i.instagram.com/api/v1/").unwrap();
        jar.store_set_cookie("mid=XYZ; Domain=.instagram.com; Path=/", &app);

        let www = Url::parse("https://www.instagram.com/").unwrap();
        assert_eq!(jar.get(&www, "mid").map(|c| c.value), Some("XYZ".to_string()));
    }

    #[test]
    fn host_only_cookie_is_not_sent_to_other_hosts() {
        let jar = CookieJar::new();
        let app = Url::parse("https://i.instagram.com/").unwrap();
        jar.store_set_cookie("sessionid=s1; Path=/", &app);

        let www = Url::parse("https://www.instagram.com/").unwrap();
        assert!(jar.get(&www, "sessionid").is_none());
        assert!(jar.get(&app, "sessionid").is_some());
    }

    #[test]
    fn secure_cookie_requires_https() {
        let jar = CookieJar::new();
        let https = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("s=1; Path=/; Secure", &https);

        let http = Url::parse("http://www.instagram.com/").unwrap();
        assert!(jar.request_header(&http).is_none());
        assert_eq!(jar.request_header(&https).as_deref(), Some("s=1"));
    }

    #[test]
    fn path_matching_respects_segment_boundaries() {
        assert!(path_matches("/accounts/login", "/accounts"));
        assert!(path_matches("/accounts/", "/accounts/"));
        assert!(!path_matches("/accountsx", "/accounts"));
        assert!(path_matches("/anything", "/"));
    }

    #[test]
    fn replaces_cookie_with_same_key() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("csrftoken=old; Path=/", &url);
        jar.store_set_cookie("csrftoken=new; Path=/", &url);

        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get(&url, "csrftoken").unwrap().value, "new");
    }

    #[test]
    fn max_age_zero_deletes_cookie() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("sessionid=s1; Path=/", &url);
        jar.store_set_cookie("sessionid=\"\"; Path=/; Max-Age=0", &url);

        assert!(jar.is_empty());
    }

    #[test]
    fn huge_max_age_saturates_instead_of_overflowing() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("mid=a; Path=/; Max-Age=9223372036854775807", &url);
        jar.store_set_cookie("rur=b; Path=/; Max-Age=99999999999999", &url);

        let mid = jar.get(&url, "mid").unwrap();
        assert_eq!(mid.expires, Some(DateTime::<Utc>::MAX_UTC));
        let rur = jar.get(&url, "rur").unwrap();
        assert_eq!(rur.expires, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn past_expires_is_not_returned() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("old=1; Path=/; Expires=Thu, 01-Jan-1970 00:00:01 GMT", &url);

        assert!(jar.get(&url, "old").is_none());
    }

    #[test]
    fn future_expires_is_parsed() {
        let url = Url::parse("https://www.instagram.com/").unwrap();
        let cookie = Cookie::parse("ig_did=1; Path=/; Expires=Tue, 19 Oct 2100 10:00:00 GMT", &url)
            .unwrap();

        assert!(cookie.expires.is_some());
        assert!(!cookie.is_expired_at(Utc::now()));
    }

    #[test]
    fn asctime_expires_in_the_past_deletes_cookie() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_set_cookie("sessionid=s1; Path=/", &url);
        jar.store_set_cookie("sessionid=; Path=/; Expires=Sun Nov  6 08:49:37 1994", &url);

        assert!(jar.is_empty());
    }

    #[test]
    fn rfc850_expires_is_parsed() {
        let url = Url::parse("https://www.instagram.com/").unwrap();
        let cookie =
            Cookie::parse("old=1; Path=/; Expires=Sunday, 06-Nov-94 08:49:37 GMT", &url).unwrap();

        assert_eq!(cookie.expires, Some(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()));
    }

    #[test]
    fn unparseable_expires_leaves_session_cookie() {
        let url = Url::parse("https://www.instagram.com/").unwrap();
        let cookie = Cookie::parse("ig_nrcb=1; Path=/; Expires=someday", &url).unwrap();

        assert!(cookie.expires.is_none());
    }

    #[test]
    fn request_header_orders_longer_paths_first() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/accounts/edit/").unwrap();
        jar.store_set_cookie("a=root; Path=/", &url);
        jar.store_set_cookie("b=deep; Path=/accounts", &url);

        assert_eq!(jar.request_header(&url).as_deref(), Some("b=deep; a=root"));
    }

    #[test]
    fn json_round_trip_keeps_cookies() {
        let jar = CookieJar::new();
        let url = Url::parse("https://www.instagram.com/").unwrap();
        jar.store_response_cookies(
            &url,
            ["csrftoken=abc; Path=/", "ds_user_id=42; Domain=.instagram.com; Path=/"],
        );

        let json = jar.to_json().unwrap();
        let restored = CookieJar::new();
        restored.restore(serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.snapshot(), jar.snapshot());
        assert_eq!(restored.get(&url, "ds_user_id").unwrap().value, "42");
    }

    #[test]
    fn restore_rejects_unknown_version() {
        let jar = CookieJar::new();
        let result = jar.restore(SerializedJar { version: "other/9".into(), cookies: vec![] });
        assert!(matches!(result, Err(IgError::InvalidState(_))));
    }
}
