//! Request descriptions and parsed responses

use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use igsession_domain::{IgError, Result};

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Url-encoded form fields.
    Form(Vec<(String, String)>),
    /// Payload signed and submitted as the `signed_body` form pair.
    Signed(Value),
    Json(Value),
}

/// Everything a caller specifies about one request.
///
/// `path_or_url` is joined to the mode's base URL unless it is absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path_or_url: String,
    pub query: Vec<(String, String)>,
    /// Caller headers; they override every default with the same name.
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestSpec {
    pub fn new(method: Method, path_or_url: impl Into<String>) -> Self {
        Self {
            method,
            path_or_url: path_or_url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path_or_url: impl Into<String>) -> Self {
        Self::new(Method::GET, path_or_url)
    }

    pub fn post(path_or_url: impl Into<String>) -> Self {
        Self::new(Method::POST, path_or_url)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body =
            RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn signed(mut self, payload: Value) -> Self {
        self.body = RequestBody::Signed(payload);
        self
    }

    pub fn json(mut self, payload: Value) -> Self {
        self.body = RequestBody::Json(payload);
        self
    }

    /// Resolves the target URL against `base_url` and appends the query.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the result is not a valid URL.
    pub fn resolve_url(&self, base_url: &str) -> Result<Url> {
        let target = &self.path_or_url;
        let raw = if target.starts_with("http://") || target.starts_with("https://") {
            target.clone()
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), target.trim_start_matches('/'))
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| IgError::Config(format!("invalid request URL '{raw}': {e}")))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// A successfully completed response with its decoded body.
#[derive(Debug, Clone)]
pub struct IgResponse {
    pub status: u16,
    pub status_text: String,
    pub url: Url,
    pub headers: HeaderMap,
    /// Decoded body; oversized integers are digit strings.
    pub body: Value,
}

impl IgResponse {
    /// Deserializes the body into `T`.
    ///
    /// # Errors
    /// Returns `IgError::Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| IgError::Decode(format!("unexpected body shape: {e}")))
    }
}
