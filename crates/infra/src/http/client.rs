use std::sync::Arc;
use std::time::Duration;

use igsession_domain::IgError;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client as ReqwestClient, Method, Proxy, RequestBuilder, StatusCode};
use tracing::debug;
use url::Url;

use super::cookies::SessionCookieStore;
use crate::errors::conversions::transport_cause;
use crate::errors::InfraError;

/// A fully received response.
///
/// The body is read inside the retry loop, so a connection dropped mid-body
/// counts as a failed attempt like any other transport failure.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

/// HTTP client with bounded retry on transport failures.
///
/// Any received response, whatever its status, is returned to the caller;
/// only failures to get a response are retried.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: u32,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the client cannot be built.
    pub fn new() -> Result<Self, IgError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// # Errors
    /// Returns `IgError::Network` once every attempt failed at the transport
    /// level, or `IgError::Config` if the request cannot be built.
    pub async fn send(&self, builder: RequestBuilder) -> Result<RawResponse, IgError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                IgError::Config("request body cannot be cloned; buffer the body to enable retries".into())
            })?;

            let request = cloned_builder.build().map_err(|err| IgError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt, %method, %url, "sending HTTP request");

            let err = match self.execute(request).await {
                Ok(response) => {
                    debug!(attempt, %method, %url, status = %response.status, "received HTTP response");
                    return Ok(response);
                }
                Err(err) => err,
            };

            debug!(attempt, %method, %url, error = %err, "HTTP request failed");
            if attempt < attempts && should_retry_error(&err) {
                self.sleep_with_backoff(attempt).await;
                continue;
            }
            return Err(IgError::Network { attempts: attempt, cause: transport_cause(&err) });
        }

        Err(IgError::Network {
            attempts,
            cause: "http client exhausted retries without producing a result".into(),
        })
    }

    async fn execute(&self, request: reqwest::Request) -> Result<RawResponse, reqwest::Error> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(RawResponse { status, url, headers, body })
    }

    fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8);
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: u32) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    max_attempts: u32,
    base_backoff: Duration,
    proxy_url: Option<String>,
    accept_invalid_certs: bool,
    gzip: bool,
    cookie_store: Option<Arc<SessionCookieStore>>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
            base_backoff: Duration::from_millis(200),
            proxy_url: None,
            accept_invalid_certs: false,
            gzip: true,
            cookie_store: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-request deadline; unset leaves it to the transport.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn proxy(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url;
        self
    }

    /// Accept invalid TLS certificates.
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Route cookies through a session jar.
    pub fn cookie_store(mut self, store: Arc<SessionCookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    /// # Errors
    /// Returns `IgError::Config` for an invalid proxy URL or when the TLS
    /// backend cannot be initialised.
    pub fn build(self) -> Result<HttpClient, IgError> {
        // Redirects stay visible so a 302 reaches the classifier.
        let mut builder = ReqwestClient::builder().redirect(Policy::none()).gzip(self.gzip);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match self.proxy_url.as_deref() {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url).map_err(|err| {
                    IgError::Config(format!("invalid proxy URL '{proxy_url}': {err}"))
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(store) = self.cookie_store {
            builder = builder.cookie_provider(store);
        }

        let client = builder
            .build()
            .map_err(|err| IgError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use igsession_domain::CookieJar;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_with_attempts(attempts: u32) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .expect("http client")
    }

    fn refused_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[tokio::test]
    async fn returns_successful_response_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_attempts(3);
        let url = Url::parse(&server.uri()).unwrap();
        let response = client.send(client.request(Method::GET, url)).await.expect("response");

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn does_not_retry_server_errors() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(503)
            })
            .mount(&server)
            .await;

        let client = client_with_attempts(3);
        let url = Url::parse(&server.uri()).unwrap();
        let response = client.send(client.request(Method::GET, url)).await.expect("response");

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/accounts/login/"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_attempts(1);
        let url = Url::parse(&server.uri()).unwrap();
        let response = client.send(client.request(Method::GET, url)).await.expect("response");
        assert_eq!(response.status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn network_failure_reports_attempts() {
        let client = client_with_attempts(3);
        let result = client.send(client.request(Method::GET, refused_url())).await;

        match result {
            Err(IgError::Network { attempts, cause }) => {
                assert_eq!(attempts, 3);
                assert!(cause.starts_with("connection failure"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let client = HttpClient::new().expect("http client");
        assert_eq!(client.max_attempts(), 1);

        let result = client.send(client.request(Method::GET, refused_url())).await;
        assert!(matches!(result, Err(IgError::Network { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn cookies_flow_through_session_jar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cookie", "sessionid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("with-cookie"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sessionid=abc; Path=/")
                    .set_body_string("set"),
            )
            .mount(&server)
            .await;

        let jar = Arc::new(CookieJar::new());
        let client = HttpClient::builder()
            .cookie_store(Arc::new(SessionCookieStore::new(Arc::clone(&jar))))
            .build()
            .expect("http client");
        let url = Url::parse(&server.uri()).unwrap();

        let first = client.send(client.request(Method::GET, url.clone())).await.unwrap();
        assert_eq!(first.body, "set");
        assert_eq!(jar.get(&url, "sessionid").map(|c| c.value).as_deref(), Some("abc"));

        let second = client.send(client.request(Method::GET, url)).await.unwrap();
        assert_eq!(second.body, "with-cookie");
    }

    #[test]
    fn invalid_proxy_is_config_error() {
        let result = HttpClient::builder().proxy(Some("http://[invalid".into())).build();
        assert!(matches!(result, Err(IgError::Config(_))));
    }

    #[test]
    fn backoff_doubles() {
        let client = HttpClient::builder().base_backoff(Duration::from_millis(100)).build().unwrap();
        assert_eq!(client.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(client.backoff_delay(3), Duration::from_millis(400));
    }
}
