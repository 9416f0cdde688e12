//! Session-aware transport for the web and app endpoints
//!
//! Every call follows the same pipeline: headers are derived from the
//! session, the request goes out through the retrying [`HttpClient`], the
//! response headers patch the session, the body is decoded and the outcome
//! is decided per mode. Failed responses are classified, published on the
//! error channel and returned to the caller.
//!
//! The session lock is only ever held for one read or one patch, never
//! across an await point.

use std::sync::Arc;

use igsession_core::{
    app_succeeded, classify_and_apply, decode_body, derive_state_update, merge_headers,
    web_outcome, AppHeaders, RequestSigner, SessionStore, WebHeaders, WebOutcome,
};
use igsession_domain::{ClientConfig, IgError, ResponseDetails, Result, SessionState};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::request::{IgResponse, RequestBody, RequestSpec};
use crate::http::{HttpClient, RawResponse, SessionCookieStore};

/// Buffered errors per subscriber before it starts lagging.
const ERROR_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Web,
    App { only_check_status: bool },
}

impl Mode {
    fn name(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::App { .. } => "app",
        }
    }
}

/// Client for both request modes, sharing one session.
///
/// Cloning is cheap; clones share the session, the connection pool and the
/// error channel.
#[derive(Clone)]
pub struct Transport {
    http: HttpClient,
    config: Arc<ClientConfig>,
    state: Arc<RwLock<SessionState>>,
    signer: Arc<RequestSigner>,
    errors: broadcast::Sender<IgError>,
}

impl Transport {
    /// Creates a transport with a fresh session.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let state = SessionState::from_config(&config);
        Self::with_state(config, state)
    }

    /// Creates a transport around an existing session.
    ///
    /// The proxy is taken from the session when the client is built; later
    /// changes to `proxy_url` need a new transport.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the HTTP client cannot be built.
    pub fn with_state(config: ClientConfig, state: SessionState) -> Result<Self> {
        let cookies = Arc::new(SessionCookieStore::new(Arc::clone(state.cookie_jar())));
        let proxy = state.proxy_url.clone().or_else(|| config.proxy_url.clone());

        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff())
            .proxy(proxy)
            .accept_invalid_certs(config.accept_invalid_certs)
            .gzip(config.gzip)
            .cookie_store(cookies)
            .build()?;

        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);

        info!(
            web_base_url = %config.web_base_url,
            app_base_url = %config.app_base_url,
            max_attempts = config.max_attempts,
            "Transport initialized"
        );

        Ok(Self {
            http,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(state)),
            signer: Arc::new(RequestSigner::standard()?),
            errors,
        })
    }

    /// Shared handle to the session.
    pub fn state(&self) -> Arc<RwLock<SessionState>> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribes to errors produced from failed responses.
    ///
    /// Only errors made from a response are published; network, decode and
    /// configuration errors go to the caller alone.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<IgError> {
        self.errors.subscribe()
    }

    /// Sends a web-mode request.
    ///
    /// # Errors
    /// Returns `IgError::BadPassword` when a 200 response carries a falsy
    /// `authenticated` field, a classified error for any other non-success
    /// response, or `Network`/`Decode`/`Config` for failures before a
    /// response could be judged.
    #[instrument(skip(self, spec), fields(method = %spec.method, path = %spec.path_or_url))]
    pub async fn send_web(&self, spec: RequestSpec) -> Result<IgResponse> {
        self.execute(Mode::Web, spec).await
    }

    /// Sends an app-mode request.
    ///
    /// With `only_check_status` a 200 is success whatever the body says;
    /// otherwise the body's `status` must be `"ok"`.
    ///
    /// # Errors
    /// Returns a classified error for a non-success response, or
    /// `Network`/`Decode`/`Config` for failures before a response could be
    /// judged.
    #[instrument(skip(self, spec), fields(method = %spec.method, path = %spec.path_or_url))]
    pub async fn send_app(&self, spec: RequestSpec, only_check_status: bool) -> Result<IgResponse> {
        self.execute(Mode::App { only_check_status }, spec).await
    }

    /// Serializes the session and hands it to `store`.
    ///
    /// # Errors
    /// Propagates serialization and store errors.
    pub async fn save_session(&self, store: &dyn SessionStore) -> Result<()> {
        let record = self.state.read().serialize()?;
        store.save(&record).await?;
        debug!("Session saved");
        Ok(())
    }

    /// Restores the session from `store`; returns `false` when nothing was
    /// stored.
    ///
    /// # Errors
    /// Propagates store errors and snapshot validation errors. A rejected
    /// snapshot leaves the session untouched.
    pub async fn restore_session(&self, store: &dyn SessionStore) -> Result<bool> {
        let Some(record) = store.load().await? else {
            debug!("No stored session");
            return Ok(false);
        };
        self.state.write().deserialize(record)?;
        info!("Session restored");
        Ok(true)
    }

    async fn execute(&self, mode: Mode, spec: RequestSpec) -> Result<IgResponse> {
        let headers = {
            let state = self.state.read();
            let profile = match mode {
                Mode::Web => WebHeaders::from_state(&state, &self.config).to_pairs(),
                Mode::App { .. } => AppHeaders::from_state(&state, &self.config).to_pairs(),
            };
            merge_headers(&self.config.extra_headers, &profile, &spec.headers)?
        };

        let base_url = match mode {
            Mode::Web => &self.config.web_base_url,
            Mode::App { .. } => &self.config.app_base_url,
        };
        let url = spec.resolve_url(base_url)?;
        let method = spec.method.clone();

        debug!(mode = mode.name(), %method, %url, "Sending request");

        let mut builder = self.http.request(method.clone(), url).headers(headers);
        builder = match &spec.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Signed(payload) => builder.form(&self.signer.sign(payload).form_fields()),
            RequestBody::Json(payload) => builder.json(payload),
        };

        let raw = self.http.send(builder).await?;
        self.apply_state_update(&raw);

        let status = raw.status.as_u16();
        let body = decode_body(status, &raw.body)?;
        let status_text = raw.status.canonical_reason().unwrap_or_default().to_string();
        let details = || {
            ResponseDetails::new(method.as_str(), raw.url.path(), status, status_text.clone(), body.clone())
        };

        match mode {
            Mode::Web => match web_outcome(status, &body) {
                WebOutcome::Success => {}
                WebOutcome::BadPassword => {
                    let err = IgError::BadPassword(Box::new(details()));
                    warn!(status, "Login rejected: bad password");
                    self.publish(&err);
                    return Err(err);
                }
                WebOutcome::Failure => return Err(self.fail(details())),
            },
            Mode::App { only_check_status } => {
                if !app_succeeded(status, &body, only_check_status) {
                    return Err(self.fail(details()));
                }
            }
        }

        debug!(status, "Request succeeded");
        Ok(IgResponse { status, status_text, url: raw.url, headers: raw.headers, body })
    }

    fn apply_state_update(&self, raw: &RawResponse) {
        let patch = derive_state_update(&raw.headers);
        if patch.is_empty() {
            return;
        }
        debug!(fields = ?patch.field_names(), "Applying session patch");
        self.state.write().apply(patch);
    }

    fn fail(&self, details: ResponseDetails) -> IgError {
        let classification = classify_and_apply(&mut self.state.write(), details);
        warn!(
            rule = classification.rule,
            error = %classification.error,
            "Request failed"
        );
        self.publish(&classification.error);
        classification.error
    }

    fn publish(&self, err: &IgError) {
        // Without subscribers the send fails; that is not an error.
        if self.errors.send(err.clone()).is_err() {
            debug!("No error subscribers");
        }
    }
}
