//! reqwest-backed [`Transport`] implementation.

use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Transport, Verb};

const USER_AGENT: &str = concat!("spm-core/", env!("CARGO_PKG_VERSION"));

/// Default request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout for the connection pool (seconds).
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Default maximum idle connections per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
    basic_auth: Option<(String, SecretString)>,
    token: Option<SecretString>,
    danger_accept_invalid_certs: bool,
}

impl HttpTransportBuilder {
    /// Creates a builder with default timeouts and pool settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT_SECS),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            basic_auth: None,
            token: None,
            danger_accept_invalid_certs: false,
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Overrides the maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Configures HTTP basic authentication.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.basic_auth = Some((username.into(), SecretString::from(password.into())));
        self
    }

    /// Configures an `X-Auth-Access-Token` header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Accepts self-signed manager certificates. Lab use only.
    #[must_use]
    pub const fn with_insecure_tls(mut self) -> Self {
        self.danger_accept_invalid_certs = true;
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the underlying HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<HttpTransport> {
        let http = ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpTransport {
            http,
            basic_auth: self.basic_auth,
            token: self.token,
        })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking-free HTTP transport over reqwest.
///
/// Performs exactly one round-trip per [`Transport::send`] call; retry and
/// backoff are deliberately absent from this layer.
pub struct HttpTransport {
    http: Client,
    basic_auth: Option<(String, SecretString)>,
    token: Option<SecretString>,
}

impl HttpTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, verb: Verb, url: String, body: Option<Value>) -> Result<Option<Value>> {
        let parsed = Url::parse(&url)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid URL `{url}`: {err}")))?;

        let method = match verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        };

        let mut request = self
            .http
            .request(method, parsed)
            .header("Accept", "application/json");
        if let Some((user, pass)) = &self.basic_auth {
            request = request.basic_auth(user, Some(pass.expose_secret()));
        }
        if let Some(token) = &self.token {
            request = request.header("X-Auth-Access-Token", token.expose_secret());
        }
        if let Some(payload) = &body {
            request = request.json(payload);
        }

        debug!(verb = %verb, url = %url, "manager request");

        let response = request.send().await.map_err(Error::from)?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::HttpError(format!("Failed to read response body: {err}")))?;

        if status.is_success() {
            if status == StatusCode::NO_CONTENT || bytes.is_empty() {
                return Ok(None);
            }
            let value: Value = serde_json::from_slice(&bytes).map_err(|err| {
                Error::ParseError(format!("Failed to parse response for `{url}`: {err}"))
            })?;
            return Ok(Some(value));
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        Err(match status {
            StatusCode::NOT_FOUND => Error::HttpError(format!("not found: {text}")),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::HttpError(format!("authentication failed: {text}"))
            }
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => {
                Error::ServiceUnavailable(format!("manager temporarily unavailable: {text}"))
            }
            status if status.is_server_error() => {
                Error::ServiceUnavailable(format!("manager server error {status}: {text}"))
            }
            _ => Error::HttpError(format!("manager error {status}: {text}")),
        })
    }
}
