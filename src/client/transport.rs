//! HTTP transport seam and its reqwest implementation

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::envelope::{HttpMethod, RawResponse, RequestEnvelope};
use super::{ApiError, ApiResult};

/// How a transport attempt failed before a response was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// Timed out after the request may have been sent
    Timeout,
    /// Connection refused or unreachable; nothing was sent
    Connect,
    /// Any other I/O failure
    Network,
}

/// Failure of a single send attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    /// Failure kind
    pub kind: TransportFailureKind,
    /// Underlying error text
    pub message: String,
}

impl TransportFailure {
    /// Build a failure
    pub fn new(kind: TransportFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        // connect timeouts also report is_timeout; nothing was sent in that case
        let kind = if err.is_connect() {
            TransportFailureKind::Connect
        } else if err.is_timeout() {
            TransportFailureKind::Timeout
        } else {
            TransportFailureKind::Network
        };
        Self::new(kind, err.to_string())
    }
}

/// Sends one request envelope and returns the raw exchange.
///
/// Implementations perform exactly one attempt. Pacing and retries live in
/// [`RetryingTransport`](super::http::RetryingTransport).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the envelope once
    async fn send(&self, envelope: &RequestEnvelope) -> Result<RawResponse, TransportFailure>;
}

/// Resolved API credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal API token (`pk_...`) or OAuth access token
    ApiToken(String),
    /// OAuth application credentials
    ClientCredentials {
        /// Application client id
        client_id: String,
        /// Application client secret
        client_secret: String,
    },
}

impl Credentials {
    /// Token credentials
    pub fn api_token(token: impl Into<String>) -> Self {
        Self::ApiToken(token.into())
    }

    /// Client id and secret
    pub fn client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Value of the `Authorization` header.
    ///
    /// ClickUp takes the raw token, without a `Bearer` prefix. Without the
    /// authorization-code flow the client secret is sent in its place.
    pub fn authorization(&self) -> &str {
        match self {
            Self::ApiToken(token) => token,
            Self::ClientCredentials { client_secret, .. } => client_secret,
        }
    }

    /// Human-readable credential type
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ApiToken(_) => "API token",
            Self::ClientCredentials { .. } => "OAuth client credentials",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiToken(_) => f.debug_tuple("ApiToken").field(&"<redacted>").finish(),
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// reqwest-backed transport with connect and request timeouts
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ReqwestTransport {
    /// Build a transport for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("clickup-toolkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                attempts: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, envelope: &RequestEnvelope) -> Result<RawResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, envelope.path);
        let method = match envelope.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        debug!(method = %envelope.method, url = %url, params = envelope.query.len(), "Sending request");

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, self.credentials.authorization())
            .header(CONTENT_TYPE, "application/json");
        if !envelope.query.is_empty() {
            request = request.query(&envelope.query);
        }
        if let Some(body) = &envelope.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(TransportFailure::from_reqwest)?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // the request already reached the server; a body read failure is never `Connect`
        let body = response.text().await.map_err(|e| {
            TransportFailure::new(
                if e.is_timeout() {
                    TransportFailureKind::Timeout
                } else {
                    TransportFailureKind::Network
                },
                e.to_string(),
            )
        })?;

        Ok(RawResponse::new(status, headers, body))
    }
}
