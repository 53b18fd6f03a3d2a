//! Request and response shapes exchanged with the transport

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::config::MAX_SERVER_WAIT;

/// HTTP method of a request envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Default retry safety for the method
    pub fn default_safety(&self) -> RetrySafety {
        match self {
            HttpMethod::Post => RetrySafety::NonIdempotent,
            HttpMethod::Get | HttpMethod::Put | HttpMethod::Delete => RetrySafety::Idempotent,
        }
    }
}

impl HttpMethod {
    /// Uppercase method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether repeating a request after it reached the server is safe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrySafety {
    /// Repeating the request has no additional effect
    Idempotent,
    /// Repeating the request may duplicate its effect (task creation)
    NonIdempotent,
}

/// Description of one remote operation.
///
/// Built per call by the resource client, executed by
/// [`RetryingTransport`](super::http::RetryingTransport) and then dropped.
/// Bulk dry-runs serialize envelopes as previews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEnvelope {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base, starting with `/`
    pub path: String,
    /// Query parameters in order; keys may repeat (`statuses[]`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    /// JSON body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Retry safety hint
    pub safety: RetrySafety,
}

impl RequestEnvelope {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            safety: method.default_safety(),
        }
    }

    /// GET envelope
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST envelope with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// PUT envelope with a JSON body
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    /// DELETE envelope
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Replace the body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append query parameters
    pub fn with_query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Opt a non-idempotent request into full retry.
    ///
    /// Only for callers that can tolerate a duplicate effect, e.g. a create
    /// whose earlier attempt is known not to have succeeded.
    pub fn allow_retry(mut self) -> Self {
        self.safety = RetrySafety::Idempotent;
        self
    }

    /// `METHOD /path` for logs
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Status, headers and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers with lowercase names
    pub headers: HashMap<String, String>,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Build a response, lowercasing header names
    pub fn new<I, K, V>(status: u16, headers: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body: body.into(),
        }
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Retry-After` in seconds, if present and numeric, capped at [`MAX_SERVER_WAIT`]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(|secs| Duration::from_secs(secs).min(MAX_SERVER_WAIT))
    }
}

/// Quota reported by the service on a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaTelemetry {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the window resets, relative to when the headers were read
    pub reset_in: Duration,
}

impl QuotaTelemetry {
    /// Parse `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`.
    ///
    /// `X-RateLimit-Reset` is a Unix timestamp in seconds. All three headers
    /// must be present and numeric; anything else yields `None` so the
    /// limiter falls back to its local counter. A reset in the past reads as
    /// zero; one further away than [`MAX_SERVER_WAIT`] is capped.
    pub fn from_headers(headers: &HashMap<String, String>, now: DateTime<Utc>) -> Option<Self> {
        let read = |name: &str| headers.get(name).and_then(|v| v.trim().parse::<i64>().ok());

        let limit = read("x-ratelimit-limit")?;
        let remaining = read("x-ratelimit-remaining")?;
        let reset_epoch = read("x-ratelimit-reset")?;
        if limit <= 0 || remaining < 0 {
            return None;
        }

        let reset_ms = reset_epoch
            .saturating_mul(1000)
            .saturating_sub(now.timestamp_millis())
            .max(0);
        Some(Self {
            limit: u32::try_from(limit).ok()?,
            remaining: u32::try_from(remaining).ok()?,
            reset_in: Duration::from_millis(reset_ms as u64).min(MAX_SERVER_WAIT),
        })
    }
}
