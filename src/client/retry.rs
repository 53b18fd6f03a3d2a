//! Failure classification and retry policy
//!
//! [`RetryPolicy::decide`] is a pure function of the attempt number, the
//! failure class and the envelope's retry safety. The transport loop owns all
//! sleeping, so the policy can be exercised without timers.

use rand::Rng;
use std::time::Duration;

use super::config::{backoff_between, DEFAULT_JITTER_MS, DEFAULT_MAX_RETRIES, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS};
use super::envelope::{RawResponse, RetrySafety};
use super::transport::{TransportFailure, TransportFailureKind};

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Request timed out after it may have reached the server
    Timeout,
    /// Connection could not be established; nothing was sent
    ConnectFailed,
    /// Other network failure after the request may have been sent
    Network,
    /// HTTP 429 with the service's `Retry-After` hint, if any
    RateLimited {
        /// Minimum wait requested by the service
        retry_after: Option<Duration>,
    },
    /// HTTP 5xx
    Server(u16),
    /// HTTP 400
    InvalidRequest,
    /// HTTP 401 / 403
    AuthFailed(u16),
    /// HTTP 404
    NotFound,
    /// Any other non-success status
    Client(u16),
}

impl FailureClass {
    /// Classify a non-success response. Returns `None` for 2xx.
    pub fn from_response(response: &RawResponse) -> Option<Self> {
        if response.is_success() {
            return None;
        }
        Some(match response.status {
            400 => Self::InvalidRequest,
            401 | 403 => Self::AuthFailed(response.status),
            404 => Self::NotFound,
            429 => Self::RateLimited {
                retry_after: response.retry_after(),
            },
            code if (500..600).contains(&code) => Self::Server(code),
            code => Self::Client(code),
        })
    }

    /// Classify a transport-level failure
    pub fn from_transport(failure: &TransportFailure) -> Self {
        match failure.kind {
            TransportFailureKind::Timeout => Self::Timeout,
            TransportFailureKind::Connect => Self::ConnectFailed,
            TransportFailureKind::Network => Self::Network,
        }
    }

    /// Short description used in retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "network timeout",
            Self::ConnectFailed => "connection failed",
            Self::Network => "network error",
            Self::RateLimited { .. } => "rate limit exceeded",
            Self::Server(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::InvalidRequest => "invalid request",
            Self::AuthFailed(401) => "authentication failed (401)",
            Self::AuthFailed(_) => "access denied (403)",
            Self::NotFound => "resource not found",
            Self::Client(_) => "client error",
        }
    }

    /// Suggested remediation shown after the final failure.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout => "Check your network connection or raise the request timeout",
            Self::ConnectFailed => "Verify internet connectivity and DNS resolution",
            Self::Network => "Check network connectivity and try again",
            Self::RateLimited { .. } => "Lower requests_per_minute or wait for the window to reset",
            Self::Server(_) => "ClickUp may be experiencing issues, try again later",
            Self::InvalidRequest => "Check the field values sent for this record",
            Self::AuthFailed(_) => "Verify the API token and its workspace permissions",
            Self::NotFound => "Check the id or alias; the entity may have been deleted",
            Self::Client(_) => "Review request parameters against the ClickUp API docs",
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectFailed
                | Self::Network
                | Self::RateLimited { .. }
                | Self::Server(_)
        )
    }

    /// Whether the request may have been processed by the server.
    ///
    /// Only a refused or unreachable connection proves nothing was sent.
    pub fn request_reached_server(&self) -> bool {
        !matches!(self, Self::ConnectFailed)
    }
}

/// Outcome of a retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Wait this long, then try again
    RetryAfter(Duration),
    /// Give up and surface the failure
    Fail,
}

/// Exponential backoff policy with jitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound of the exponential delay
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to each delay
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            jitter: Duration::from_millis(DEFAULT_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base and maximum delay
    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Disable jitter so decisions are fully deterministic
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed with `class`.
    pub fn decide(&self, attempt: u32, class: &FailureClass, safety: RetrySafety) -> RetryAction {
        if !class.is_transient() {
            return RetryAction::Fail;
        }
        if safety == RetrySafety::NonIdempotent && class.request_reached_server() {
            return RetryAction::Fail;
        }
        if attempt >= self.max_attempts() {
            return RetryAction::Fail;
        }

        let mut delay = backoff_between(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        );
        if !self.jitter.is_zero() {
            let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
            delay += Duration::from_millis(jitter_ms);
        }
        if let FailureClass::RateLimited {
            retry_after: Some(hint),
        } = class
        {
            delay = delay.max(*hint);
        }
        RetryAction::RetryAfter(delay)
    }
}

/// Context for formatting retry log messages.
#[derive(Debug, Clone)]
pub struct RetryContext<'a> {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Failure classification
    pub class: FailureClass,
    /// Wait before the next attempt
    pub backoff: Duration,
    /// `METHOD /path` of the request
    pub endpoint: &'a str,
    /// Last underlying error message
    pub message: &'a str,
}

impl RetryContext<'_> {
    /// One-line retry message.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.endpoint,
            self.attempt + 1,
            self.max_attempts,
            self.class.description(),
            self.backoff.as_secs_f64()
        )
    }

    /// Final failure summary with a remediation hint.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![format!(
            "[FAILED] {} failed after {} attempts",
            self.endpoint, self.attempt
        )];
        lines.push(format!("  Last error: {} ({})", self.message, self.class.description()));
        lines.push(format!("  Suggestion: {}", self.class.suggestion()));
        lines.join("\n")
    }
}
