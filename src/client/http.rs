//! Retrying transport
//!
//! Wraps a single logical API call with:
//! - Rate limit reservation before every attempt
//! - Quota telemetry recording after every attempt, failures included
//! - Retry with exponential backoff driven by [`RetryPolicy`]
//! - Mapping of the final failure into an [`ApiError`]

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::envelope::{QuotaTelemetry, RawResponse, RequestEnvelope};
use super::parser::error_message;
use super::rate_limit::RateLimiter;
use super::retry::{FailureClass, RetryAction, RetryContext, RetryPolicy};
use super::transport::HttpTransport;
use super::{ApiError, ApiResult};
use crate::metrics::{self, HttpRequestMetrics};

/// The only component that talks to the network
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    /// Create a transport sharing `limiter` with every other transport in the process
    pub fn new(inner: Arc<dyn HttpTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            inner,
            limiter,
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of retries after the first attempt
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Shared rate limiter
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Execute an envelope, retrying transient failures the envelope's safety allows.
    ///
    /// Returns the first 2xx response. Every other outcome becomes a typed
    /// [`ApiError`]; raw transport errors never escape.
    pub async fn execute(&self, envelope: &RequestEnvelope) -> ApiResult<RawResponse> {
        let clock = self.limiter.clock();
        let endpoint = envelope.describe();
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let wait = self.limiter.reserve();
            if !wait.is_zero() {
                metrics::record_rate_limit_wait(wait);
                debug!(endpoint = %endpoint, wait_ms = wait.as_millis() as u64, "Rate limiter delaying request");
                clock.sleep(wait).await;
            }

            let request_metrics = HttpRequestMetrics::start(envelope.method.as_str(), attempt);
            let (class, message) = match self.inner.send(envelope).await {
                Ok(response) => {
                    request_metrics.record_complete(response.status);
                    let quota = QuotaTelemetry::from_headers(&response.headers, Utc::now());
                    if let Some(q) = quota {
                        metrics::record_quota(q.remaining, q.limit);
                    }
                    self.limiter.record(quota);

                    let Some(class) = FailureClass::from_response(&response) else {
                        if attempt > 1 {
                            info!(endpoint = %endpoint, attempt = attempt, "Request succeeded after retry");
                        }
                        return Ok(response);
                    };

                    if let FailureClass::RateLimited {
                        retry_after: Some(hint),
                    } = class
                    {
                        self.limiter.record_retry_after(hint);
                    }
                    (class, error_message(&response.body))
                }
                Err(failure) => {
                    request_metrics.record_network_error();
                    self.limiter.record(None);
                    (FailureClass::from_transport(&failure), failure.message)
                }
            };

            match self.policy.decide(attempt, &class, envelope.safety) {
                RetryAction::RetryAfter(backoff) => {
                    let context = RetryContext {
                        attempt,
                        max_attempts,
                        class,
                        backoff,
                        endpoint: &endpoint,
                        message: &message,
                    };
                    warn!(
                        endpoint = %endpoint,
                        attempt = attempt,
                        error = %message,
                        "{}",
                        context.format_retry()
                    );
                    metrics::record_retry_backoff(backoff, attempt);
                    clock.sleep(backoff).await;
                }
                RetryAction::Fail => {
                    if class.is_transient() {
                        let context = RetryContext {
                            attempt,
                            max_attempts,
                            class,
                            backoff: std::time::Duration::ZERO,
                            endpoint: &endpoint,
                            message: &message,
                        };
                        warn!("{}", context.format_failure());
                    }
                    return Err(into_api_error(class, message, attempt));
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingTransport")
            .field("limiter", &self.limiter)
            .field("policy", &self.policy)
            .finish()
    }
}

fn into_api_error(class: FailureClass, message: String, attempts: u32) -> ApiError {
    match class {
        FailureClass::InvalidRequest => ApiError::Validation(message),
        FailureClass::AuthFailed(status) => ApiError::PermissionDenied { status, message },
        FailureClass::NotFound => ApiError::NotFound(message),
        FailureClass::Client(status) => ApiError::Api { status, message },
        FailureClass::RateLimited { .. } => ApiError::RateLimited { attempts },
        FailureClass::Server(status) => ApiError::Transport {
            attempts,
            message: format!("server error {status}: {message}"),
        },
        FailureClass::Timeout | FailureClass::ConnectFailed | FailureClass::Network => {
            ApiError::Transport { attempts, message }
        }
    }
}
