//! Request, retry and bulk outcome metrics
//!
//! Metrics are always recorded through the `metrics` facade. Without an
//! installed recorder the calls are no-ops; `--metrics-addr` installs a
//! Prometheus exporter so they can be scraped.
//!
//! ## Metrics
//!
//! - `http_requests_total{method,status,attempt}`
//! - `http_request_duration_seconds{method}`
//! - `http_429_errors_total{method}`
//! - `http_retries_total{attempt}` and `retry_backoff_duration_seconds`
//! - `rate_limiter_wait_seconds`
//! - `rate_limit_remaining`
//! - `bulk_records_total{job,outcome}`

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are ignored once the exporter is installed.
///
/// # Arguments
/// * `addr` - Socket address to bind the Prometheus scrape endpoint (e.g., "127.0.0.1:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!(addr = %addr, "Initializing metrics system");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests sent to the ClickUp API"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit responses received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_histogram!(
        "rate_limiter_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for the shared request budget"
    );
    describe_gauge!(
        "rate_limit_remaining",
        Unit::Count,
        "Requests left in the current window as reported by the service"
    );
    describe_counter!(
        "bulk_records_total",
        Unit::Count,
        "Bulk records processed, labelled by outcome"
    );

    *initialized = true;
    info!(addr = %addr, "Metrics system initialized successfully");
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and labels for one HTTP attempt
pub struct HttpRequestMetrics {
    method: &'static str,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording an attempt
    pub fn start(method: &'static str, attempt: u32) -> Self {
        Self {
            method,
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
            attempt,
        }
    }

    /// Record a completed exchange
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "method" => self.method,
            "status" => status_code.to_string(),
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!("http_request_duration_seconds", "method" => self.method)
            .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!("http_429_errors_total", "method" => self.method).increment(1);
        }

        debug!(
            correlation_id = %self.correlation_id,
            method = self.method,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record an attempt that produced no response
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "method" => self.method,
            "status" => "network_error",
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!("http_request_duration_seconds", "method" => self.method)
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            method = self.method,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Network error recorded"
        );
    }

    /// Correlation ID for this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("retry_backoff_duration_seconds").record(duration.as_secs_f64());
}

/// Record time spent waiting on the rate limiter
pub fn record_rate_limit_wait(wait: Duration) {
    histogram!("rate_limiter_wait_seconds").record(wait.as_secs_f64());
    if wait >= Duration::from_secs(1) {
        debug!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit window");
    }
}

/// Record the quota reported by the service
pub fn record_quota(remaining: u32, limit: u32) {
    gauge!("rate_limit_remaining").set(remaining as f64);

    if quota_is_low(remaining, limit) {
        warn!(
            remaining = remaining,
            limit = limit,
            "Rate limit budget below 10% of the window"
        );
    }
}

/// Below 10% of the window; header values can reach `u32::MAX`
fn quota_is_low(remaining: u32, limit: u32) -> bool {
    limit > 0 && u64::from(remaining) * 10 <= u64::from(limit)
}

/// Count one bulk record outcome
pub fn record_bulk_outcome(job: &'static str, outcome: &'static str) {
    counter!("bulk_records_total", "job" => job, "outcome" => outcome).increment(1);
}
