//! Client tuning constants

use std::time::Duration;

/// Default ClickUp v2 API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";

/// Default number of retries after the first attempt.
/// Three retries keep a failing bulk record under ~15 seconds of backoff.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Upper bound of the random jitter added to each backoff.
pub const DEFAULT_JITTER_MS: u64 = 250;

/// Request ceiling assumed while the service reports no quota headers.
/// ClickUp's lowest plan allows 100 requests per minute per token.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;

/// Length of the fallback rate window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Longest wait accepted from `Retry-After` or `X-RateLimit-Reset`.
pub const MAX_SERVER_WAIT: Duration = Duration::from_secs(3600);

/// Default overall request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Records per bulk batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// ClickUp returns at most this many tasks per page.
pub const TASK_PAGE_SIZE: usize = 100;

/// `base_ms * 2^(attempt-1)`, capped at `cap_ms`
pub fn backoff_between(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let delay_ms = base_ms.saturating_mul(2u64.pow(exponent));
    Duration::from_millis(delay_ms.min(cap_ms))
}
