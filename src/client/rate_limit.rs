//! Shared request budget
//!
//! One [`RateLimiter`] is created per process and handed to every
//! [`RetryingTransport`](super::http::RetryingTransport) by `Arc`. Reservations
//! and quota updates run under a single mutex so concurrent callers can never
//! overshoot the window together.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::{DEFAULT_REQUESTS_PER_MINUTE, RATE_WINDOW};
use super::envelope::QuotaTelemetry;

/// Source of time for the limiter and backoff sleeps
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Deterministic clock whose `sleep` advances time instantly.
///
/// Every requested sleep is recorded so callers can assert on the waits a
/// component asked for without spending real time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Clock starting at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Sleeps requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Sum of all requested sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

/// Budget of the current rate window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests still available without waiting
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: Instant,
    /// Reservations already promised to later windows
    pub queued: u32,
}

impl RateBudget {
    fn fresh(limit: u32, now: Instant, window: Duration) -> Self {
        Self {
            limit,
            remaining: limit,
            reset_at: now + window,
            queued: 0,
        }
    }

    /// Refill for every window boundary that `now` has passed
    fn roll(&mut self, now: Instant, window: Duration) {
        while now >= self.reset_at {
            let carried = self.queued.min(self.limit);
            self.queued -= carried;
            self.remaining = self.limit - carried;
            self.reset_at = if self.queued == 0 && now >= self.reset_at + window {
                now + window
            } else {
                self.reset_at + window
            };
        }
    }
}

/// Process-wide request gate
pub struct RateLimiter {
    budget: Mutex<RateBudget>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter allowing `limit` requests per `window` until the service reports otherwise
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let limit = limit.max(1);
        let now = clock.now();
        Self {
            budget: Mutex::new(RateBudget::fresh(limit, now, window)),
            window,
            clock,
        }
    }

    /// Limiter with the ClickUp default of 100 requests per minute
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE, RATE_WINDOW, clock)
    }

    /// Per-minute limiter on the system clock
    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, RATE_WINDOW, Arc::new(SystemClock))
    }

    /// Clock used by this limiter
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Snapshot of the current budget
    pub fn budget(&self) -> RateBudget {
        let mut budget = self.budget.lock();
        budget.roll(self.clock.now(), self.window);
        *budget
    }

    /// Reserve one request and return how long the caller must wait before sending.
    ///
    /// Zero while the window has budget left. Once it is exhausted each
    /// reservation is promised a slot in a later window, so the `k`-th queued
    /// caller waits `time_to_reset + window * (k / limit)`.
    pub fn reserve(&self) -> Duration {
        let now = self.clock.now();
        let mut budget = self.budget.lock();
        budget.roll(now, self.window);

        if budget.remaining > 0 {
            budget.remaining -= 1;
            return Duration::ZERO;
        }

        let windows_ahead = budget.queued / budget.limit;
        budget.queued += 1;
        budget.reset_at.saturating_duration_since(now) + self.window * windows_ahead
    }

    /// Update the budget after a call.
    ///
    /// With telemetry, the service's limit and reset time are adopted and the
    /// remaining count is lowered to what the service reports (raised only when
    /// the service has moved to a later window, minus reservations already
    /// queued for it). Without telemetry the locally decremented counter stands.
    pub fn record(&self, telemetry: Option<QuotaTelemetry>) {
        let Some(quota) = telemetry else {
            return;
        };

        let now = self.clock.now();
        let mut budget = self.budget.lock();
        budget.roll(now, self.window);

        let reported_reset = now + quota.reset_in;
        if reported_reset > budget.reset_at {
            // reservations queued for the next window hold slots in the reported one
            let carried = budget.queued.min(quota.remaining);
            budget.queued -= carried;
            budget.remaining = quota.remaining - carried;
        } else {
            budget.remaining = budget.remaining.min(quota.remaining);
        }
        budget.limit = quota.limit.max(1);
        budget.reset_at = reported_reset;
    }

    /// Exhaust the budget until `now + retry_after` after a 429
    pub fn record_retry_after(&self, retry_after: Duration) {
        let now = self.clock.now();
        let mut budget = self.budget.lock();
        budget.roll(now, self.window);
        budget.remaining = 0;
        budget.reset_at = now + retry_after;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("budget", &*self.budget.lock())
            .field("window", &self.window)
            .finish()
    }
}
