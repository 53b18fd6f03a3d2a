//! Unit tests for retry decisions

use std::time::Duration;

use clickup_toolkit::client::{FailureClass, RetryAction, RetryPolicy, RetrySafety};

fn policy() -> RetryPolicy {
    RetryPolicy::default().without_jitter()
}

#[test]
fn test_default_policy_allows_four_attempts() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.max_attempts(), 4);
}

#[test]
fn test_backoff_doubles_until_cap() {
    let policy = policy()
        .with_max_retries(10)
        .with_delays(Duration::from_secs(1), Duration::from_secs(5));
    let delays: Vec<_> = (1..=4)
        .map(|attempt| policy.decide(attempt, &FailureClass::Server(503), RetrySafety::Idempotent))
        .collect();

    assert_eq!(
        delays,
        vec![
            RetryAction::RetryAfter(Duration::from_secs(1)),
            RetryAction::RetryAfter(Duration::from_secs(2)),
            RetryAction::RetryAfter(Duration::from_secs(4)),
            RetryAction::RetryAfter(Duration::from_secs(5)),
        ]
    );
}

#[test]
fn test_non_transient_failures_fail_immediately() {
    for class in [
        FailureClass::InvalidRequest,
        FailureClass::AuthFailed(401),
        FailureClass::NotFound,
        FailureClass::Client(422),
    ] {
        assert_eq!(
            policy().decide(1, &class, RetrySafety::Idempotent),
            RetryAction::Fail,
            "{class:?} should not be retried"
        );
    }
}

#[test]
fn test_non_idempotent_retried_only_when_never_sent() {
    let policy = policy();
    assert_eq!(
        policy.decide(1, &FailureClass::Timeout, RetrySafety::NonIdempotent),
        RetryAction::Fail
    );
    assert_eq!(
        policy.decide(1, &FailureClass::Server(502), RetrySafety::NonIdempotent),
        RetryAction::Fail
    );
    assert_eq!(
        policy.decide(1, &FailureClass::ConnectFailed, RetrySafety::NonIdempotent),
        RetryAction::RetryAfter(Duration::from_secs(1))
    );
}

#[test]
fn test_rate_limit_waits_at_least_hint() {
    let class = FailureClass::RateLimited {
        retry_after: Some(Duration::from_secs(9)),
    };
    assert_eq!(
        policy().decide(1, &class, RetrySafety::Idempotent),
        RetryAction::RetryAfter(Duration::from_secs(9))
    );

    let no_hint = FailureClass::RateLimited { retry_after: None };
    assert_eq!(
        policy().decide(2, &no_hint, RetrySafety::Idempotent),
        RetryAction::RetryAfter(Duration::from_secs(2))
    );
}

#[test]
fn test_attempt_cap() {
    let policy = policy().with_max_retries(2);
    assert!(matches!(
        policy.decide(2, &FailureClass::Network, RetrySafety::Idempotent),
        RetryAction::RetryAfter(_)
    ));
    assert_eq!(
        policy.decide(3, &FailureClass::Network, RetrySafety::Idempotent),
        RetryAction::Fail
    );
}

#[test]
fn test_jitter_stays_within_bound() {
    let policy = RetryPolicy::default();
    for _ in 0..50 {
        let RetryAction::RetryAfter(delay) =
            policy.decide(1, &FailureClass::Timeout, RetrySafety::Idempotent)
        else {
            panic!("timeout should be retried");
        };
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_millis(1250));
    }
}
