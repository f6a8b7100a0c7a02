// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! Validates the fixed-window behaviour of the credential `RateLimiter`
use portal_backend_lib::auth::{LimitedEndpoint, RateDecision, RateLimitPolicy, RateLimiter};
use std::time::Duration;

fn limiter() -> RateLimiter {
    RateLimiter::new(
        RateLimitPolicy {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        },
        RateLimitPolicy {
            max_attempts: 3,
            window: Duration::from_secs(60 * 60),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_allows_initial_attempts() {
    let rate_limiter = limiter();

    assert_eq!(
        rate_limiter.check("10.0.0.1", LimitedEndpoint::Login),
        RateDecision::Allowed { remaining: 4 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_blocks_after_max_attempts() {
    let rate_limiter = limiter();

    for _ in 0..5 {
        assert!(rate_limiter.check("10.0.0.2", LimitedEndpoint::Login).is_allowed());
    }

    tokio::time::advance(Duration::from_secs(60)).await;
    match rate_limiter.check("10.0.0.2", LimitedEndpoint::Login) {
        RateDecision::Denied { retry_after } => assert_eq!(retry_after, Duration::from_secs(14 * 60)),
        other => panic!("sixth attempt should be denied, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_window_resets() {
    let rate_limiter = limiter();

    for _ in 0..4 {
        rate_limiter.check("10.0.0.3", LimitedEndpoint::Register);
    }
    assert!(!rate_limiter.check("10.0.0.3", LimitedEndpoint::Register).is_allowed());

    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    assert_eq!(
        rate_limiter.check("10.0.0.3", LimitedEndpoint::Register),
        RateDecision::Allowed { remaining: 2 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_keys_are_independent() {
    let rate_limiter = limiter();

    for _ in 0..3 {
        rate_limiter.check("10.0.0.4", LimitedEndpoint::Register);
    }
    assert!(!rate_limiter.check("10.0.0.4", LimitedEndpoint::Register).is_allowed());

    // Another endpoint for the same client and the same endpoint for another client
    assert!(rate_limiter.check("10.0.0.4", LimitedEndpoint::Login).is_allowed());
    assert!(rate_limiter.check("10.0.0.5", LimitedEndpoint::Register).is_allowed());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_cleanup_evicts_elapsed_windows() {
    let rate_limiter = limiter();
    rate_limiter.check("10.0.0.6", LimitedEndpoint::Login);
    rate_limiter.check("10.0.0.6", LimitedEndpoint::Register);
    assert_eq!(rate_limiter.tracked(), 2);

    tokio::time::advance(Duration::from_secs(15 * 60)).await;
    assert_eq!(rate_limiter.cleanup(), 1);
    assert_eq!(rate_limiter.tracked(), 1);
}

#[test]
fn test_denial_messages_follow_windows() {
    let rate_limiter = limiter();
    assert_eq!(
        rate_limiter.denial_message(LimitedEndpoint::Login),
        "Too many login attempts. Please try again after 15 minutes."
    );
    assert_eq!(
        rate_limiter.denial_message(LimitedEndpoint::Register),
        "Too many registration attempts. Please try again after an hour."
    );
}
