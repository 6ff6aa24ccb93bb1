// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! This test suite is designed to validate the functionality of the `AuthRateLimiter`
use chrono::Duration;
use guardian_backend::auth::{AuthRateLimiter, Operation, RateLimitKey, RateLimitPolicy};
use guardian_backend::error::RateLimitError;
use guardian_backend::storage::{InMemoryRateLimitStore, RateLimitStore};
use guardian_tests::test_utils::start_time;
use std::sync::Arc;

fn limiter() -> (AuthRateLimiter, InMemoryRateLimitStore) {
    let store = InMemoryRateLimitStore::new();
    (
        AuthRateLimiter::new(Arc::new(store.clone()), RateLimitPolicy::default()),
        store,
    )
}

fn key(ip: &str) -> RateLimitKey {
    RateLimitKey::new(ip, "ABC123", Operation::Login)
}

#[tokio::test]
async fn test_rate_limiter_allows_initial_attempts() {
    let (limiter, _) = limiter();
    let result = limiter.check(&key("127.0.0.1"), start_time()).await;
    assert!(result.allowed);
    assert_eq!(result.attempts, 0);
}

#[tokio::test]
async fn test_check_does_not_count_attempts() {
    let (limiter, _) = limiter();
    let k = key("127.0.0.2");
    for _ in 0..20 {
        assert!(limiter.check(&k, start_time()).await.allowed);
    }
}

#[tokio::test]
async fn test_block_lasts_for_block_duration() {
    let (limiter, store) = limiter();
    let k = key("127.0.0.3");
    let t0 = start_time();
    for _ in 0..5 {
        limiter.record_failure(&k, t0).await;
    }

    let denied = limiter.check(&k, t0).await;
    assert!(!denied.allowed);
    assert_eq!(
        denied.error,
        Some(RateLimitError::Blocked { retry_after_secs: 900 })
    );
    assert!(store.find(&k).await.unwrap().unwrap().blocked);

    // Still blocked at the very end of the block, even after the window passed.
    let late = limiter.check(&k, t0 + Duration::seconds(900)).await;
    assert_eq!(late.error, Some(RateLimitError::Blocked { retry_after_secs: 0 }));

    let after = limiter.check(&k, t0 + Duration::seconds(901)).await;
    assert!(after.allowed);
    assert_eq!(after.attempts, 0);
}

#[tokio::test]
async fn test_window_expiry_resets_the_count() {
    let (limiter, _) = limiter();
    let k = key("127.0.0.4");
    let t0 = start_time();
    for _ in 0..4 {
        limiter.record_failure(&k, t0).await;
    }
    assert_eq!(limiter.check(&k, t0).await.attempts, 4);

    // A failure after the window opens a new one.
    limiter.record_failure(&k, t0 + Duration::minutes(6)).await;
    let result = limiter.check(&k, t0 + Duration::minutes(6)).await;
    assert!(result.allowed);
    assert_eq!(result.attempts, 1);
}

#[tokio::test]
async fn test_keys_are_tracked_separately() {
    let (limiter, _) = limiter();
    let t0 = start_time();
    let login = key("127.0.0.5");
    for _ in 0..5 {
        limiter.record_failure(&login, t0).await;
    }
    assert!(!limiter.check(&login, t0).await.allowed);

    let other_ip = key("127.0.0.6");
    let other_tenant = RateLimitKey::new("127.0.0.5", "XYZ789", Operation::Login);
    let other_op = RateLimitKey::new("127.0.0.5", "ABC123", Operation::Signup);
    for k in [other_ip, other_tenant, other_op] {
        assert!(limiter.check(&k, t0).await.allowed, "{k:?}");
    }
}

#[tokio::test]
async fn test_zero_block_duration_throttles_until_window_end() {
    let store = InMemoryRateLimitStore::new();
    let limiter = AuthRateLimiter::new(
        Arc::new(store),
        RateLimitPolicy {
            block_duration: Duration::zero(),
            ..RateLimitPolicy::default()
        },
    );
    let k = key("127.0.0.7");
    let t0 = start_time();
    for _ in 0..5 {
        limiter.record_failure(&k, t0).await;
    }
    let result = limiter.check(&k, t0 + Duration::seconds(60)).await;
    assert_eq!(
        result.error,
        Some(RateLimitError::Throttled { retry_after_secs: 240 })
    );
    assert!(limiter.check(&k, t0 + Duration::seconds(301)).await.allowed);
}

#[tokio::test]
async fn test_concurrent_failures_are_all_counted() {
    let (limiter, _) = limiter();
    let k = key("127.0.0.8");
    let t0 = start_time();

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let limiter = limiter.clone();
        let k = k.clone();
        tasks.push(tokio::spawn(async move { limiter.record_failure(&k, t0).await }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let result = limiter.check(&k, t0).await;
    assert!(!result.allowed);
    assert_eq!(result.attempts, 50);
}

#[tokio::test]
async fn test_sweep_removes_only_stale_unblocked_windows() {
    let (limiter, store) = limiter();
    let t0 = start_time();
    limiter.record_failure(&key("10.0.0.1"), t0).await;
    let blocked = key("10.0.0.2");
    for _ in 0..5 {
        limiter.record_failure(&blocked, t0 + Duration::hours(23)).await;
    }
    limiter.check(&blocked, t0 + Duration::hours(23)).await;

    let now = t0 + Duration::hours(25);
    assert_eq!(limiter.sweep(now, Duration::hours(24)).await, 1);
    assert_eq!(store.len(), 1);
    assert!(store.find(&blocked).await.unwrap().is_some());
}
