// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for authentication attempts.
//!
//! Each `(source, tenant, operation)` key owns a sliding window. A window
//! moves OPEN -> BLOCKED when a check finds it exhausted, and back to OPEN
//! once its reset time passes. All transitions are pure functions applied
//! atomically by the [`RateLimitStore`].
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::config::RateLimitSettings;
use crate::error::RateLimitError;
use crate::metrics::{RATE_LIMIT_DENIED, RATE_LIMIT_FAIL_OPEN, RATE_LIMIT_SWEPT};
use crate::storage::RateLimitStore;

/// Default number of failed attempts before blocking
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default sliding window (5 minutes)
pub const DEFAULT_WINDOW_SECS: u64 = 5 * 60;

/// Default block duration (15 minutes)
pub const DEFAULT_BLOCK_DURATION_SECS: u64 = 15 * 60;

/// Kind of request being limited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Login,
    Signup,
    ApiCall,
    TokenValidation,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "LOGIN",
            Operation::Signup => "SIGNUP",
            Operation::ApiCall => "API_CALL",
            Operation::TokenValidation => "TOKEN_VALIDATION",
        }
    }
}

/// Identity a window is kept for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitKey {
    /// Client address as seen at the edge
    pub source: String,
    pub tenant_id: String,
    pub operation: Operation,
}

impl RateLimitKey {
    pub fn new(source: impl Into<String>, tenant_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            source: source.into(),
            tenant_id: tenant_id.into(),
            operation,
        }
    }
}

/// Attempt accounting for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub attempt_count: u32,
    pub window_start: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    /// End of the current window, or of the block while `blocked`
    pub reset_time: DateTime<Utc>,
    pub blocked: bool,
}

impl RateLimitWindow {
    /// A fresh window starting at `now`
    pub fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            attempt_count: 0,
            window_start: now,
            last_attempt: now,
            reset_time: now + window,
            blocked: false,
        }
    }

    pub fn is_block_active(&self, now: DateTime<Utc>) -> bool {
        self.blocked && now <= self.reset_time
    }

    /// Window elapsed, or reset time passed
    pub fn needs_reset(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now > self.window_start + window || now > self.reset_time
    }

    pub fn record_attempt(&self, now: DateTime<Utc>) -> Self {
        Self {
            attempt_count: self.attempt_count.saturating_add(1),
            last_attempt: now,
            ..self.clone()
        }
    }

    pub fn block(&self, now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            blocked: true,
            reset_time: now + duration,
            ..self.clone()
        }
    }

    fn window_end(&self, window: Duration) -> DateTime<Utc> {
        self.window_start + window
    }
}

/// Deployment-wide thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
    /// Zero means exhausted windows throttle instead of blocking
    pub block_duration: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: secs(DEFAULT_WINDOW_SECS),
            block_duration: secs(DEFAULT_BLOCK_DURATION_SECS),
        }
    }
}

impl From<&RateLimitSettings> for RateLimitPolicy {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            window: secs(settings.window_secs),
            block_duration: secs(settings.block_duration_secs),
        }
    }
}

pub(crate) fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

/// Outcome of [`AuthRateLimiter::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub attempts: u32,
    pub retry_after_secs: u64,
    pub error: Option<RateLimitError>,
}

impl RateLimitResult {
    fn allowed(attempts: u32) -> Self {
        Self {
            allowed: true,
            attempts,
            retry_after_secs: 0,
            error: None,
        }
    }

    fn denied(attempts: u32, error: RateLimitError) -> Self {
        Self {
            allowed: false,
            attempts,
            retry_after_secs: error.retry_after_secs(),
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<u32, RateLimitError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.attempts),
        }
    }
}

/// Rate limiter for authentication attempts
#[derive(Clone)]
pub struct AuthRateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl AuthRateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Decide whether a request may proceed; never increments the count
    ///
    /// Store failures allow the request.
    pub async fn check(&self, key: &RateLimitKey, now: DateTime<Utc>) -> RateLimitResult {
        let policy = self.policy;
        let transition = move |current: Option<&RateLimitWindow>| check_transition(current, now, &policy);

        let window = match self.store.update(key, &transition).await {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, operation = key.operation.as_str(), tenant = %key.tenant_id, "Rate limit check failed, allowing request");
                counter!(RATE_LIMIT_FAIL_OPEN).increment(1);
                return RateLimitResult::allowed(0);
            },
        };

        let result = decide(&window, now, &policy);
        if let Some(err) = &result.error {
            counter!(RATE_LIMIT_DENIED).increment(1);
            warn!(
                source = %key.source,
                tenant = %key.tenant_id,
                operation = key.operation.as_str(),
                attempts = result.attempts,
                retry_after = result.retry_after_secs,
                "{err}"
            );
        } else {
            debug!(operation = key.operation.as_str(), attempts = result.attempts, max = policy.max_attempts, "Rate limit check passed");
        }
        result
    }

    /// Count a failed attempt against the key's window
    ///
    /// Never blocks by itself; the next [`check`](Self::check) does.
    pub async fn record_failure(&self, key: &RateLimitKey, now: DateTime<Utc>) {
        let policy = self.policy;
        let transition =
            move |current: Option<&RateLimitWindow>| failure_transition(current, now, &policy);

        match self.store.update(key, &transition).await {
            Ok(window) => debug!(
                operation = key.operation.as_str(),
                attempts = window.attempt_count,
                max = policy.max_attempts,
                "Recorded failed attempt"
            ),
            Err(e) => {
                error!(error = %e, operation = key.operation.as_str(), "Failed to record failed attempt");
                counter!(RATE_LIMIT_FAIL_OPEN).increment(1);
            },
        }
    }

    /// Drop windows with no active block and no attempt within `stale_after`
    pub async fn sweep(&self, now: DateTime<Utc>, stale_after: Duration) -> usize {
        match self.store.remove_stale(now, now - stale_after).await {
            Ok(removed) => {
                if removed > 0 {
                    counter!(RATE_LIMIT_SWEPT).increment(removed as u64);
                    debug!(removed, "Rate limit cleanup");
                }
                removed
            },
            Err(e) => {
                error!(error = %e, "Rate limit cleanup failed");
                0
            },
        }
    }
}

fn check_transition(
    current: Option<&RateLimitWindow>,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> RateLimitWindow {
    let Some(current) = current else {
        return RateLimitWindow::open(now, policy.window);
    };
    if current.is_block_active(now) {
        return current.clone();
    }

    let window = if current.needs_reset(now, policy.window) {
        RateLimitWindow::open(now, policy.window)
    } else {
        current.clone()
    };

    if window.attempt_count >= policy.max_attempts && policy.block_duration > Duration::zero() {
        window.block(now, policy.block_duration)
    } else {
        window
    }
}

fn failure_transition(
    current: Option<&RateLimitWindow>,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> RateLimitWindow {
    let window = match current {
        None => RateLimitWindow::open(now, policy.window),
        // A block in force is never shortened by further failures.
        Some(w) if w.is_block_active(now) => w.clone(),
        Some(w) if w.needs_reset(now, policy.window) => RateLimitWindow::open(now, policy.window),
        Some(w) => w.clone(),
    };
    window.record_attempt(now)
}

fn decide(window: &RateLimitWindow, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateLimitResult {
    if window.is_block_active(now) {
        let retry_after_secs = seconds_until(now, window.reset_time);
        return RateLimitResult::denied(window.attempt_count, RateLimitError::Blocked { retry_after_secs });
    }
    if window.attempt_count >= policy.max_attempts {
        let retry_after_secs = seconds_until(now, window.window_end(policy.window));
        return RateLimitResult::denied(
            window.attempt_count,
            RateLimitError::Throttled { retry_after_secs },
        );
    }
    RateLimitResult::allowed(window.attempt_count)
}

fn seconds_until(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    u64::try_from((until - now).num_seconds()).unwrap_or(0)
}
