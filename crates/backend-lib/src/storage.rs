// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Storage abstraction for the durable collaborators of the auth core.
//!
//! The core only needs keyed CRUD plus a handful of conditional updates.
//! Every method that mutates a record does so atomically with respect to
//! other calls on the same key.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::rate_limit::{RateLimitKey, RateLimitWindow};
use crate::error::StoreError;
use crate::models::{NewUser, Session, Tenant, UserAccount};

mod flat_file;
mod memory;

pub use flat_file::FlatFileTenantStore;
pub use memory::{InMemoryRateLimitStore, InMemorySessionStore, InMemoryTenantStore, InMemoryUserStore};

/// Pure transition applied to a rate-limit window under the key's lock.
///
/// Receives the stored window (or `None` on first use) and returns the value
/// to store. Implementations may call it more than once when retrying an
/// optimistic write, so it must not have side effects.
pub type WindowTransition<'a> = &'a (dyn Fn(Option<&RateLimitWindow>) -> RateLimitWindow + Send + Sync);

/// Result of a conditional last-activity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Activity advanced to the given time
    Applied,
    /// A newer activity time was already recorded; nothing changed
    Superseded,
    /// Record exists but is no longer active
    Inactive,
    /// No such record
    Missing,
}

/// Result of a conditional stale-session deactivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleOutcome {
    /// The stored record was still expired or idle and is now inactive
    Deactivated,
    /// The stored record is live; carries its current state
    Live(Session),
    /// Record exists but was already inactive
    Inactive,
    /// No such record
    Missing,
}

/// Durable tenant records
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find(&self, tenant_id: &str) -> Result<Option<Tenant>, StoreError>;

    /// Insert a new tenant; `StoreError::Conflict` if the id is taken
    async fn insert(&self, tenant: Tenant) -> Result<(), StoreError>;

    /// Replace the secret; `Ok(false)` if the tenant does not exist
    async fn update_secret(
        &self,
        tenant_id: &str,
        secret: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Durable session records, the source of truth for session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), StoreError>;

    async fn find(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Advance `last_activity_at` to `at` if the record is active and `at` is newer
    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> Result<TouchOutcome, StoreError>;

    /// Mark inactive; `Ok(true)` only for the call that flipped the flag
    async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Mark inactive only if the stored record is expired at `now` or saw no
    /// activity since `idle_before`, judged under the record's lock
    async fn deactivate_if_stale(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<StaleOutcome, StoreError>;

    /// Deactivate every active session of a user, returning the affected ids
    async fn deactivate_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    /// Active sessions that expired before `now` or saw no activity since `idle_before`
    async fn find_stale(
        &self,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError>;

    /// Delete inactive records whose last activity is older than `before`
    async fn purge_inactive(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Durable rate-limit windows
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomic read-modify-write of one key's window; returns the stored value
    async fn update(
        &self,
        key: &RateLimitKey,
        transition: WindowTransition<'_>,
    ) -> Result<RateLimitWindow, StoreError>;

    async fn find(&self, key: &RateLimitKey) -> Result<Option<RateLimitWindow>, StoreError>;

    /// Delete windows with no block in force at `now` and no attempt since `stale_before`
    async fn remove_stale(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}

/// External user directory; `(email, tenant)` is unique
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email_and_tenant(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> Result<Option<UserAccount>, StoreError>;

    /// Persist a new user; `StoreError::Conflict` if `(email, tenant)` exists
    async fn save(&self, user: NewUser) -> Result<UserAccount, StoreError>;
}
