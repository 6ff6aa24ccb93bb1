// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle: creation, validation, deactivation and sweeping.
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session_cache::SessionCache;
use super::tenant::TenantRegistry;
use crate::error::{AuthError, SessionError, StoreError};
use crate::metrics::{
    SESSION_CACHE_HIT, SESSION_CACHE_MISS, SESSION_CREATED, SESSION_DEACTIVATED, SESSION_PURGED,
    SESSION_REJECTED, SESSION_VALIDATED,
};
use crate::models::{RequestMeta, Session};
use crate::storage::{SessionStore, StaleOutcome, TouchOutcome};

/// Smallest idle window the store sweep pre-filters on; the exact
/// per-tenant check runs on each candidate afterwards.
const SWEEP_IDLE_FLOOR_MINUTES: i64 = 1;

/// Counts from one store maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSweep {
    pub deactivated: usize,
    pub purged: usize,
}

/// Session manager combining the durable store with the in-memory cache
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cache: SessionCache,
    tenants: Arc<TenantRegistry>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, tenants: Arc<TenantRegistry>, ttl: Duration) -> Self {
        Self {
            store,
            cache: SessionCache::new(),
            tenants,
            ttl,
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persist a new session expiring at `now + ttl` and cache it
    pub async fn create(
        &self,
        user_id: &str,
        tenant_id: &str,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            last_activity_at: now,
            active: true,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        };

        self.store.insert(session.clone()).await?;
        self.cache.put(session.clone());
        counter!(SESSION_CREATED).increment(1);
        info!(session = %session.id, user = user_id, tenant = tenant_id, "Created session");
        Ok(session)
    }

    /// Check a session for `tenant_id` at `now` and record the activity
    ///
    /// Expired and idle sessions are deactivated as a side effect.
    pub async fn validate(
        &self,
        session_id: &str,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut session = match self.cache.get(session_id) {
            Some(session) => {
                counter!(SESSION_CACHE_HIT).increment(1);
                session
            },
            None => {
                counter!(SESSION_CACHE_MISS).increment(1);
                match self.store.find(session_id).await? {
                    Some(session) => {
                        if session.active {
                            self.cache.put(session.clone());
                        }
                        session
                    },
                    None => return Err(rejected(session_id, SessionError::NotFound)),
                }
            },
        };

        if !session.active {
            self.cache.remove(session_id);
            return Err(rejected(session_id, SessionError::Inactive));
        }
        if session.tenant_id != tenant_id {
            return Err(rejected(session_id, SessionError::TenantMismatch));
        }
        let idle_timeout = self.tenants.idle_timeout(&session.tenant_id).await;
        if session.is_expired(now) || session.is_idle(now, idle_timeout) {
            let reason = if session.is_expired(now) {
                SessionError::Expired
            } else {
                SessionError::IdleTimeoutExceeded
            };
            // Our copy may lag a concurrent touch; the store record decides.
            match self.store.deactivate_if_stale(session_id, now, now - idle_timeout).await? {
                StaleOutcome::Deactivated => {
                    self.cache.remove(session_id);
                    counter!(SESSION_DEACTIVATED).increment(1);
                    debug!(session = session_id, "Deactivated session");
                    return Err(rejected(session_id, reason));
                },
                StaleOutcome::Live(stored) => {
                    self.cache.put(stored.clone());
                    session = stored;
                },
                StaleOutcome::Inactive => {
                    self.cache.remove(session_id);
                    return Err(rejected(session_id, SessionError::Inactive));
                },
                StaleOutcome::Missing => {
                    self.cache.remove(session_id);
                    return Err(rejected(session_id, SessionError::NotFound));
                },
            }
        }

        match self.store.touch(session_id, now).await? {
            TouchOutcome::Applied | TouchOutcome::Superseded => {},
            // The cached copy was stale; the store decides.
            TouchOutcome::Inactive => {
                self.cache.remove(session_id);
                return Err(rejected(session_id, SessionError::Inactive));
            },
            TouchOutcome::Missing => {
                self.cache.remove(session_id);
                return Err(rejected(session_id, SessionError::NotFound));
            },
        }
        self.cache.touch(session_id, now);
        counter!(SESSION_VALIDATED).increment(1);
        Ok(session.touched(now))
    }

    /// Mark a session inactive and evict it; repeated calls are harmless
    pub async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError> {
        let flipped = self.store.deactivate(session_id).await?;
        self.cache.remove(session_id);
        if flipped {
            counter!(SESSION_DEACTIVATED).increment(1);
            debug!(session = session_id, "Deactivated session");
        }
        Ok(flipped)
    }

    /// Deactivate every active session of a user, returning the affected ids
    pub async fn deactivate_all_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let ids = self.store.deactivate_for_user(user_id).await?;
        for id in &ids {
            self.cache.remove(id);
        }
        counter!(SESSION_DEACTIVATED).increment(ids.len() as u64);
        info!(user = user_id, count = ids.len(), "Deactivated all sessions for user");
        Ok(ids)
    }

    /// Read-through lookup without validation side effects
    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        if let Some(session) = self.cache.get(session_id) {
            return Ok(Some(session));
        }
        let session = self.store.find(session_id).await?;
        if let Some(session) = session.as_ref().filter(|s| s.active) {
            self.cache.put(session.clone());
        }
        Ok(session)
    }

    /// Evict expired and inactive cache entries
    pub fn sweep_cache(&self, now: DateTime<Utc>) -> usize {
        self.cache.sweep(now)
    }

    /// Deactivate expired or idle sessions, then purge inactive records
    /// whose last activity is older than `retention`
    pub async fn sweep_store(&self, now: DateTime<Utc>, retention: Duration) -> Result<StoreSweep, StoreError> {
        let mut sweep = StoreSweep::default();

        for session in self.store.find_stale(now, now - Duration::minutes(SWEEP_IDLE_FLOOR_MINUTES)).await? {
            let idle_timeout = self.tenants.idle_timeout(&session.tenant_id).await;
            let outcome = self.store.deactivate_if_stale(&session.id, now, now - idle_timeout).await?;
            if outcome == StaleOutcome::Deactivated {
                self.cache.remove(&session.id);
                counter!(SESSION_DEACTIVATED).increment(1);
                sweep.deactivated += 1;
            }
        }

        sweep.purged = self.store.purge_inactive(now - retention).await?;
        if sweep.purged > 0 {
            counter!(SESSION_PURGED).increment(sweep.purged as u64);
        }
        if sweep.deactivated > 0 || sweep.purged > 0 {
            info!(deactivated = sweep.deactivated, purged = sweep.purged, "Session store cleanup");
        }
        Ok(sweep)
    }
}

fn rejected(session_id: &str, err: SessionError) -> AuthError {
    counter!(SESSION_REJECTED).increment(1);
    warn!(session = session_id, reason = %err, "Session rejected");
    AuthError::Session(err)
}
