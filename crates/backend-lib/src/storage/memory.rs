// ============================
// crates/backend-lib/src/storage/memory.rs
// ============================
//! In-memory stores backed by `DashMap`.
//!
//! Each conditional update runs while holding the shard lock for its key,
//! which gives the per-key atomicity the traits promise.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    RateLimitStore, SessionStore, StaleOutcome, TenantStore, TouchOutcome, UserStore,
    WindowTransition,
};
use crate::auth::rate_limit::{RateLimitKey, RateLimitWindow};
use crate::error::StoreError;
use crate::models::{NewUser, Session, Tenant, UserAccount};

/// Tenants kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantStore {
    tenants: Arc<DashMap<String, Tenant>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find(&self, tenant_id: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.get(tenant_id).map(|t| t.clone()))
    }

    async fn insert(&self, tenant: Tenant) -> Result<(), StoreError> {
        match self.tenants.entry(tenant.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("tenant {} exists", tenant.id))),
            Entry::Vacant(slot) => {
                slot.insert(tenant);
                Ok(())
            },
        }
    }

    async fn update_secret(
        &self,
        tenant_id: &str,
        secret: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.tenants.get_mut(tenant_id) {
            Some(mut tenant) => {
                tenant.secret = secret.to_string();
                tenant.updated_at = Some(updated_at);
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

/// Sessions kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("session {} exists", session.id))),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            },
        }
    }

    async fn find(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }

    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> Result<TouchOutcome, StoreError> {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return Ok(TouchOutcome::Missing);
        };
        if !session.active {
            return Ok(TouchOutcome::Inactive);
        }
        if at <= session.last_activity_at {
            return Ok(TouchOutcome::Superseded);
        }
        *session = session.touched(at);
        Ok(TouchOutcome::Applied)
    }

    async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError> {
        match self.sessions.get_mut(session_id) {
            Some(mut session) if session.active => {
                *session = session.deactivated();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn deactivate_if_stale(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<StaleOutcome, StoreError> {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return Ok(StaleOutcome::Missing);
        };
        if !session.active {
            return Ok(StaleOutcome::Inactive);
        }
        if session.is_expired(now) || session.last_activity_at < idle_before {
            *session = session.deactivated();
            return Ok(StaleOutcome::Deactivated);
        }
        Ok(StaleOutcome::Live(session.clone()))
    }

    async fn deactivate_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let mut affected = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            if entry.user_id == user_id && entry.active {
                *entry = entry.deactivated();
                affected.push(entry.key().clone());
            }
        }
        Ok(affected)
    }

    async fn find_stale(
        &self,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.active && (s.is_expired(now) || s.last_activity_at < idle_before))
            .map(|s| s.clone())
            .collect())
    }

    async fn purge_inactive(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let start = self.sessions.len();
        self.sessions
            .retain(|_, s| s.active || s.last_activity_at >= before);
        Ok(start.saturating_sub(self.sessions.len()))
    }
}

/// Rate-limit windows kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateLimitStore {
    windows: Arc<DashMap<RateLimitKey, RateLimitWindow>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn update(
        &self,
        key: &RateLimitKey,
        transition: WindowTransition<'_>,
    ) -> Result<RateLimitWindow, StoreError> {
        // The entry guard holds the shard lock across read, transition and write.
        match self.windows.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let next = transition(Some(slot.get()));
                slot.insert(next.clone());
                Ok(next)
            },
            Entry::Vacant(slot) => {
                let next = transition(None);
                slot.insert(next.clone());
                Ok(next)
            },
        }
    }

    async fn find(&self, key: &RateLimitKey) -> Result<Option<RateLimitWindow>, StoreError> {
        Ok(self.windows.get(key).map(|w| w.clone()))
    }

    async fn remove_stale(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let start = self.windows.len();
        self.windows
            .retain(|_, w| w.is_block_active(now) || w.last_attempt >= stale_before);
        Ok(start.saturating_sub(self.windows.len()))
    }
}

/// Users kept in process memory, keyed by `(tenant, email)`
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<(String, String), UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email_and_tenant(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let key = (tenant_id.to_string(), email.to_string());
        Ok(self.users.get(&key).map(|u| u.clone()))
    }

    async fn save(&self, user: NewUser) -> Result<UserAccount, StoreError> {
        match self.users.entry((user.tenant_id.clone(), user.email.clone())) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "{} already registered for tenant {}",
                user.email, user.tenant_id
            ))),
            Entry::Vacant(slot) => {
                let account = UserAccount {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: user.tenant_id,
                    email: user.email,
                    password_hash: user.password_hash,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    created_at: user.created_at,
                };
                slot.insert(account.clone());
                Ok(account)
            },
        }
    }
}
