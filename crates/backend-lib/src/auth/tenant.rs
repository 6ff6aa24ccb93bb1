// ============================
// crates/backend-lib/src/auth/tenant.rs
// ============================
//! Tenant credentials and per-tenant policy.
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use super::token_generator::{generate_secure_token, generate_tenant_id};
use crate::error::{RegistryError, StoreError};
use crate::models::Tenant;
use crate::storage::TenantStore;

/// Attempts at finding an unused tenant id before giving up
const MAX_ID_ATTEMPTS: usize = 8;

struct CachedTenant {
    secret: Zeroizing<String>,
    idle_timeout: Duration,
}

impl From<&Tenant> for CachedTenant {
    fn from(tenant: &Tenant) -> Self {
        Self {
            secret: Zeroizing::new(tenant.secret.clone()),
            idle_timeout: tenant.idle_timeout(),
        }
    }
}

/// Validates tenant credentials through a lazily filled cache over a [`TenantStore`]
pub struct TenantRegistry {
    store: Arc<dyn TenantStore>,
    cache: DashMap<String, CachedTenant>,
    default_idle: Duration,
}

impl TenantRegistry {
    pub fn new(store: Arc<dyn TenantStore>, default_idle: Duration) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            default_idle,
        }
    }

    /// True only for a known tenant presenting its current secret
    ///
    /// Fails closed: store errors and unknown tenants both yield `false`.
    pub async fn validate(&self, tenant_id: &str, secret: &str) -> bool {
        if tenant_id.is_empty() || secret.is_empty() {
            return false;
        }
        if let Some(cached) = self.cache.get(tenant_id) {
            return secrets_match(&cached.secret, secret);
        }

        match self.load(tenant_id).await {
            Ok(Some(tenant)) => secrets_match(&tenant.secret, secret),
            Ok(None) => {
                debug!(tenant = tenant_id, "Unknown tenant");
                false
            },
            Err(e) => {
                error!(tenant = tenant_id, error = %e, "Tenant lookup failed");
                false
            },
        }
    }

    /// Idle timeout for the tenant, or the default if it cannot be resolved
    pub async fn idle_timeout(&self, tenant_id: &str) -> Duration {
        if let Some(cached) = self.cache.get(tenant_id) {
            return cached.idle_timeout;
        }
        match self.load(tenant_id).await {
            Ok(Some(tenant)) => tenant.idle_timeout(),
            Ok(None) => self.default_idle,
            Err(e) => {
                warn!(tenant = tenant_id, error = %e, "Falling back to default idle timeout");
                self.default_idle
            },
        }
    }

    pub fn default_idle_timeout(&self) -> Duration {
        self.default_idle
    }

    pub async fn find(&self, tenant_id: &str) -> Result<Option<Tenant>, RegistryError> {
        Ok(self.load(tenant_id).await?)
    }

    /// Create a tenant with a fresh id and a 256-bit secret
    pub async fn register(
        &self,
        name: &str,
        description: Option<String>,
        idle_timeout_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Tenant, RegistryError> {
        let idle_timeout_minutes = idle_timeout_minutes
            .unwrap_or_else(|| u32::try_from(self.default_idle.num_minutes()).unwrap_or(30));

        for _ in 0..MAX_ID_ATTEMPTS {
            let tenant = Tenant {
                id: generate_tenant_id(),
                name: name.to_string(),
                description: description.clone(),
                secret: generate_secure_token(),
                idle_timeout_minutes,
                created_at: now,
                updated_at: None,
            };
            match self.store.insert(tenant.clone()).await {
                Ok(()) => {
                    self.cache.insert(tenant.id.clone(), CachedTenant::from(&tenant));
                    info!(tenant = %tenant.id, name, "Registered tenant");
                    return Ok(tenant);
                },
                Err(StoreError::Conflict(_)) => {
                    debug!(tenant = %tenant.id, "Tenant id collision, retrying");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Conflict("could not allocate a unique tenant id".to_string()).into())
    }

    /// Replace the tenant's secret; the old one stops validating immediately
    pub async fn rotate_secret(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<String, RegistryError> {
        let secret = generate_secure_token();
        // Evict first so no lookup answers from the old secret once the store has moved on.
        let cached_idle = self.cache.remove(tenant_id).map(|(_, cached)| cached.idle_timeout);
        if !self.store.update_secret(tenant_id, &secret, now).await? {
            return Err(RegistryError::NotFound(tenant_id.to_string()));
        }

        let idle_timeout = match cached_idle {
            Some(idle) => idle,
            None => self.idle_timeout(tenant_id).await,
        };
        // Replaces anything a concurrent load cached meanwhile; dropped secrets are zeroized.
        self.cache.insert(
            tenant_id.to_string(),
            CachedTenant {
                secret: Zeroizing::new(secret.clone()),
                idle_timeout,
            },
        );
        info!(tenant = tenant_id, "Rotated tenant secret");
        Ok(secret)
    }

    /// Forget the cached copy so the next lookup reads the store
    pub fn invalidate(&self, tenant_id: &str) {
        self.cache.remove(tenant_id);
    }

    async fn load(&self, tenant_id: &str) -> Result<Option<Tenant>, StoreError> {
        let tenant = self.store.find(tenant_id).await?;
        if let Some(tenant) = &tenant {
            self.cache
                .entry(tenant.id.clone())
                .or_insert_with(|| CachedTenant::from(tenant));
        }
        Ok(tenant)
    }
}

fn secrets_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
}
