// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core library of the Guardian multi-tenant auth server.

pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod maintenance;
pub mod metrics;
pub mod models;
pub mod router;
pub mod storage;
pub mod validation;

use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::audit::{AuditDispatcher, AuditSink, TracingAuditSink};
use crate::auth::rate_limit::secs;
use crate::auth::{
    AuthComponents, AuthCoordinator, AuthRateLimiter, AuthService, PasswordPolicy, RateLimitPolicy,
    SessionManager, TenantRegistry, TokenCodec,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, Settings};
use crate::error::StoreError;
use crate::geo::{GeoResolver, StaticGeoResolver};
use crate::maintenance::{Maintenance, MaintenanceSchedule, Sweepers};
use crate::storage::{
    FlatFileTenantStore, InMemoryRateLimitStore, InMemorySessionStore, InMemoryTenantStore,
    InMemoryUserStore, RateLimitStore, SessionStore, TenantStore, UserStore,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings manager
    pub settings: Arc<Settings>,
}

/// Storage and side-effect collaborators the core is built on
#[derive(Clone)]
pub struct Backends {
    pub tenants: Arc<dyn TenantStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub users: Arc<dyn UserStore>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub geo: Arc<dyn GeoResolver>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Everything in process memory, audit records to tracing
    pub fn in_memory() -> Self {
        Self {
            tenants: Arc::new(InMemoryTenantStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            rate_limits: Arc::new(InMemoryRateLimitStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            audit_sink: Arc::new(TracingAuditSink),
            geo: Arc::new(StaticGeoResolver),
            clock: Arc::new(SystemClock),
        }
    }

    /// Like [`in_memory`](Self::in_memory) but tenants persist under `path`
    pub async fn flat_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let tenants = FlatFileTenantStore::new(path).await?;
        Ok(Self {
            tenants: Arc::new(tenants),
            ..Self::in_memory()
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }
}

/// The wired service: coordinator, sweepers and audit pool
pub struct Guardian {
    settings: Arc<Settings>,
    auth: Arc<AuthCoordinator>,
    sweepers: Sweepers,
    audit: Arc<AuditDispatcher>,
}

impl Guardian {
    /// Validate `settings` and wire every component
    ///
    /// Starts the audit workers, so it must run inside a tokio runtime.
    pub fn build(settings: Settings, backends: Backends) -> Result<Self, ConfigError> {
        settings.validate()?;
        let passwords = PasswordPolicy::from_settings(&settings.password)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let ttl = secs(settings.token.ttl_secs);
        let tenants = Arc::new(TenantRegistry::new(
            backends.tenants,
            chrono::Duration::minutes(i64::from(settings.session.default_idle_timeout_minutes)),
        ));
        let sessions = Arc::new(SessionManager::new(backends.sessions, tenants.clone(), ttl));
        let limiter = AuthRateLimiter::new(backends.rate_limits, RateLimitPolicy::from(&settings.rate_limit));
        let audit = Arc::new(AuditDispatcher::start(backends.audit_sink, backends.geo, &settings.audit));

        let auth = Arc::new(AuthCoordinator::new(AuthComponents {
            tenants,
            sessions: sessions.clone(),
            limiter: limiter.clone(),
            tokens: TokenCodec::new(settings.token.secret.as_bytes(), ttl),
            users: backends.users,
            passwords,
            audit: audit.clone(),
            clock: backends.clock.clone(),
        }));
        let sweepers = Sweepers::new(sessions, limiter, backends.clock, MaintenanceSchedule::from(&settings));

        info!(ttl_secs = settings.token.ttl_secs, "Auth core ready");
        Ok(Self {
            settings: Arc::new(settings),
            auth,
            sweepers,
            audit,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    pub fn sweepers(&self) -> &Sweepers {
        &self.sweepers
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            auth: self.auth(),
            settings: self.settings.clone(),
        }
    }

    pub fn router(&self) -> Router {
        router::create_router(self.app_state())
    }

    pub fn spawn_maintenance(&self) -> Maintenance {
        self.sweepers.clone().spawn()
    }

    /// Drain queued audit records; later records are written inline
    pub async fn shutdown(&self) {
        self.audit.shutdown().await;
    }
}
