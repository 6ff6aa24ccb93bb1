// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::AuthError;
use crate::models::{RequestMeta, Tenant};

/// `X-Client-Id` / `X-Client-Key` pair
#[derive(Clone, PartialEq, Eq)]
pub struct TenantCredentials {
    pub tenant_id: String,
    pub secret: String,
}

impl TenantCredentials {
    pub fn new(tenant_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Tenant registration input
#[derive(Debug, Clone, Default)]
pub struct TenantRegistration {
    pub name: String,
    pub description: Option<String>,
    pub idle_timeout_minutes: Option<u32>,
}

/// A freshly signed token and the session it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

/// Identity behind a token that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub user_id: String,
    pub tenant_id: String,
    pub session_id: String,
}

/// Every operation the HTTP layer can ask of the auth core
///
/// Errors are returned as [`AuthError`] kinds; mapping them to wire
/// statuses is left to the caller.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(
        &self,
        request: SignupRequest,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<IssuedToken, AuthError>;

    async fn login(
        &self,
        request: LoginRequest,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<IssuedToken, AuthError>;

    async fn validate_token(
        &self,
        token: &str,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<ValidatedToken, AuthError>;

    /// End the token's session; ending an already ended session succeeds
    async fn logout(
        &self,
        token: &str,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<(), AuthError>;

    /// End every session of a user, returning how many were active
    async fn logout_all(&self, user_id: &str, meta: RequestMeta) -> Result<usize, AuthError>;

    async fn register_tenant(
        &self,
        registration: TenantRegistration,
        meta: RequestMeta,
    ) -> Result<Tenant, AuthError>;

    /// Swap the tenant's secret after proving possession of the current one
    async fn rotate_tenant_secret(
        &self,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<String, AuthError>;
}
