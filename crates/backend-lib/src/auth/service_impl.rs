// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
//! The auth coordinator: every request-path operation, start to finish.
//!
//! Each operation runs its steps in a fixed order and stops at the first
//! failure. Failures that count against the caller are charged to the rate
//! limiter before returning, and every outcome worth keeping is handed to
//! the audit dispatcher.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use super::password::PasswordPolicy;
use super::rate_limit::{AuthRateLimiter, Operation, RateLimitKey};
use super::service::{
    AuthService, IssuedToken, LoginRequest, SignupRequest, TenantCredentials, TenantRegistration,
    ValidatedToken,
};
use super::session::SessionManager;
use super::tenant::TenantRegistry;
use super::token::TokenCodec;
use crate::audit::{AuditDispatcher, AuditEvent, AuditEventType};
use crate::clock::Clock;
use crate::error::{status_for, AuthError, CredentialError, SessionError, StoreError};
use crate::metrics::{AUTH_FAILURE, AUTH_SUCCESS};
use crate::models::{NewUser, RequestMeta, Tenant};
use crate::storage::UserStore;
use crate::validation::{
    validate_description, validate_email, validate_idle_timeout, validate_password,
    validate_person_name, validate_tenant_id, validate_tenant_name,
};

/// Rate-limit tenant slot used for requests made before a tenant exists
const REGISTRATION_SCOPE: &str = "-";

/// Rate-limit tenant slot shared by every malformed client id
const MALFORMED_SCOPE: &str = "?";

/// Collaborators wired into an [`AuthCoordinator`]
pub struct AuthComponents {
    pub tenants: Arc<TenantRegistry>,
    pub sessions: Arc<SessionManager>,
    pub limiter: AuthRateLimiter,
    pub tokens: TokenCodec,
    pub users: Arc<dyn UserStore>,
    pub passwords: PasswordPolicy,
    pub audit: Arc<AuditDispatcher>,
    pub clock: Arc<dyn Clock>,
}

/// [`AuthService`] over the tenant registry, session manager, rate limiter
/// and token codec
pub struct AuthCoordinator {
    tenants: Arc<TenantRegistry>,
    sessions: Arc<SessionManager>,
    limiter: AuthRateLimiter,
    tokens: TokenCodec,
    users: Arc<dyn UserStore>,
    passwords: PasswordPolicy,
    audit: Arc<AuditDispatcher>,
    clock: Arc<dyn Clock>,
}

impl AuthCoordinator {
    pub fn new(components: AuthComponents) -> Self {
        let AuthComponents {
            tenants,
            sessions,
            limiter,
            tokens,
            users,
            passwords,
            audit,
            clock,
        } = components;
        Self {
            tenants,
            sessions,
            limiter,
            tokens,
            users,
            passwords,
            audit,
            clock,
        }
    }

    async fn admit(&self, key: &RateLimitKey, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.limiter.check(key, now).await.into_result()?;
        Ok(())
    }

    async fn authenticate_tenant(&self, credentials: &TenantCredentials) -> Result<(), AuthError> {
        if validate_tenant_id(&credentials.tenant_id).is_err() {
            return Err(CredentialError::InvalidTenantCredentials.into());
        }
        if self
            .tenants
            .validate(&credentials.tenant_id, &credentials.secret)
            .await
        {
            Ok(())
        } else {
            Err(CredentialError::InvalidTenantCredentials.into())
        }
    }

    /// Create the session, then sign a token bound to it
    async fn open_session(
        &self,
        user_id: &str,
        tenant_id: &str,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let session = self.sessions.create(user_id, tenant_id, meta, now).await?;
        let token = match self.tokens.issue(user_id, tenant_id, &session.id, now) {
            Ok(token) => token,
            Err(e) => {
                // No token will ever reference this session.
                if let Err(store_err) = self.sessions.deactivate(&session.id).await {
                    warn!(session = %session.id, error = %store_err, "Failed to deactivate orphaned session");
                }
                return Err(e.into());
            },
        };

        let ttl = self.tokens.ttl();
        Ok(IssuedToken {
            token,
            user_id: user_id.to_string(),
            session_id: session.id,
            expires_at: now + ttl,
            expires_in_secs: u64::try_from(ttl.num_seconds()).unwrap_or(0),
        })
    }

    /// Charge the failure if it counts, then log it
    async fn reject(&self, key: &RateLimitKey, err: &AuthError, now: DateTime<Utc>) {
        if err.counts_as_failed_attempt() {
            self.limiter.record_failure(key, now).await;
        }
        counter!(AUTH_FAILURE, "operation" => key.operation.as_str()).increment(1);
        warn!(
            operation = key.operation.as_str(),
            tenant = %key.tenant_id,
            source = %key.source,
            reason = err.reason_code(),
            "Request denied"
        );
    }

    fn accepted(&self, operation: Operation) {
        counter!(AUTH_SUCCESS, "operation" => operation.as_str()).increment(1);
    }

    async fn try_signup(
        &self,
        key: &RateLimitKey,
        request: &SignupRequest,
        credentials: &TenantCredentials,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        self.admit(key, now).await?;
        self.authenticate_tenant(credentials).await?;

        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;
        if !self.passwords.is_strong(&request.password) {
            return Err(AuthError::InvalidInput(
                "Password does not meet the strength requirements".to_string(),
            ));
        }
        let first_name = validate_person_name(request.first_name.as_deref(), "First name")?;
        let last_name = validate_person_name(request.last_name.as_deref(), "Last name")?;

        let tenant_id = credentials.tenant_id.as_str();
        if self
            .users
            .find_by_email_and_tenant(&email, tenant_id)
            .await?
            .is_some()
        {
            return Err(CredentialError::EmailAlreadyExists.into());
        }

        let password_hash = self.passwords.hash(&request.password).await?;
        let user = self
            .users
            .save(NewUser {
                tenant_id: tenant_id.to_string(),
                email,
                password_hash,
                first_name: first_name.map(str::to_string),
                last_name: last_name.map(str::to_string),
                created_at: now,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent signup for the same email.
                StoreError::Conflict(_) => AuthError::from(CredentialError::EmailAlreadyExists),
                other => AuthError::from(other),
            })?;

        info!(user = %user.id, tenant = tenant_id, "User signed up");
        self.open_session(&user.id, tenant_id, meta, now).await
    }

    async fn try_login(
        &self,
        key: &RateLimitKey,
        request: &LoginRequest,
        credentials: &TenantCredentials,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        self.admit(key, now).await?;
        self.authenticate_tenant(credentials).await?;

        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;

        let tenant_id = credentials.tenant_id.as_str();
        let user = self
            .users
            .find_by_email_and_tenant(&email, tenant_id)
            .await?
            .ok_or(CredentialError::UserNotFound)?;

        if !self
            .passwords
            .verify(&user.password_hash, &request.password)
            .await
        {
            return Err(CredentialError::InvalidPassword.into());
        }

        self.open_session(&user.id, tenant_id, meta, now).await
    }

    async fn try_validate(
        &self,
        key: &RateLimitKey,
        token: &str,
        credentials: &TenantCredentials,
        now: DateTime<Utc>,
    ) -> Result<ValidatedToken, AuthError> {
        self.admit(key, now).await?;
        self.authenticate_tenant(credentials).await?;

        let claims = self.tokens.verify(token, now)?;
        if claims.tenant_id != credentials.tenant_id {
            return Err(SessionError::TenantMismatch.into());
        }
        let session = self
            .sessions
            .validate(&claims.jti, &credentials.tenant_id, now)
            .await?;

        Ok(ValidatedToken {
            user_id: claims.sub,
            tenant_id: session.tenant_id,
            session_id: session.id,
        })
    }

    async fn try_logout(
        &self,
        key: &RateLimitKey,
        token: &str,
        credentials: &TenantCredentials,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.admit(key, now).await?;
        self.authenticate_tenant(credentials).await?;

        let claims = self.tokens.verify(token, now)?;
        if claims.tenant_id != credentials.tenant_id {
            return Err(SessionError::TenantMismatch.into());
        }
        if !self.sessions.deactivate(&claims.jti).await? {
            info!(session = %claims.jti, "Logout for a session that was already inactive");
        }
        Ok(claims.sub)
    }

    async fn try_register(
        &self,
        key: &RateLimitKey,
        registration: &TenantRegistration,
        now: DateTime<Utc>,
    ) -> Result<Tenant, AuthError> {
        self.admit(key, now).await?;

        let name = validate_tenant_name(&registration.name)?;
        let description = validate_description(registration.description.as_deref())?;
        let idle = validate_idle_timeout(registration.idle_timeout_minutes)?;
        Ok(self.tenants.register(name, description, idle, now).await?)
    }

    async fn try_rotate(
        &self,
        key: &RateLimitKey,
        credentials: &TenantCredentials,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.admit(key, now).await?;
        self.authenticate_tenant(credentials).await?;
        Ok(self
            .tenants
            .rotate_secret(&credentials.tenant_id, now)
            .await?)
    }
}

/// Rate-limit slot for the presented client id
fn tenant_scope(credentials: &TenantCredentials) -> &str {
    match validate_tenant_id(&credentials.tenant_id) {
        Ok(id) => id,
        Err(_) => MALFORMED_SCOPE,
    }
}

fn failure_event(
    kind: AuditEventType,
    meta: &RequestMeta,
    err: &AuthError,
    now: DateTime<Utc>,
) -> AuditEvent {
    AuditEvent::new(kind, meta, status_for(err).as_u16(), now).with_error_code(err.reason_code())
}

#[async_trait]
impl AuthService for AuthCoordinator {
    async fn signup(
        &self,
        request: SignupRequest,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(&meta.ip_address, tenant_scope(&credentials), Operation::Signup);
        let audit_email = request.email.trim().to_lowercase();

        let result = self
            .try_signup(&key, &request, &credentials, &meta, now)
            .await;
        let event = match &result {
            Ok(_) => {
                self.accepted(Operation::Signup);
                AuditEvent::new(AuditEventType::SignupSuccess, &meta, 200, now)
            },
            Err(err) => {
                self.reject(&key, err, now).await;
                failure_event(AuditEventType::SignupFailure, &meta, err, now)
            },
        };
        self.audit
            .dispatch(
                event
                    .with_email(audit_email)
                    .with_tenant(credentials.tenant_id.as_str()),
            )
            .await;
        result
    }

    async fn login(
        &self,
        request: LoginRequest,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(&meta.ip_address, tenant_scope(&credentials), Operation::Login);
        let audit_email = request.email.trim().to_lowercase();

        let result = self
            .try_login(&key, &request, &credentials, &meta, now)
            .await;
        let event = match &result {
            Ok(issued) => {
                self.accepted(Operation::Login);
                info!(user = %issued.user_id, session = %issued.session_id, tenant = %credentials.tenant_id, "User logged in");
                AuditEvent::new(AuditEventType::LoginSuccess, &meta, 200, now)
            },
            Err(err) => {
                self.reject(&key, err, now).await;
                failure_event(AuditEventType::LoginFailure, &meta, err, now)
            },
        };
        self.audit
            .dispatch(
                event
                    .with_email(audit_email)
                    .with_tenant(credentials.tenant_id.as_str()),
            )
            .await;
        result
    }

    async fn validate_token(
        &self,
        token: &str,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<ValidatedToken, AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(
            &meta.ip_address,
            tenant_scope(&credentials),
            Operation::TokenValidation,
        );

        let result = self.try_validate(&key, token, &credentials, now).await;
        match &result {
            Ok(_) => self.accepted(Operation::TokenValidation),
            Err(err) => {
                self.reject(&key, err, now).await;
                self.audit
                    .dispatch(
                        failure_event(AuditEventType::TokenValidationFailure, &meta, err, now)
                            .with_tenant(credentials.tenant_id.as_str()),
                    )
                    .await;
            },
        }
        result
    }

    async fn logout(
        &self,
        token: &str,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(&meta.ip_address, tenant_scope(&credentials), Operation::ApiCall);

        match self.try_logout(&key, token, &credentials, now).await {
            Ok(user_id) => {
                self.accepted(Operation::ApiCall);
                info!(user = %user_id, tenant = %credentials.tenant_id, "User logged out");
                self.audit
                    .dispatch(
                        AuditEvent::new(AuditEventType::Logout, &meta, 200, now)
                            .with_tenant(credentials.tenant_id.as_str()),
                    )
                    .await;
                Ok(())
            },
            Err(err) => {
                self.reject(&key, &err, now).await;
                Err(err)
            },
        }
    }

    async fn logout_all(&self, user_id: &str, meta: RequestMeta) -> Result<usize, AuthError> {
        let now = self.clock.now();
        let ended = self.sessions.deactivate_all_for_user(user_id).await?;
        info!(user = user_id, sessions = ended.len(), "Ended all sessions for user");
        self.audit
            .dispatch(AuditEvent::new(AuditEventType::Logout, &meta, 200, now))
            .await;
        Ok(ended.len())
    }

    async fn register_tenant(
        &self,
        registration: TenantRegistration,
        meta: RequestMeta,
    ) -> Result<Tenant, AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(&meta.ip_address, REGISTRATION_SCOPE, Operation::ApiCall);

        match self.try_register(&key, &registration, now).await {
            Ok(tenant) => {
                self.accepted(Operation::ApiCall);
                self.audit
                    .dispatch(
                        AuditEvent::new(AuditEventType::ClientRegistration, &meta, 201, now)
                            .with_tenant(tenant.id.as_str()),
                    )
                    .await;
                Ok(tenant)
            },
            Err(err) => {
                self.reject(&key, &err, now).await;
                Err(err)
            },
        }
    }

    async fn rotate_tenant_secret(
        &self,
        credentials: TenantCredentials,
        meta: RequestMeta,
    ) -> Result<String, AuthError> {
        let now = self.clock.now();
        let key = RateLimitKey::new(&meta.ip_address, tenant_scope(&credentials), Operation::ApiCall);

        let result = self.try_rotate(&key, &credentials, now).await;
        let event = match &result {
            Ok(_) => {
                self.accepted(Operation::ApiCall);
                AuditEvent::new(AuditEventType::ClientKeyRotationSuccess, &meta, 200, now)
            },
            Err(err) => {
                self.reject(&key, err, now).await;
                failure_event(AuditEventType::ClientKeyRotationFailed, &meta, err, now)
            },
        };
        self.audit
            .dispatch(event.with_tenant(credentials.tenant_id.as_str()))
            .await;
        result
    }
}
