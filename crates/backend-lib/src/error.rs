// ============================
// crates/backend-lib/src/error.rs
// ============================
//! Error taxonomy of the auth core + Axum integration.
//!
//! Core operations return [`AuthError`], a tagged union of the kinds below.
//! Only the HTTP edge ([`AppError`]) turns a kind into a status code.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use guardian_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Tenant or end-user credential failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Invalid client credentials")]
    InvalidTenantCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Email already exists for this client")]
    EmailAlreadyExists,
}

/// Rate limiter denials, both carrying the seconds until a retry can succeed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Too many requests, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("Rate limit exceeded, blocked for {retry_after_secs}s")]
    Blocked { retry_after_secs: u64 },
}

impl RateLimitError {
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateLimitError::Throttled { retry_after_secs }
            | RateLimitError::Blocked { retry_after_secs } => *retry_after_secs,
        }
    }
}

/// Bearer token failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token could not be signed: {0}")]
    Signing(String),
}

/// Server-side session failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session is inactive")]
    Inactive,

    #[error("Session belongs to another client")]
    TenantMismatch,

    #[error("Session has expired")]
    Expired,

    #[error("Session idle timeout exceeded")]
    IdleTimeoutExceeded,
}

/// Durable-store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Tenant administration failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Client {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of every coordinator operation that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for AuthError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => AuthError::Credential(CredentialError::InvalidTenantCredentials),
            RegistryError::Store(e) => AuthError::Infrastructure(e),
        }
    }
}

impl AuthError {
    /// Whether this failure is charged against the caller's rate-limit window
    pub fn counts_as_failed_attempt(&self) -> bool {
        matches!(
            self,
            AuthError::Credential(_) | AuthError::RateLimited(_) | AuthError::InvalidInput(_)
        )
    }

    /// Stable reason code recorded in audit events
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::Credential(CredentialError::InvalidTenantCredentials) => "INVALID_CLIENT_KEY",
            AuthError::Credential(CredentialError::UserNotFound) => "USER_NOT_FOUND",
            AuthError::Credential(CredentialError::InvalidPassword) => "INVALID_PASSWORD",
            AuthError::Credential(CredentialError::EmailAlreadyExists) => "EMAIL_EXISTS",
            AuthError::RateLimited(RateLimitError::Throttled { .. }) => "RATE_LIMITED",
            AuthError::RateLimited(RateLimitError::Blocked { .. }) => "RATE_BLOCKED",
            AuthError::Token(TokenError::Malformed) => "TOKEN_MALFORMED",
            AuthError::Token(TokenError::SignatureInvalid) => "TOKEN_SIGNATURE_INVALID",
            AuthError::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            AuthError::Token(TokenError::Signing(_)) => "TOKEN_SIGNING_FAILED",
            AuthError::Session(SessionError::NotFound) => "SESSION_NOT_FOUND",
            AuthError::Session(SessionError::Inactive) => "SESSION_INACTIVE",
            AuthError::Session(SessionError::TenantMismatch) => "SESSION_CLIENT_MISMATCH",
            AuthError::Session(SessionError::Expired) => "SESSION_EXPIRED",
            AuthError::Session(SessionError::IdleTimeoutExceeded) => "SESSION_IDLE_TIMEOUT",
            AuthError::InvalidInput(_) => "INVALID_INPUT",
            AuthError::Infrastructure(_) => "STORE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// HTTP-facing error: an [`AuthError`] or a request the edge could not parse
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => AppError::BadRequest(format!("Unknown client {id}")),
            RegistryError::Store(e) => AppError::Auth(AuthError::Infrastructure(e)),
        }
    }
}

/// Status code an [`AuthError`] is reported with, shared by responses and audit records
pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Credential(CredentialError::EmailAlreadyExists) => StatusCode::CONFLICT,
        AuthError::Credential(_) | AuthError::Token(TokenError::Malformed)
        | AuthError::Token(TokenError::SignatureInvalid)
        | AuthError::Token(TokenError::Expired)
        | AuthError::Session(_) => StatusCode::UNAUTHORIZED,
        AuthError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AuthError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Token(TokenError::Signing(_)) | AuthError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => status_for(err),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::Credential(CredentialError::InvalidTenantCredentials)) => "AUTH_001",
            AppError::Auth(AuthError::Credential(CredentialError::UserNotFound))
            | AppError::Auth(AuthError::Credential(CredentialError::InvalidPassword)) => "AUTH_002",
            AppError::Auth(AuthError::Credential(CredentialError::EmailAlreadyExists)) => "AUTH_003",
            AppError::Auth(AuthError::RateLimited(RateLimitError::Throttled { .. })) => "RATE_001",
            AppError::Auth(AuthError::RateLimited(RateLimitError::Blocked { .. })) => "RATE_002",
            AppError::Auth(AuthError::Token(TokenError::Signing(_))) => "TOKEN_002",
            AppError::Auth(AuthError::Token(_)) => "TOKEN_001",
            AppError::Auth(AuthError::Session(_)) => "SESSION_001",
            AppError::Auth(AuthError::InvalidInput(_)) | AppError::BadRequest(_) => "VAL_001",
            AppError::Auth(AuthError::Infrastructure(_)) => "STORE_001",
            AppError::Auth(AuthError::Internal(_)) | AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::Credential(CredentialError::InvalidTenantCredentials)) => {
                "Invalid client credentials".to_string()
            },
            AppError::Auth(AuthError::Credential(CredentialError::EmailAlreadyExists)) => {
                "Signup failed".to_string()
            },
            AppError::Auth(AuthError::Credential(_)) => "Invalid credentials".to_string(),
            AppError::Auth(AuthError::RateLimited(_)) => {
                "Too many requests, please try again later".to_string()
            },
            AppError::Auth(AuthError::Token(TokenError::Signing(_))) => {
                "An internal server error occurred".to_string()
            },
            AppError::Auth(AuthError::Token(_)) => "Invalid token".to_string(),
            AppError::Auth(AuthError::Session(_)) => "Session expired or invalid".to_string(),
            AppError::Auth(AuthError::InvalidInput(msg)) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Auth(AuthError::Infrastructure(_)) => {
                "Service temporarily unavailable".to_string()
            },
            AppError::Auth(AuthError::Internal(_)) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            AppError::Auth(AuthError::RateLimited(err)) => Some(err.retry_after_secs()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                retry_after,
            },
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
