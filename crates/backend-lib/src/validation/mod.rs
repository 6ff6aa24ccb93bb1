// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation for auth and tenant requests.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::AuthError;

// Common validation constants
const MAX_TENANT_ID_LENGTH: usize = 64;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_IDLE_TIMEOUT_MINUTES: u32 = 24 * 60;

// Regex patterns for validation
static TENANT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^<>/\\{}()\[\];]*$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid client id: {0}")]
    InvalidTenantId(String),

    #[error("Invalid idle timeout: {0}")]
    InvalidIdleTimeout(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an email address, returning its normalized (trimmed, lowercase) form
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email.to_lowercase())
}

/// Validate the shape of a presented password; strength is a signup-only policy
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password must not be empty".to_string(),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(password)
}

/// Validate an optional person name (first/last)
pub fn validate_person_name<'a>(name: Option<&'a str>, field: &str) -> ValidationResult<Option<&'a str>> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    check_name(name, field)?;
    Ok(Some(name))
}

/// Validate a tenant display name
pub fn validate_tenant_name(name: &str) -> ValidationResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidName(
            "Client name must not be empty".to_string(),
        ));
    }
    check_name(name, "Client name")?;
    Ok(name)
}

/// Validate an optional tenant description
pub fn validate_description(description: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(Some(description.to_string()))
}

/// Validate a tenant id as presented in `X-Client-Id`
pub fn validate_tenant_id(tenant_id: &str) -> ValidationResult<&str> {
    if tenant_id.is_empty() || tenant_id.len() > MAX_TENANT_ID_LENGTH {
        return Err(ValidationError::InvalidTenantId(format!(
            "Client id must be between 1 and {MAX_TENANT_ID_LENGTH} characters"
        )));
    }

    if !TENANT_ID_REGEX.is_match(tenant_id) {
        return Err(ValidationError::InvalidTenantId(
            "Client id must be alphanumeric".to_string(),
        ));
    }

    Ok(tenant_id)
}

/// Validate a requested idle timeout
pub fn validate_idle_timeout(minutes: Option<u32>) -> ValidationResult<Option<u32>> {
    match minutes {
        Some(m) if m == 0 || m > MAX_IDLE_TIMEOUT_MINUTES => Err(ValidationError::InvalidIdleTimeout(format!(
            "Idle timeout must be between 1 and {MAX_IDLE_TIMEOUT_MINUTES} minutes"
        ))),
        other => Ok(other),
    }
}

fn check_name(name: &str, field: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "{field} must be between 1 and {MAX_NAME_LENGTH} characters"
        )));
    }

    // Check for potentially dangerous characters
    if !NAME_REGEX.is_match(name) {
        return Err(ValidationError::InvalidName(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(())
}
