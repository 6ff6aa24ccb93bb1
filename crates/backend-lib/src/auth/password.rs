// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

use crate::config::PasswordSettings;
use crate::error::AuthError;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

/// Hash a password using scrypt with the recommended parameters
pub fn hash_password(plain: &str) -> Result<String, HashError> {
    hash_password_with(plain, Params::recommended())
}

/// Hash a password using scrypt with explicit cost parameters
pub fn hash_password_with(plain: &str, params: Params) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)?
        .to_string();
    Ok(hash)
}

/// Verify a password against a hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}

/// Strength rules plus hashing cost, shared by signup and login
///
/// Hashing and verification are CPU-bound and run on the blocking pool.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    requirements: PasswordRequirements,
    params: Params,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            requirements: PasswordRequirements::default(),
            params: Params::recommended(),
        }
    }
}

impl PasswordPolicy {
    pub fn new(requirements: PasswordRequirements, params: Params) -> Self {
        Self {
            requirements,
            params,
        }
    }

    pub fn from_settings(settings: &PasswordSettings) -> Result<Self, AuthError> {
        let params = Params::new(
            settings.scrypt_log_n,
            Params::RECOMMENDED_R,
            Params::RECOMMENDED_P,
            Params::RECOMMENDED_LEN,
        )
        .map_err(|e| AuthError::Internal(format!("scrypt params: {e}")))?;
        let requirements = PasswordRequirements {
            min_length: settings.min_length,
            require_uppercase: settings.require_uppercase,
            require_lowercase: settings.require_lowercase,
            require_digit: settings.require_digit,
            require_special: settings.require_special,
        };
        Ok(Self::new(requirements, params))
    }

    pub fn requirements(&self) -> &PasswordRequirements {
        &self.requirements
    }

    pub fn is_strong(&self, password: &str) -> bool {
        validate_password_strength(password, &self.requirements)
    }

    /// Hash off the async executor; the plaintext copy is zeroized afterwards
    pub async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let mut plain = plain.to_string();
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let hashed = hash_password_with(&plain, params);
            plain.zeroize();
            hashed
        })
        .await
        .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// Verify off the async executor; any hashing failure counts as a mismatch
    pub async fn verify(&self, hash: &str, plain: &str) -> bool {
        let hash = hash.to_string();
        let mut plain = plain.to_string();
        tokio::task::spawn_blocking(move || {
            let ok = verify_password(&hash, &plain);
            plain.zeroize();
            ok
        })
        .await
        .unwrap_or(false)
    }
}
