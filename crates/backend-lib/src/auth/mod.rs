// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod rate_limit;
pub mod session;
pub mod session_cache;
pub mod tenant;
pub mod token;
pub mod token_generator;
mod service;
mod service_impl;

pub use password::{
    hash_password, validate_password_strength, verify_password, PasswordPolicy, PasswordRequirements,
    MIN_PASSWORD_LENGTH,
};
pub use rate_limit::{AuthRateLimiter, Operation, RateLimitKey, RateLimitPolicy, RateLimitResult, RateLimitWindow};
pub use service::{
    AuthService, IssuedToken, LoginRequest, SignupRequest, TenantCredentials, TenantRegistration,
    ValidatedToken,
};
pub use service_impl::{AuthComponents, AuthCoordinator};
pub use session::{SessionManager, StoreSweep};
pub use session_cache::SessionCache;
pub use tenant::TenantRegistry;
pub use token::{Claims, TokenCodec};
