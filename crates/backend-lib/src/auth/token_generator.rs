// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure random identifiers for tenants
This module provides the tenant secret and tenant id generators. */
use rand::{Rng, RngCore};

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Length of a generated tenant identifier
pub const TENANT_ID_LENGTH: usize = 6;

const TENANT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/** Generate a cryptographically secure random token
Suitable for tenant secrets.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Generate a public tenant id such as `K3Q9ZA`
pub fn generate_tenant_id() -> String {
    let mut rng = rand::rng();
    (0..TENANT_ID_LENGTH)
        .map(|_| TENANT_ID_ALPHABET[rng.random_range(0..TENANT_ID_ALPHABET.len())] as char)
        .collect()
}
