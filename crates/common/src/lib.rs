// ================
// common/src/lib.rs
// ================
//! Common request/response bodies
//! shared between the Guardian auth server and its client libraries.
//! Field names follow the camelCase JSON the existing clients send.

use serde::{Deserialize, Serialize};

/// Header carrying the tenant identifier
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Header carrying the tenant secret
pub const CLIENT_KEY_HEADER: &str = "x-client-key";

/// Body of `POST /api/auth/signup` and `POST /api/auth/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
    /// Only read on signup
    #[serde(default)]
    pub first_name: Option<String>,
    /// Only read on signup
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Successful signup or login
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,
    /// Always `"Bearer"`
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

/// Body of `POST /api/auth/validate`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenValidationRequest {
    pub token: String,
}

/// Successful token validation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidationResponse {
    pub valid: bool,
    pub user_id: String,
    pub client_id: String,
    pub session_id: String,
}

/// Body of `POST /api/clients/register`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistrationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Falls back to the server default (30 minutes) when absent
    #[serde(default)]
    pub idle_timeout_minutes: Option<u32>,
}

/// Credentials handed back once, at registration time
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    pub client_key: String,
    pub name: String,
    pub description: String,
    pub idle_timeout_minutes: u32,
    pub created_at: String,
}

/// Response of `POST /api/clients/rotate-key`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KeyRotationResponse {
    pub client_id: String,
    /// Replaces the previous key immediately
    pub new_client_key: String,
    pub message: String,
    pub timestamp: String,
}

/// Plain acknowledgement, e.g. for logout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Response of `POST /api/auth/logout-all`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub sessions_ended: usize,
}

/// Response of `GET /health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// JSON error envelope returned on every non-2xx response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Stable error code plus a human readable message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// Present on rate limit denials
    #[serde(rename = "retryAfter", default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}
