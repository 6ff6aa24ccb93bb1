// ============================
// crates/backend-lib/src/handlers/clients.rs
// ============================
//! Tenant ("client") administration endpoints.
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use guardian_common::{
    ClientRegistrationRequest, ClientRegistrationResponse, HealthResponse, KeyRotationResponse,
};

use super::extract::{ClientMeta, TenantAuth};
use crate::auth::TenantRegistration;
use crate::error::AppError;
use crate::AppState;

/// `POST /api/clients/register`
pub async fn register(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<ClientRegistrationRequest>,
) -> Result<(StatusCode, Json<ClientRegistrationResponse>), AppError> {
    let registration = TenantRegistration {
        name: body.name,
        description: body.description,
        idle_timeout_minutes: body.idle_timeout_minutes,
    };
    let tenant = state.auth.register_tenant(registration, meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(ClientRegistrationResponse {
            client_id: tenant.id,
            client_key: tenant.secret,
            name: tenant.name,
            description: tenant.description.unwrap_or_default(),
            idle_timeout_minutes: tenant.idle_timeout_minutes,
            created_at: tenant.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
    ))
}

/// `POST /api/clients/rotate-key`: the current key authorizes its replacement
pub async fn rotate_key(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
) -> Result<Json<KeyRotationResponse>, AppError> {
    let client_id = credentials.tenant_id.clone();
    let new_client_key = state.auth.rotate_tenant_secret(credentials, meta).await?;
    Ok(Json(KeyRotationResponse {
        client_id,
        new_client_key,
        message: "Client key rotated; the previous key is no longer valid".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
