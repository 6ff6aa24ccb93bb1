// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! End-user auth endpoints under `/api/auth`.
use axum::extract::State;
use axum::Json;
use guardian_common::{
    AuthRequest, LogoutAllResponse, MessageResponse, TokenResponse, TokenValidationRequest,
    TokenValidationResponse,
};

use super::extract::{BearerToken, ClientMeta, TenantAuth};
use crate::auth::{IssuedToken, LoginRequest, SignupRequest};
use crate::error::AppError;
use crate::AppState;

const TOKEN_TYPE: &str = "Bearer";

fn token_response(issued: IssuedToken) -> Json<TokenResponse> {
    Json(TokenResponse {
        token: issued.token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: issued.expires_in_secs,
    })
}

/// `POST /api/auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<AuthRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let request = SignupRequest {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
    };
    let issued = state.auth.signup(request, credentials, meta).await?;
    Ok(token_response(issued))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<AuthRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let request = LoginRequest {
        email: body.email,
        password: body.password,
    };
    let issued = state.auth.login(request, credentials, meta).await?;
    Ok(token_response(issued))
}

/// `POST /api/auth/validate`
pub async fn validate(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<TokenValidationRequest>,
) -> Result<Json<TokenValidationResponse>, AppError> {
    let validated = state
        .auth
        .validate_token(body.token.trim(), credentials, meta)
        .await?;
    Ok(Json(TokenValidationResponse {
        valid: true,
        user_id: validated.user_id,
        client_id: validated.tenant_id,
        session_id: validated.session_id,
    }))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.logout(&token, credentials, meta).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// `POST /api/auth/logout-all`: ends every session of the token's user
pub async fn logout_all(
    State(state): State<AppState>,
    TenantAuth(credentials): TenantAuth,
    ClientMeta(meta): ClientMeta,
    BearerToken(token): BearerToken,
) -> Result<Json<LogoutAllResponse>, AppError> {
    let validated = state
        .auth
        .validate_token(&token, credentials, meta.clone())
        .await?;
    let sessions_ended = state.auth.logout_all(&validated.user_id, meta).await?;
    Ok(Json(LogoutAllResponse { sessions_ended }))
}
