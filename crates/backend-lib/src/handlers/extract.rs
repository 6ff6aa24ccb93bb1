// ============================
// crates/backend-lib/src/handlers/extract.rs
// ============================
//! Request extractors: caller metadata, tenant credentials, bearer tokens.
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use guardian_common::{CLIENT_ID_HEADER, CLIENT_KEY_HEADER};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::auth::TenantCredentials;
use crate::error::{AppError, AuthError, TokenError};
use crate::models::RequestMeta;
use crate::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const UNKNOWN_ADDRESS: &str = "unknown";

/// Whether forwarding headers name the client, from `server.trust_forwarded_headers`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTrust(pub bool);

impl FromRef<AppState> for ProxyTrust {
    fn from_ref(state: &AppState) -> Self {
        Self(state.settings.server.trust_forwarded_headers)
    }
}

/// Caller address, user agent and path
#[derive(Debug, Clone)]
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    ProxyTrust: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust = ProxyTrust::from_ref(state);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let mut meta = RequestMeta::new(client_address(&parts.headers, peer, trust))
            .with_endpoint(parts.uri.path());
        if let Some(agent) = header_str(&parts.headers, USER_AGENT.as_str()) {
            meta = meta.with_user_agent(agent);
        }
        Ok(Self(meta))
    }
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`, else the socket peer
///
/// The forwarding headers are client-supplied unless a proxy in front of the
/// server rewrites them. With `ProxyTrust(false)` only the peer counts.
pub fn client_address(headers: &HeaderMap, peer: Option<String>, trust: ProxyTrust) -> String {
    if trust.0 {
        if let Some(first) = header_str(headers, FORWARDED_FOR)
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return first.to_string();
        }
        if let Some(real) = header_str(headers, REAL_IP) {
            return real.to_string();
        }
    }
    peer.unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// `X-Client-Id` / `X-Client-Key` pair; both are required
///
/// The id is not checked for shape here; the auth core rejects malformed
/// ids as bad credentials so they are rate limited and audited.
#[derive(Debug, Clone)]
pub struct TenantAuth(pub TenantCredentials);

impl<S> FromRequestParts<S> for TenantAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (Some(id), Some(key)) = (
            header_str(&parts.headers, CLIENT_ID_HEADER),
            header_str(&parts.headers, CLIENT_KEY_HEADER),
        ) else {
            return Err(AppError::BadRequest(
                "Missing X-Client-Id or X-Client-Key header".to_string(),
            ));
        };
        Ok(Self(TenantCredentials::new(id, key)))
    }
}

/// Token from `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_str(&parts.headers, AUTHORIZATION.as_str())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Self(token.to_string()))
            .ok_or(AppError::Auth(AuthError::Token(TokenError::Malformed)))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
