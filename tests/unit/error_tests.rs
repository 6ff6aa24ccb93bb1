// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use axum::body::to_bytes;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use guardian_backend::error::{
    status_for, AppError, AuthError, CredentialError, RateLimitError, SessionError, StoreError,
    TokenError,
};
use guardian_common::ErrorBody;

#[test]
fn test_status_mapping_per_kind() {
    let cases = [
        (AuthError::from(CredentialError::InvalidTenantCredentials), StatusCode::UNAUTHORIZED),
        (AuthError::from(CredentialError::EmailAlreadyExists), StatusCode::CONFLICT),
        (
            AuthError::from(RateLimitError::Throttled { retry_after_secs: 10 }),
            StatusCode::TOO_MANY_REQUESTS,
        ),
        (AuthError::from(TokenError::SignatureInvalid), StatusCode::UNAUTHORIZED),
        (AuthError::from(SessionError::TenantMismatch), StatusCode::UNAUTHORIZED),
        (AuthError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
        (
            AuthError::from(StoreError::Unavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    ];
    for (err, status) in cases {
        assert_eq!(status_for(&err), status, "{err:?}");
        assert_eq!(AppError::from(err).status_code(), status);
    }
}

#[test]
fn test_reason_codes_are_stable() {
    assert_eq!(
        AuthError::from(CredentialError::InvalidTenantCredentials).reason_code(),
        "INVALID_CLIENT_KEY"
    );
    assert_eq!(AuthError::from(CredentialError::UserNotFound).reason_code(), "USER_NOT_FOUND");
    assert_eq!(
        AuthError::from(RateLimitError::Blocked { retry_after_secs: 1 }).reason_code(),
        "RATE_BLOCKED"
    );
}

#[tokio::test]
async fn test_error_envelope() {
    let response = AppError::from(AuthError::from(RateLimitError::Throttled {
        retry_after_secs: 42,
    }))
    .into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "42");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.error.code, "RATE_001");
    assert_eq!(body.error.retry_after, Some(42));
}
