// ============================
// tests/unit/token_tests.rs
// ============================
//! Token codec behaviour seen from outside the crate
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use guardian_backend::auth::TokenCodec;
use guardian_backend::error::TokenError;
use guardian_tests::test_utils::{start_time, TEST_SECRET};

fn codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET.as_bytes(), Duration::hours(1))
}

#[test]
fn token_from_another_secret_is_rejected() {
    let foreign = TokenCodec::new(b"some-other-secret-of-reasonable-length", Duration::hours(1));
    let token = foreign.issue("user-1", "ABC123", "sess-1", start_time()).unwrap();
    assert_eq!(codec().verify(&token, start_time()), Err(TokenError::SignatureInvalid));
}

#[test]
fn rewritten_claims_break_the_signature() {
    let token = codec().issue("user-1", "ABC123", "sess-1", start_time()).unwrap();
    let parts: Vec<&str> = token.split('.').collect();

    let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
    let forged = String::from_utf8(payload).unwrap().replace("ABC123", "XYZ789");
    let forged_token = format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(forged), parts[2]);

    assert_eq!(
        codec().verify(&forged_token, start_time()),
        Err(TokenError::SignatureInvalid)
    );
}

#[test]
fn garbage_is_malformed() {
    for token in ["", "not-a-token", "a.b.c"] {
        assert_eq!(codec().verify(token, start_time()), Err(TokenError::Malformed), "{token:?}");
    }
}

#[test]
fn lifetime_follows_the_configured_ttl() {
    let short = TokenCodec::new(TEST_SECRET.as_bytes(), Duration::minutes(5));
    let token = short.issue("user-1", "ABC123", "sess-1", start_time()).unwrap();
    let claims = short.verify(&token, start_time() + Duration::minutes(4)).unwrap();
    assert_eq!(claims.exp - claims.iat, 300);
    assert_eq!(
        short.verify(&token, start_time() + Duration::minutes(5)),
        Err(TokenError::Expired)
    );
}
