// ============================
// tests/integration/maintenance_tests.rs
// ============================
//! Background cleanup driven through the wired service
use chrono::Duration;
use guardian_backend::auth::{LoginRequest, StoreSweep};
use guardian_backend::error::{AuthError, SessionError};
use guardian_tests::test_utils::setup_test_env;

fn login(password: &str) -> LoginRequest {
    LoginRequest {
        email: "a@x.com".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn store_sweep_ends_idle_sessions_then_purges_them() {
    let env = setup_test_env().await;
    env.seed_user("a@x.com", "pw").await;
    let auth = env.guardian.auth();
    let sweepers = env.guardian.sweepers();

    let idle = auth.login(login("pw"), env.credentials(), env.meta()).await.unwrap();
    env.clock.advance(Duration::minutes(20));
    let busy = auth.login(login("pw"), env.credentials(), env.meta()).await.unwrap();

    // 31 minutes after the first login only that session is past the tenant's 30 minute limit.
    env.clock.advance(Duration::minutes(11));
    assert_eq!(
        sweepers.sweep_sessions().await,
        Some(StoreSweep { deactivated: 1, purged: 0 })
    );

    let err = auth
        .validate_token(&idle.token, env.credentials(), env.meta())
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::Session(SessionError::Inactive));
    assert!(auth
        .validate_token(&busy.token, env.credentials(), env.meta())
        .await
        .is_ok());

    // Past retention both records go; the busy one is deactivated first.
    env.clock.advance(Duration::hours(25));
    let sweep = sweepers.sweep_sessions().await.unwrap();
    assert_eq!(sweep.deactivated, 1);
    assert_eq!(sweep.purged, 2);
}

#[tokio::test]
async fn cache_sweep_drops_ended_sessions() {
    let env = setup_test_env().await;
    env.seed_user("a@x.com", "pw").await;
    let auth = env.guardian.auth();

    auth.login(login("pw"), env.credentials(), env.meta()).await.unwrap();
    assert_eq!(env.guardian.sweepers().sweep_cache(), 0);

    // The token lifetime bounds the cached copy.
    env.clock.advance(Duration::hours(2));
    assert_eq!(env.guardian.sweepers().sweep_cache(), 1);
}

#[tokio::test]
async fn rate_limit_sweep_forgets_quiet_sources() {
    let env = setup_test_env().await;
    env.seed_user("a@x.com", "pw").await;
    let auth = env.guardian.auth();

    auth.login(login("wrong"), env.credentials(), env.meta())
        .await
        .unwrap_err();
    assert_eq!(env.guardian.sweepers().sweep_rate_limits().await, 0);

    env.clock.advance(Duration::hours(25));
    assert_eq!(env.guardian.sweepers().sweep_rate_limits().await, 1);
    assert_eq!(env.guardian.sweepers().sweep_rate_limits().await, 0);
}

#[tokio::test]
async fn maintenance_stops_on_shutdown() {
    let env = setup_test_env().await;
    let maintenance = env.guardian.spawn_maintenance();
    tokio::time::timeout(std::time::Duration::from_secs(5), maintenance.shutdown())
        .await
        .unwrap();
}
