// ============================
// tests/unit/session_tests.rs
// ============================
//! Session lifecycle through the cache + store facade
use chrono::{Duration, Utc};
use guardian_backend::auth::{SessionManager, TenantRegistry};
use guardian_backend::error::{AuthError, SessionError};
use guardian_backend::models::{RequestMeta, Tenant};
use guardian_backend::storage::{InMemorySessionStore, InMemoryTenantStore, SessionStore, TenantStore};
use guardian_tests::test_utils::start_time;
use std::collections::HashSet;
use std::sync::Arc;

struct Harness {
    sessions: Arc<SessionManager>,
    store: InMemorySessionStore,
}

async fn harness() -> Harness {
    let tenants = InMemoryTenantStore::new();
    for (id, idle) in [("FAST01", 5), ("SLOW01", 120)] {
        tenants
            .insert(Tenant {
                id: id.to_string(),
                name: id.to_lowercase(),
                description: None,
                secret: format!("{id}-secret"),
                idle_timeout_minutes: idle,
                created_at: Utc::now(),
                updated_at: None,
            })
            .await
            .unwrap();
    }
    let registry = Arc::new(TenantRegistry::new(Arc::new(tenants), Duration::minutes(30)));
    let store = InMemorySessionStore::new();
    let sessions = Arc::new(SessionManager::new(
        Arc::new(store.clone()),
        registry,
        Duration::hours(3),
    ));
    Harness { sessions, store }
}

fn meta() -> RequestMeta {
    RequestMeta::new("198.51.100.20")
}

#[tokio::test]
async fn concurrent_creates_yield_distinct_valid_sessions() {
    let h = harness().await;
    let now = start_time();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let sessions = h.sessions.clone();
        tasks.push(tokio::spawn(async move {
            sessions.create("u-1", "SLOW01", &meta(), now).await.unwrap()
        }));
    }
    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().id);
    }
    assert_eq!(ids.len(), 16);

    for id in &ids {
        assert!(h.sessions.validate(id, "SLOW01", now).await.is_ok());
    }
}

#[tokio::test]
async fn idle_timeout_follows_the_tenant() {
    let h = harness().await;
    let t0 = start_time();
    let fast = h.sessions.create("u-1", "FAST01", &meta(), t0).await.unwrap();
    let slow = h.sessions.create("u-2", "SLOW01", &meta(), t0).await.unwrap();

    let later = t0 + Duration::minutes(10);
    assert_eq!(
        h.sessions.validate(&fast.id, "FAST01", later).await.unwrap_err(),
        AuthError::Session(SessionError::IdleTimeoutExceeded)
    );
    assert!(h.sessions.validate(&slow.id, "SLOW01", later).await.is_ok());

    // The idle session stays dead even if time is rewound.
    assert_eq!(
        h.sessions.validate(&fast.id, "FAST01", t0).await.unwrap_err(),
        AuthError::Session(SessionError::Inactive)
    );
}

#[tokio::test]
async fn activity_keeps_a_session_alive_until_absolute_expiry() {
    let h = harness().await;
    let t0 = start_time();
    let session = h.sessions.create("u-1", "FAST01", &meta(), t0).await.unwrap();

    let mut now = t0;
    while now + Duration::minutes(4) <= session.expires_at {
        now += Duration::minutes(4);
        assert!(h.sessions.validate(&session.id, "FAST01", now).await.is_ok());
    }
    assert_eq!(
        h.sessions
            .validate(&session.id, "FAST01", session.expires_at + Duration::seconds(1))
            .await
            .unwrap_err(),
        AuthError::Session(SessionError::Expired)
    );
}

#[tokio::test]
async fn store_wins_over_a_stale_cache_entry() {
    let h = harness().await;
    let now = start_time();
    let session = h.sessions.create("u-1", "SLOW01", &meta(), now).await.unwrap();
    assert_eq!(h.sessions.cache().len(), 1);

    // Deactivated behind the cache's back.
    assert!(h.store.deactivate(&session.id).await.unwrap());

    assert_eq!(
        h.sessions.validate(&session.id, "SLOW01", now).await.unwrap_err(),
        AuthError::Session(SessionError::Inactive)
    );
    assert!(h.sessions.cache().is_empty());
}

#[tokio::test]
async fn deactivation_is_idempotent_and_tenant_bound() {
    let h = harness().await;
    let now = start_time();
    let session = h.sessions.create("u-1", "SLOW01", &meta(), now).await.unwrap();

    assert_eq!(
        h.sessions.validate(&session.id, "FAST01", now).await.unwrap_err(),
        AuthError::Session(SessionError::TenantMismatch)
    );
    assert!(h.sessions.deactivate(&session.id).await.unwrap());
    assert!(!h.sessions.deactivate(&session.id).await.unwrap());
    assert!(!h.sessions.deactivate("no-such-session").await.unwrap());
    assert_eq!(
        h.sessions.validate("no-such-session", "SLOW01", now).await.unwrap_err(),
        AuthError::Session(SessionError::NotFound)
    );
}
