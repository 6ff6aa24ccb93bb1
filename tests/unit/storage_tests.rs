// ============================
// tests/unit/storage_tests.rs
// ============================
//! Storage collaborators: flat-file tenants and in-memory users
use chrono::Utc;
use guardian_backend::error::StoreError;
use guardian_backend::models::{NewUser, Tenant};
use guardian_backend::storage::{FlatFileTenantStore, InMemoryUserStore, TenantStore, UserStore};
use guardian_tests::test_utils::start_time;
use tempfile::tempdir;

fn tenant(id: &str) -> Tenant {
    Tenant {
        id: id.to_string(),
        name: "Acme".to_string(),
        description: None,
        secret: "first-secret".to_string(),
        idle_timeout_minutes: 15,
        created_at: start_time(),
        updated_at: None,
    }
}

fn user(tenant_id: &str, email: &str) -> NewUser {
    NewUser {
        tenant_id: tenant_id.to_string(),
        email: email.to_string(),
        password_hash: "$scrypt$placeholder".to_string(),
        first_name: None,
        last_name: None,
        created_at: start_time(),
    }
}

#[tokio::test]
async fn flat_file_tenants_survive_reopening() {
    let dir = tempdir().unwrap();
    {
        let store = FlatFileTenantStore::new(dir.path()).await.unwrap();
        store.insert(tenant("ABC123")).await.unwrap();
        let rotated_at = Utc::now();
        assert!(store
            .update_secret("ABC123", "second-secret", rotated_at)
            .await
            .unwrap());
    }

    let reopened = FlatFileTenantStore::new(dir.path()).await.unwrap();
    let loaded = reopened.find("ABC123").await.unwrap().unwrap();
    assert_eq!(loaded.secret, "second-secret");
    assert_eq!(loaded.idle_timeout_minutes, 15);
    assert!(loaded.updated_at.is_some());
    assert!(dir.path().join("tenants").join("ABC123.json").exists());
}

#[tokio::test]
async fn flat_file_rejects_duplicates_and_odd_ids() {
    let dir = tempdir().unwrap();
    let store = FlatFileTenantStore::new(dir.path()).await.unwrap();
    store.insert(tenant("ABC123")).await.unwrap();

    assert!(matches!(
        store.insert(tenant("ABC123")).await,
        Err(StoreError::Conflict(_))
    ));
    assert!(store.find("../ABC123").await.unwrap().is_none());
    assert!(!store
        .update_secret("NOPE99", "x", Utc::now())
        .await
        .unwrap());
}

#[tokio::test]
async fn users_are_unique_per_tenant() {
    let users = InMemoryUserStore::new();
    let first = users.save(user("ABC123", "a@x.com")).await.unwrap();
    assert!(!first.id.is_empty());

    assert!(matches!(
        users.save(user("ABC123", "a@x.com")).await,
        Err(StoreError::Conflict(_))
    ));
    // Same email under another tenant is a different account.
    let other = users.save(user("XYZ789", "a@x.com")).await.unwrap();
    assert_ne!(other.id, first.id);

    let found = users
        .find_by_email_and_tenant("a@x.com", "ABC123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
    assert!(users
        .find_by_email_and_tenant("b@x.com", "ABC123")
        .await
        .unwrap()
        .is_none());
}
