// ============================
// crates/backend-lib/src/storage/flat_file.rs
// ============================
//! Flat-file tenant store: one pretty-printed JSON document per tenant.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tokio::sync::Mutex;

use super::TenantStore;
use crate::error::StoreError;
use crate::models::Tenant;

/// Stores tenants under `<root>/tenants/<id>.json`
#[derive(Debug)]
pub struct FlatFileTenantStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileTenantStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().join("tenants");
        tokio_fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Path for a tenant id; `None` for ids that could escape the directory
    fn tenant_path(&self, tenant_id: &str) -> Option<PathBuf> {
        if tenant_id.is_empty() || !tenant_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(self.root.join(format!("{tenant_id}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Tenant>, StoreError> {
        match tokio_fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Write to a sibling temp file and rename so readers never see a partial document.
    async fn write(&self, path: &Path, tenant: &Tenant) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(tenant)?;
        let tmp = path.with_extension("json.tmp");
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl TenantStore for FlatFileTenantStore {
    async fn find(&self, tenant_id: &str) -> Result<Option<Tenant>, StoreError> {
        match self.tenant_path(tenant_id) {
            Some(path) => self.read(&path).await,
            None => Ok(None),
        }
    }

    async fn insert(&self, tenant: Tenant) -> Result<(), StoreError> {
        let path = self
            .tenant_path(&tenant.id)
            .ok_or_else(|| StoreError::Conflict(format!("invalid tenant id {:?}", tenant.id)))?;

        let _guard = self.write_lock.lock().await;
        if tokio_fs::try_exists(&path).await? {
            return Err(StoreError::Conflict(format!("tenant {} exists", tenant.id)));
        }
        self.write(&path, &tenant).await
    }

    async fn update_secret(
        &self,
        tenant_id: &str,
        secret: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(path) = self.tenant_path(tenant_id) else {
            return Ok(false);
        };

        let _guard = self.write_lock.lock().await;
        let Some(mut tenant) = self.read(&path).await? else {
            return Ok(false);
        };
        tenant.secret = secret.to_string();
        tenant.updated_at = Some(updated_at);
        self.write(&path, &tenant).await?;
        Ok(true)
    }
}
