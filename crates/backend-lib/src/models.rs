// ============================
// crates/backend-lib/src/models.rs
// ============================
//! Records owned by the auth core.
//!
//! These are plain values. Stores hand out clones and accept whole new
//! values back; nothing here is shared mutably across tasks.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An isolated customer namespace ("client" on the wire)
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    /// Public identifier sent in `X-Client-Id`
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque credential sent in `X-Client-Key`
    pub secret: String,
    /// Maximum gap between validated activities
    pub idle_timeout_minutes: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn idle_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.idle_timeout_minutes))
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("secret", &"<redacted>")
            .field("idle_timeout_minutes", &self.idle_timeout_minutes)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// An end-user of one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    /// scrypt PHC string
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user the store has not assigned an id to yet
#[derive(Debug, Clone)]
pub struct NewUser {
    pub tenant_id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller metadata captured at the edge
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestMeta {
    /// Resolved client address, `"unknown"` when the edge could not tell
    pub ip_address: String,
    pub user_agent: Option<String>,
    /// Request path, for audit records only
    pub endpoint: Option<String>,
}

impl RequestMeta {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Server-side session bound to a token's `jti`
///
/// Invariants: `expires_at > created_at` and
/// `created_at <= last_activity_at <= now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub active: bool,
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl Session {
    /// True once `now` is past the absolute expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// True once `now` is past `last_activity_at + idle_timeout`
    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now > self.last_activity_at + idle_timeout
    }

    /// Copy with a later activity time; older timestamps are ignored
    pub fn touched(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if at > next.last_activity_at {
            next.last_activity_at = at;
        }
        next
    }

    pub fn deactivated(&self) -> Self {
        Self {
            active: false,
            ..self.clone()
        }
    }
}
