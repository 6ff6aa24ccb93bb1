// ============================
// crates/backend-lib/src/auth/session_cache.rs
// ============================
//! In-memory accelerator over the session store.
//!
//! Entries are copies. The store is always authoritative and the cache is
//! only ever corrected towards it: entries are replaced, evicted or swept,
//! never used to overwrite durable state.
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::debug;

use crate::metrics::{SESSION_CACHE_EVICTED, SESSION_CACHE_SIZE};
use crate::models::Session;

#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    entries: Arc<DashMap<String, Session>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.entries.get(session_id).map(|s| s.clone())
    }

    pub fn put(&self, session: Session) {
        self.entries.insert(session.id.clone(), session);
        gauge!(SESSION_CACHE_SIZE).set(self.entries.len() as f64);
    }

    pub fn remove(&self, session_id: &str) -> Option<Session> {
        let removed = self.entries.remove(session_id).map(|(_, s)| s);
        if removed.is_some() {
            gauge!(SESSION_CACHE_SIZE).set(self.entries.len() as f64);
        }
        removed
    }

    /// Move a cached entry's activity forward; older timestamps are ignored
    pub fn touch(&self, session_id: &str, at: DateTime<Utc>) {
        if let Some(mut entry) = self.entries.get_mut(session_id) {
            *entry = entry.touched(at);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        gauge!(SESSION_CACHE_SIZE).set(0.0);
    }

    /// Remove entries that are expired or inactive at `now`
    ///
    /// Only removes; live entries are left untouched.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, session| session.active && !session.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            counter!(SESSION_CACHE_EVICTED).increment(removed as u64);
            debug!(removed, remaining = self.entries.len(), "Swept session cache");
        }
        gauge!(SESSION_CACHE_SIZE).set(self.entries.len() as f64);
        removed
    }
}
