// ============================
// crates/backend-lib/src/audit.rs
// ============================
//! Audit trail dispatch.
//!
//! Events go through a bounded queue drained by a small pool of workers.
//! When the queue is full (or the pool is gone) the caller writes the event
//! itself, so events are never dropped and the request path never waits on
//! queue space. Sink failures are logged and counted, never returned.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::AuditSettings;
use crate::error::StoreError;
use crate::geo::{GeoLocation, GeoResolver};
use crate::metrics::{AUDIT_FAILED, AUDIT_INLINE, AUDIT_QUEUED};
use crate::models::RequestMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    SignupSuccess,
    SignupFailure,
    LoginSuccess,
    LoginFailure,
    TokenValidationFailure,
    Logout,
    ClientRegistration,
    ClientKeyRotationSuccess,
    ClientKeyRotationFailed,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::SignupSuccess => "SIGNUP_SUCCESS",
            AuditEventType::SignupFailure => "SIGNUP_FAILURE",
            AuditEventType::LoginSuccess => "LOGIN_SUCCESS",
            AuditEventType::LoginFailure => "LOGIN_FAILURE",
            AuditEventType::TokenValidationFailure => "TOKEN_VALIDATION_FAILURE",
            AuditEventType::Logout => "LOGOUT",
            AuditEventType::ClientRegistration => "CLIENT_REGISTRATION",
            AuditEventType::ClientKeyRotationSuccess => "CLIENT_KEY_ROTATION_SUCCESS",
            AuditEventType::ClientKeyRotationFailed => "CLIENT_KEY_ROTATION_FAILED",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub user_email: Option<String>,
    pub tenant_id: Option<String>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub status_code: u16,
    pub error_code: Option<String>,
    /// Filled in by the dispatcher
    pub location: Option<GeoLocation>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, meta: &RequestMeta, status_code: u16, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_type,
            user_email: None,
            tenant_id: None,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            endpoint: meta.endpoint.clone(),
            status_code,
            error_code: None,
            location: None,
            occurred_at,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// Durable destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError>;
}

/// Writes each record as a structured `audit` tracing event
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        let (country, city) = event
            .location
            .as_ref()
            .map(|l| (l.country.as_str(), l.city.as_str()))
            .unwrap_or(("Unknown", "Unknown"));
        info!(
            target: "audit",
            event_type = event.event_type.as_str(),
            email = event.user_email.as_deref().unwrap_or("-"),
            tenant = event.tenant_id.as_deref().unwrap_or("-"),
            ip = %event.ip_address,
            user_agent = event.user_agent.as_deref().unwrap_or("-"),
            endpoint = event.endpoint.as_deref().unwrap_or("-"),
            status = event.status_code,
            error_code = event.error_code.as_deref().unwrap_or("-"),
            country,
            city,
            at = %event.occurred_at,
            "audit"
        );
        Ok(())
    }
}

/// Keeps every record in memory, oldest first
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<AuditEventType> {
        self.events.lock().iter().map(|e| e.event_type).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Bounded worker pool in front of an [`AuditSink`]
pub struct AuditDispatcher {
    sink: Arc<dyn AuditSink>,
    geo: Arc<dyn GeoResolver>,
    sender: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AuditDispatcher {
    /// Spawn the workers; must be called inside a tokio runtime
    pub fn start(sink: Arc<dyn AuditSink>, geo: Arc<dyn GeoResolver>, settings: &AuditSettings) -> Self {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..settings.workers.max(1))
            .map(|id| tokio::spawn(run_worker(id, rx.clone(), sink.clone())))
            .collect();

        Self {
            sink,
            geo,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Enrich and hand off an event; runs it inline when the queue is full
    pub async fn dispatch(&self, mut event: AuditEvent) {
        if event.location.is_none() {
            event.location = Some(self.geo.locate(&event.ip_address));
        }

        let sender = self.sender.lock().clone();
        let event = match sender {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => {
                    counter!(AUDIT_QUEUED).increment(1);
                    return;
                },
                Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => event,
            },
            None => event,
        };

        counter!(AUDIT_INLINE).increment(1);
        debug!(event_type = event.event_type.as_str(), "Audit queue unavailable, writing inline");
        write_event(self.sink.as_ref(), event).await;
    }

    /// Stop accepting queued work and wait for the workers to drain
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "Audit worker panicked");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<AuditEvent>>>,
    sink: Arc<dyn AuditSink>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(event) = next else {
            break;
        };
        write_event(sink.as_ref(), event).await;
    }
    debug!(worker = id, "Audit worker stopped");
}

async fn write_event(sink: &dyn AuditSink, event: AuditEvent) {
    let event_type = event.event_type;
    if let Err(e) = sink.record(event).await {
        counter!(AUDIT_FAILED).increment(1);
        error!(event_type = event_type.as_str(), error = %e, "Failed to record audit event");
    }
}
