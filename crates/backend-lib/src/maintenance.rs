// ============================
// crates/backend-lib/src/maintenance.rs
// ============================
//! Background sweepers.
//!
//! Three independent fixed-interval tasks: session cache eviction, session
//! store cleanup and stale rate-limit window removal. They only run on
//! their timers and stop when [`Maintenance::shutdown`] is called.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::auth::rate_limit::secs;
use crate::auth::{AuthRateLimiter, SessionManager, StoreSweep};
use crate::clock::Clock;
use crate::config::Settings;

/// Periods and retention windows for the sweepers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSchedule {
    pub cache_sweep_every: Duration,
    pub store_sweep_every: Duration,
    pub rate_limit_sweep_every: Duration,
    /// How long inactive session records are kept
    pub session_retention: chrono::Duration,
    /// Unblocked windows idle this long are dropped
    pub rate_limit_stale_after: chrono::Duration,
}

impl From<&Settings> for MaintenanceSchedule {
    fn from(settings: &Settings) -> Self {
        Self {
            cache_sweep_every: Duration::from_secs(settings.session.cache_sweep_interval_secs),
            store_sweep_every: Duration::from_secs(settings.session.store_sweep_interval_secs),
            rate_limit_sweep_every: Duration::from_secs(settings.rate_limit.sweep_interval_secs),
            session_retention: secs(settings.session.retention_secs),
            rate_limit_stale_after: secs(settings.rate_limit.stale_after_secs),
        }
    }
}

/// One pass of each sweep, callable directly or from the timers
#[derive(Clone)]
pub struct Sweepers {
    sessions: Arc<SessionManager>,
    limiter: AuthRateLimiter,
    clock: Arc<dyn Clock>,
    schedule: MaintenanceSchedule,
}

impl Sweepers {
    pub fn new(
        sessions: Arc<SessionManager>,
        limiter: AuthRateLimiter,
        clock: Arc<dyn Clock>,
        schedule: MaintenanceSchedule,
    ) -> Self {
        Self {
            sessions,
            limiter,
            clock,
            schedule,
        }
    }

    pub fn schedule(&self) -> &MaintenanceSchedule {
        &self.schedule
    }

    pub fn sweep_cache(&self) -> usize {
        let evicted = self.sessions.sweep_cache(self.clock.now());
        if evicted > 0 {
            debug!(evicted, "Session cache sweep");
        }
        evicted
    }

    /// Store errors are logged; the next pass tries again
    pub async fn sweep_sessions(&self) -> Option<StoreSweep> {
        match self
            .sessions
            .sweep_store(self.clock.now(), self.schedule.session_retention)
            .await
        {
            Ok(sweep) => Some(sweep),
            Err(e) => {
                error!(error = %e, "Session store sweep failed");
                None
            },
        }
    }

    pub async fn sweep_rate_limits(&self) -> usize {
        self.limiter
            .sweep(self.clock.now(), self.schedule.rate_limit_stale_after)
            .await
    }

    /// Start the three timers; must be called inside a tokio runtime
    pub fn spawn(self) -> Maintenance {
        let (stop_tx, stop_rx) = watch::channel(false);
        let schedule = self.schedule;

        let cache = self.clone();
        let store = self.clone();
        let limits = self;
        let handles = vec![
            every("session-cache", schedule.cache_sweep_every, stop_rx.clone(), move || {
                let cache = cache.clone();
                async move {
                    cache.sweep_cache();
                }
            }),
            every("session-store", schedule.store_sweep_every, stop_rx.clone(), move || {
                let store = store.clone();
                async move {
                    store.sweep_sessions().await;
                }
            }),
            every("rate-limit", schedule.rate_limit_sweep_every, stop_rx, move || {
                let limits = limits.clone();
                async move {
                    limits.sweep_rate_limits().await;
                }
            }),
        ];

        info!(
            cache_every = ?schedule.cache_sweep_every,
            store_every = ?schedule.store_sweep_every,
            rate_limit_every = ?schedule.rate_limit_sweep_every,
            "Started maintenance tasks"
        );
        Maintenance {
            stop: stop_tx,
            handles,
        }
    }
}

/// Handle to the running sweepers
pub struct Maintenance {
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Signal every task and wait for it to finish its current pass
    pub async fn shutdown(self) {
        self.stop.send_replace(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Maintenance task panicked");
            }
        }
        info!("Maintenance tasks stopped");
    }
}

fn every<F, Fut>(
    name: &'static str,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        // First pass one period after start, not immediately.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => job().await,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                },
            }
        }
        debug!(task = name, "Maintenance task stopped");
    })
}
