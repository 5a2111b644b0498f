use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::exporter::Exporter;
use super::table::ExportTable;
use crate::observability::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// Observable refresh bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshState {
    pub phase: RefreshPhase,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_refresh_ok: Option<bool>,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub total_refreshes: u64,
    pub total_failures: u64,
    pub suppressed_ticks: u64,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self {
            phase: RefreshPhase::Idle,
            last_refresh_at: None,
            last_refresh_ok: None,
            consecutive_failures: 0,
            last_success_at: None,
            last_error: None,
            total_refreshes: 0,
            total_failures: 0,
            suppressed_ticks: 0,
        }
    }
}

impl RefreshState {
    /// No successful refresh within two intervals
    pub fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        let Some(last_success) = self.last_success_at else {
            return true;
        };
        let window = chrono::Duration::from_std(interval.saturating_mul(2))
            .unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(last_success) > window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    Refreshed,
    Failed,
    /// Another refresh was still running
    Suppressed,
}

struct Inner {
    exporter: Arc<Exporter>,
    state: ArcSwap<RefreshState>,
    in_progress: AtomicBool,
    metrics: Arc<Metrics>,
}

// Clears the in-progress flag even if the refresh future is dropped
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Inner {
    fn update(&self, f: impl Fn(&mut RefreshState)) {
        self.state.rcu(|current| {
            let mut next = RefreshState::clone(current);
            f(&mut next);
            next
        });
    }

    async fn run_once(&self, now: DateTime<Utc>) -> TickOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.metrics.tick_suppressed();
            self.update(|s| s.suppressed_ticks += 1);
            warn!("Refresh still in progress, tick suppressed");
            return TickOutcome::Suppressed;
        }
        let _guard = InProgressGuard(&self.in_progress);

        self.update(|s| s.phase = RefreshPhase::Refreshing);

        match self.exporter.refresh(now).await {
            Ok(table) => {
                self.metrics.refresh_ok();
                self.update(|s| {
                    s.phase = RefreshPhase::Idle;
                    s.last_refresh_at = Some(now);
                    s.last_refresh_ok = Some(true);
                    s.consecutive_failures = 0;
                    s.last_success_at = Some(now);
                    s.last_error = None;
                    s.total_refreshes += 1;
                });
                info!(generation = table.generation, "Refresh succeeded");
                TickOutcome::Refreshed
            }
            Err(e) => {
                self.metrics.refresh_failed();
                let message = e.to_string();
                self.update(|s| {
                    s.phase = RefreshPhase::Idle;
                    s.last_refresh_at = Some(now);
                    s.last_refresh_ok = Some(false);
                    s.consecutive_failures = s.consecutive_failures.saturating_add(1);
                    s.last_error = Some(message.clone());
                    s.total_refreshes += 1;
                    s.total_failures += 1;
                });
                error!(kind = e.kind(), error = %e, "Refresh failed, keeping previous table");
                TickOutcome::Failed
            }
        }
    }
}

/// Drives the exporter on a fixed period
///
/// Ticks never queue: a tick that arrives while a refresh is still running
/// is counted and dropped. Failures are retried on the next tick with no
/// backoff.
pub struct RefreshScheduler {
    inner: Arc<Inner>,
    interval: Duration,
    task: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl RefreshScheduler {
    pub fn new(exporter: Arc<Exporter>, interval: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                exporter,
                state: ArcSwap::from_pointee(RefreshState::default()),
                in_progress: AtomicBool::new(false),
                metrics,
            }),
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn exporter(&self) -> &Arc<Exporter> {
        &self.inner.exporter
    }

    /// Spawn the tick loop; the first tick fires immediately
    pub fn start(&self) {
        let Ok(mut slot) = self.task.lock() else {
            error!("Scheduler task slot poisoned, not starting");
            return;
        };
        if slot.is_some() {
            warn!("Refresh scheduler already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval = ?period, "Refresh scheduler started");

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        inner.run_once(Utc::now()).await;
                    }
                }
            }

            info!("Refresh scheduler stopped");
        });

        *slot = Some((stop_tx, handle));
    }

    /// Cancel future ticks and wait for an in-flight refresh to finish
    pub async fn stop(&self) {
        let task = match self.task.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some((stop_tx, handle)) = task else {
            return;
        };

        let _ = stop_tx.send(true);
        if let Err(e) = handle.await {
            error!(error = %e, "Refresh scheduler task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Run one refresh now, subject to the same serialization as ticks
    pub async fn run_once(&self, now: DateTime<Utc>) -> TickOutcome {
        self.inner.run_once(now).await
    }

    pub fn current_table(&self) -> Arc<ExportTable> {
        self.inner.exporter.current_table()
    }

    pub fn status(&self) -> RefreshState {
        RefreshState::clone(&self.inner.state.load())
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.inner.state.load().is_stale(now, self.interval)
    }
}
