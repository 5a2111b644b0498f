//! Process counters for refreshes and protocol traffic

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    refreshes_ok: AtomicU64,
    refreshes_failed: AtomicU64,
    ticks_suppressed: AtomicU64,
    modbus_requests: AtomicU64,
    modbus_exceptions: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_ok(&self) {
        self.refreshes_ok.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "refreshes_ok", "Metric incremented");
    }

    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "refreshes_failed", "Metric incremented");
    }

    pub fn tick_suppressed(&self) {
        self.ticks_suppressed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "ticks_suppressed", "Metric incremented");
    }

    pub fn modbus_request(&self) {
        self.modbus_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn modbus_exception(&self) {
        self.modbus_exceptions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "modbus_exceptions", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes_ok: self.refreshes_ok.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            ticks_suppressed: self.ticks_suppressed.load(Ordering::Relaxed),
            modbus_requests: self.modbus_requests.load(Ordering::Relaxed),
            modbus_exceptions: self.modbus_exceptions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub refreshes_ok: u64,
    pub refreshes_failed: u64,
    pub ticks_suppressed: u64,
    pub modbus_requests: u64,
    pub modbus_exceptions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.refresh_ok();
        metrics.refresh_ok();
        metrics.refresh_failed();
        metrics.modbus_request();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.refreshes_ok, 2);
        assert_eq!(snapshot.refreshes_failed, 1);
        assert_eq!(snapshot.ticks_suppressed, 0);
        assert_eq!(snapshot.modbus_requests, 1);
    }
}
