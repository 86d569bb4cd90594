//! Controller counters and telemetry.
//!
//! [`ControllerStats`] is updated from both the control and the input
//! thread, so every counter is an atomic.  A [`TelemetryData`] snapshot is
//! built on demand and written as a single `TELEM | ...` log line.
//!
//! The panic hook logs the panic reason through the `log` facade before the
//! default hook runs, so it lands in the same log stream as everything else.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use core::time::Duration;

use log::info;

use crate::fsm::book::BookCounts;

#[derive(Debug, Default)]
pub struct ControllerStats {
    polls: AtomicU64,
    alerts_raised: AtomicU32,
    confirmations: AtomicU32,
    escalations: AtomicU32,
    escalation_failures: AtomicU32,
    expired: AtomicU32,
    dispense_failures: AtomicU32,
    transport_failures: AtomicU32,
    last_latency_ms: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub polls: u64,
    pub alerts_raised: u32,
    pub confirmations: u32,
    pub escalations: u32,
    pub escalation_failures: u32,
    pub expired: u32,
    pub dispense_failures: u32,
    pub transport_failures: u32,
    pub last_latency_ms: u64,
    pub mean_latency_ms: u64,
}

impl ControllerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_raised(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn confirmed(&self, latency: Duration) {
        let ms = latency.as_millis() as u64;
        self.confirmations.fetch_add(1, Ordering::Relaxed);
        self.last_latency_ms.store(ms, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn escalated(&self, delivered: bool) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
        if !delivered {
            self.escalation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispense_failed(&self) {
        self.dispense_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transport_failed(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let confirmations = self.confirmations.load(Ordering::Relaxed);
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            confirmations,
            escalations: self.escalations.load(Ordering::Relaxed),
            escalation_failures: self.escalation_failures.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            dispense_failures: self.dispense_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            last_latency_ms: self.last_latency_ms.load(Ordering::Relaxed),
            mean_latency_ms: if confirmations == 0 {
                0
            } else {
                total / confirmations as u64
            },
        }
    }
}

/// A telemetry snapshot suitable for logging.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryData {
    pub uptime: Duration,
    pub system_enabled: bool,
    pub book: BookCounts,
    pub stats: StatsSnapshot,
    /// Actuations in the current safety window, when the caller knows it.
    pub ops_in_window: Option<u8>,
}

impl TelemetryData {
    pub fn log(&self) {
        let s = &self.stats;
        info!(
            "TELEM | up={}s | enabled={} | alerts={} pending={} unrecorded={} | \
             raised={} confirmed={} escalated={}/{} failed | expired={} | \
             dispense_fail={} transport_fail={} | latency last={}ms mean={}ms | ops={}",
            self.uptime.as_secs(),
            self.system_enabled,
            self.book.active,
            self.book.pending,
            self.book.unrecorded,
            s.alerts_raised,
            s.confirmations,
            s.escalations,
            s.escalation_failures,
            s.expired,
            s.dispense_failures,
            s.transport_failures,
            s.last_latency_ms,
            s.mean_latency_ms,
            self.ops_in_window.map_or_else(|| "-".to_string(), |n| n.to_string()),
        );
    }
}

/// Install a panic hook that logs the reason before the default hook runs.
pub fn install_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        log::error!("PANIC: {} at {}", reason, location);
        default_hook(info);
    }));
}
