//! Clock adapters.
//!
//! - [`SystemClock`] wraps `std::time::Instant` for the monotonic side and
//!   the local time zone for wall time.
//! - [`ManualClock`] is advanced explicitly.  Wall time moves in lockstep
//!   with the monotonic offset, starting from a chosen instant.  Used by the
//!   simulation tests and anywhere timing must be deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use core::time::Duration;

use crate::app::ports::Clock;

#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.start.elapsed()
    }

    fn wall_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Hand-driven clock.  Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    elapsed_ms: Arc<AtomicU64>,
    wall_origin: NaiveDateTime,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Starts at zero, wall time at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(NaiveDateTime::default())
    }

    pub fn starting_at(wall: NaiveDateTime) -> Self {
        Self {
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            wall_origin: wall,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    fn wall_now(&self) -> NaiveDateTime {
        let ms = self.elapsed_ms.load(Ordering::SeqCst);
        self.wall_origin + chrono::Duration::milliseconds(ms as i64)
    }
}
