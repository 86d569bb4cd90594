//! Actuator safety gate.
//!
//! Every compartment actuation passes through the gate **before** any PWM
//! output changes.  Two limits are enforced across all compartments:
//!
//! 1. **Cooldown**: a minimum gap between consecutive actuations.
//! 2. **Operation window**: at most `max_operations` actuations per fixed
//!    window.  The window restarts when a request arrives after the current
//!    one has run out, so idle time never accumulates credit.
//!
//! All times are monotonic offsets from [`Clock::monotonic`](crate::app::ports::Clock::monotonic).
//! A refused request leaves the state untouched.

use core::time::Duration;

use log::{info, warn};

use crate::config::ServoConfig;
use crate::error::RateLimit;

/// Global safety state shared by every compartment gate.
#[derive(Debug, Clone)]
pub struct ActuatorSafetyGate {
    cooldown: Duration,
    window: Duration,
    max_operations: u8,
    last_operation: Option<Duration>,
    operation_count: u8,
    window_start: Option<Duration>,
}

impl ActuatorSafetyGate {
    pub fn new(config: &ServoConfig) -> Self {
        Self {
            cooldown: config.cooldown(),
            window: config.window(),
            max_operations: config.max_operations_per_window,
            last_operation: None,
            operation_count: 0,
            window_start: None,
        }
    }

    /// Check the limits at `now` without recording anything.
    pub fn check(&self, now: Duration) -> Result<(), RateLimit> {
        if let Some(last) = self.last_operation {
            let since = now.saturating_sub(last);
            if since < self.cooldown {
                return Err(RateLimit::Cooldown {
                    remaining: self.cooldown - since,
                });
            }
        }
        if !self.window_expired(now) && self.operation_count >= self.max_operations {
            return Err(RateLimit::WindowExhausted);
        }
        Ok(())
    }

    /// Check the limits and, if they pass, count an actuation at `now`.
    pub fn try_acquire(&mut self, now: Duration) -> Result<(), RateLimit> {
        if let Err(limit) = self.check(now) {
            warn!("SAFETY: actuation refused ({limit:?})");
            return Err(limit);
        }
        if self.window_expired(now) {
            if self.operation_count > 0 {
                info!(
                    "SAFETY: operation window reset ({} ops in last window)",
                    self.operation_count
                );
            }
            self.window_start = Some(now);
            self.operation_count = 0;
        }
        self.operation_count += 1;
        self.last_operation = Some(now);
        Ok(())
    }

    /// Actuations counted in the current window as of `now`.
    pub fn operations_in_window(&self, now: Duration) -> u8 {
        if self.window_expired(now) {
            0
        } else {
            self.operation_count
        }
    }

    pub fn last_operation(&self) -> Option<Duration> {
        self.last_operation
    }

    fn window_expired(&self, now: Duration) -> bool {
        self.window_start
            .is_none_or(|start| now.saturating_sub(start) >= self.window)
    }
}
