//! Schedule poller.
//!
//! Each poll first refreshes the system-enabled flag, then, if enabled and
//! the alert book has room, asks the store for due schedules and picks the
//! first one the controller is not already tracking.
//!
//! While the system is disabled the poller only refreshes the flag, and the
//! main loop stretches its interval to the health-check period
//! ([`SchedulePoller::interval_ms`]).  A transport failure skips the
//! cycle; nothing is cached across failures except the last known flag.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::app::ports::ScheduleStore;
use crate::config::ControllerConfig;
use crate::error::TransportError;
use crate::model::{DueSchedule, ScheduleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// System is disabled; only the flag was refreshed.
    Disabled,
    /// Alert capacity reached; the store was not queried.
    AtCapacity,
    /// The store could not be reached; cycle skipped.
    Unavailable(TransportError),
    /// Nothing due, or everything due is already tracked.
    NothingDue,
    /// The schedule to alert on.
    Due(DueSchedule),
}

pub struct SchedulePoller {
    user_id: UserId,
    system_enabled: AtomicBool,
    poll_interval_ms: u32,
    health_interval_ms: u32,
}

impl SchedulePoller {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            user_id: config.user_id,
            system_enabled: AtomicBool::new(true),
            poll_interval_ms: config.poll_interval_ms,
            health_interval_ms: config.disabled_poll_interval_ms,
        }
    }

    /// Run one cycle.
    ///
    /// `has_capacity` and `is_tracked` are evaluated against the alert
    /// book; the caller must not hold the book lock across this call.
    pub fn poll<S: ScheduleStore>(
        &self,
        store: &S,
        has_capacity: impl FnOnce() -> bool,
        is_tracked: impl Fn(ScheduleId) -> bool,
    ) -> PollResult {
        match store.system_enabled() {
            Ok(enabled) => self.note_enabled(enabled),
            Err(e) => {
                warn!("POLL: status check failed: {e}");
                return PollResult::Unavailable(e);
            }
        }
        if !self.is_enabled() {
            return PollResult::Disabled;
        }
        if !has_capacity() {
            debug!("POLL: alert capacity reached, not querying");
            return PollResult::AtCapacity;
        }

        let due = match store.due_schedules(self.user_id) {
            Ok(due) => due,
            Err(e) => {
                warn!("POLL: schedule query failed: {e}");
                return PollResult::Unavailable(e);
            }
        };
        match select_actionable(due, is_tracked) {
            Some(d) => {
                info!(
                    "POLL: schedule {} due ({} in compartment {})",
                    d.schedule_id, d.medicine_name, d.compartment_number
                );
                PollResult::Due(d)
            }
            None => PollResult::NothingDue,
        }
    }

    /// Record the flag as reported by the store.  Logs on change.
    pub fn note_enabled(&self, enabled: bool) {
        let was = self.system_enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            info!(
                "POLL: system {}",
                if enabled { "enabled" } else { "disabled, health-check only" }
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.system_enabled.load(Ordering::Acquire)
    }

    /// Poll period for the current enabled state.
    pub fn interval_ms(&self) -> u32 {
        if self.is_enabled() {
            self.poll_interval_ms
        } else {
            self.health_interval_ms
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// First due entry not already tracked, in the store's order.
pub fn select_actionable(
    due: Vec<DueSchedule>,
    is_tracked: impl Fn(ScheduleId) -> bool,
) -> Option<DueSchedule> {
    due.into_iter().find(|d| !is_tracked(d.schedule_id))
}
