//! Alert controller: the hexagonal core.
//!
//! [`AlertController`] owns the alert book, the poller and the escalation
//! gate, and drives them through the schedule store, notification sender,
//! clock and notice sink ports.  It is shared (`Arc`) between the control
//! thread, which polls, sweeps and actuates, and the input thread, which
//! confirms and toggles power.  The dispenser is owned by the control
//! thread and injected at the call site.
//!
//! ```text
//!  ScheduleStore ──▶ ┌──────────────────────────────┐ ──▶ NoticeSink
//!                    │       AlertController         │
//!    Dispenser ◀──── │ Poller · AlertBook · Escalate │ ──▶ NotificationSender
//!                    └──────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! The book sits behind one `embassy-sync` blocking mutex.  Every method
//! takes the lock only for pure book updates; store, notifier, sink and
//! actuator calls all happen with the lock released.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use chrono::NaiveDateTime;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::diagnostics::{ControllerStats, TelemetryData};
use crate::error::TransportError;
use crate::escalation::{EscalationGate, EscalationOutcome};
use crate::fsm::AlertPhase;
use crate::fsm::book::{AlertBook, BeginRefused, BookCounts, DispenseFinish, ReminderDue};
use crate::model::{DueSchedule, NotificationProfile, ScheduleId};
use crate::poller::{PollResult, SchedulePoller};

use super::commands::ControllerCommand;
use super::events::Notice;
use super::ports::{Clock, Dispenser, NoticeSink, NotificationSender, ScheduleStore};

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Disabled,
    AtCapacity,
    Unavailable,
    NothingDue,
    /// An alert was raised; `dispensed` is false if the actuator refused or failed.
    Raised { schedule_id: ScheduleId, dispensed: bool },
    /// The due schedule became tracked between the poll and the raise.
    Skipped { schedule_id: ScheduleId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed {
        schedule_id: ScheduleId,
        latency: Duration,
        /// The store acknowledged the "taken" report.  If not, the sweep
        /// retries transient failures with backoff.
        recorded: bool,
    },
    /// Unknown or already-confirmed schedule.
    NoSuchAlert,
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub escalations: usize,
    pub delivered: usize,
    pub reminders: usize,
    pub expired: usize,
    pub recorded: usize,
}

// ───────────────────────────────────────────────────────────────
// AlertController
// ───────────────────────────────────────────────────────────────

pub struct AlertController<S, N, C, V> {
    config: ControllerConfig,
    store: S,
    escalation: EscalationGate<N>,
    clock: C,
    sink: V,
    poller: SchedulePoller,
    book: Mutex<CriticalSectionRawMutex, RefCell<AlertBook>>,
    stats: ControllerStats,
    store_reachable: AtomicBool,
}

impl<S, N, C, V> AlertController<S, N, C, V>
where
    S: ScheduleStore,
    N: NotificationSender,
    C: Clock,
    V: NoticeSink,
{
    pub fn new(config: ControllerConfig, store: S, notifier: Option<N>, clock: C, sink: V) -> Self {
        let poller = SchedulePoller::new(&config);
        let book = AlertBook::new(config.max_concurrent_alerts);
        Self {
            config,
            store,
            escalation: EscalationGate::new(notifier),
            clock,
            sink,
            poller,
            book: Mutex::new(RefCell::new(book)),
            stats: ControllerStats::new(),
            store_reachable: AtomicBool::new(true),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Read the enabled flag once and announce readiness.
    pub fn start(&self) {
        match self.store.system_enabled() {
            Ok(enabled) => {
                self.mark_reachable();
                self.poller.note_enabled(enabled);
            }
            Err(e) => self.mark_unreachable(e),
        }
        let enabled = self.poller.is_enabled();
        info!(
            "AlertController started (user {}, enabled={})",
            self.config.user_id, enabled
        );
        self.sink.show(&Notice::Started { enabled });
    }

    // ── Polling and dispensing ────────────────────────────────

    /// One poll task: find a due schedule and, if there is one, raise and
    /// dispense it.
    pub fn poll_cycle(&self, dispenser: &mut impl Dispenser) -> PollOutcome {
        self.stats.poll();
        let result = self.poller.poll(
            &self.store,
            || self.with_book(|b| b.has_capacity()),
            |id| self.with_book(|b| b.is_tracked(id)),
        );
        match result {
            PollResult::Disabled => {
                self.mark_reachable();
                PollOutcome::Disabled
            }
            PollResult::AtCapacity => {
                self.mark_reachable();
                PollOutcome::AtCapacity
            }
            PollResult::NothingDue => {
                self.mark_reachable();
                PollOutcome::NothingDue
            }
            PollResult::Unavailable(e) => {
                self.mark_unreachable(e);
                PollOutcome::Unavailable
            }
            PollResult::Due(due) => {
                self.mark_reachable();
                self.raise_alert(&due, dispenser)
            }
        }
    }

    /// `Idle → Dispensing → AwaitingConfirmation` for `due`.
    pub fn raise_alert(&self, due: &DueSchedule, dispenser: &mut impl Dispenser) -> PollOutcome {
        let schedule_id = due.schedule_id;
        let (profile, notify_after) = self.escalation_profile();

        let now = self.clock.monotonic();
        let wall = self.clock.wall_now();
        match self.with_book(|b| b.begin(due, now, wall)) {
            Ok(()) => {}
            Err(BeginRefused::AlreadyTracked | BeginRefused::AtCapacity) => {
                debug!("ALERT {schedule_id}: not raised, already tracked or at capacity");
                return PollOutcome::Skipped { schedule_id };
            }
        }
        self.stats.alert_raised();
        self.sink.show(&Notice::TimeToTake {
            medicine_name: due.medicine_name.clone(),
            compartment: due.compartment_number,
            dosage: due.dosage.clone(),
        });

        let dispensed = match dispenser.open_and_close(due.compartment_number, self.config.servo.hold()) {
            Ok(()) => true,
            Err(reason) => {
                warn!("ALERT {schedule_id}: dispense failed: {reason}");
                self.stats.dispense_failed();
                self.sink.show(&Notice::DispenseFailed {
                    medicine_name: due.medicine_name.clone(),
                    compartment: due.compartment_number,
                    reason,
                });
                false
            }
        };

        match self.with_book(|b| b.finish_dispense(schedule_id, profile, notify_after)) {
            DispenseFinish::AwaitingConfirmation => {
                info!(
                    "ALERT {schedule_id}: awaiting confirmation, escalation in {}s",
                    notify_after.as_secs()
                );
            }
            DispenseFinish::AlreadyConfirmed => {
                info!("ALERT {schedule_id}: confirmed during dispense");
            }
            DispenseFinish::Unknown => {
                warn!("ALERT {schedule_id}: gone before dispense finished");
            }
        }

        if dispensed {
            self.decrement_stock(due);
        }
        PollOutcome::Raised {
            schedule_id,
            dispensed,
        }
    }

    // ── Confirmation ──────────────────────────────────────────

    /// Confirm the alert for `schedule_id`.  Unknown or already-confirmed
    /// schedules are a no-op.
    pub fn confirm(&self, schedule_id: ScheduleId) -> ConfirmOutcome {
        let now = self.clock.monotonic();
        let wall = self.clock.wall_now();
        let Some(confirmation) = self.with_book(|b| b.confirm(schedule_id, now, wall)) else {
            debug!("CONFIRM: no open alert for schedule {schedule_id}");
            return ConfirmOutcome::NoSuchAlert;
        };

        self.stats.confirmed(confirmation.latency);
        info!(
            "CONFIRM: schedule {} taken, response latency {}ms{}",
            schedule_id,
            confirmation.latency.as_millis(),
            if confirmation.was_escalated {
                " (after escalation)"
            } else {
                ""
            }
        );
        self.sink.show(&Notice::Confirmed {
            medicine_name: confirmation.medicine_name,
            latency: confirmation.latency,
        });

        let recorded = self.report_taken(schedule_id, confirmation.taken_at);
        ConfirmOutcome::Confirmed {
            schedule_id,
            latency: confirmation.latency,
            recorded,
        }
    }

    /// Physical confirmation button: confirms the oldest unconfirmed alert.
    pub fn on_confirmation_pressed(&self) -> ConfirmOutcome {
        match self.with_book(|b| b.oldest_open()) {
            Some(schedule_id) => self.confirm(schedule_id),
            None => {
                debug!("CONFIRM: button pressed with no open alert");
                ConfirmOutcome::NoSuchAlert
            }
        }
    }

    /// Physical power button: flips the system-enabled flag in the store.
    /// Returns the flag the store now holds.
    pub fn on_power_toggle_pressed(&self) -> Result<bool, TransportError> {
        let target = !self.poller.is_enabled();
        match self.store.set_system_enabled(target, "power_button") {
            Ok(enabled) => {
                self.mark_reachable();
                self.poller.note_enabled(enabled);
                info!("POWER: system {}", if enabled { "enabled" } else { "disabled" });
                self.sink.show(&Notice::SystemToggled { enabled });
                Ok(enabled)
            }
            Err(e) => {
                warn!("POWER: toggle failed: {e}");
                self.stats.transport_failed();
                self.sink.show(&Notice::StoreUnavailable(e.clone()));
                Err(e)
            }
        }
    }

    /// Dispatch an inbound command.
    pub fn handle_command(&self, command: ControllerCommand) {
        match command {
            ControllerCommand::Confirm(schedule_id) => {
                self.confirm(schedule_id);
            }
            ControllerCommand::ConfirmOldest => {
                self.on_confirmation_pressed();
            }
            ControllerCommand::TogglePower => {
                if let Err(e) = self.on_power_toggle_pressed() {
                    debug!("POWER: command dropped after failed toggle: {e}");
                }
            }
        }
    }

    // ── Sweep ─────────────────────────────────────────────────

    /// Periodic sweep: expiry, escalations, reminders, and retries of
    /// unrecorded "taken" reports.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.monotonic();
        let retention = self.config.retention();
        let interval = self.config.reminder_interval();
        let repeats = self.config.reminder_repeats;

        let (expired, claims, reminders, unrecorded) = self.with_book(|b| {
            let expired = b.expire(now, retention);
            let claims = b.claim_due_escalations(now);
            let reminders = b.due_reminders(now, interval, repeats);
            (expired, claims, reminders, b.claim_unrecorded(now))
        });

        let mut report = SweepReport::default();

        for gone in expired {
            info!(
                "ALERT {}: expired unconfirmed (notified={})",
                gone.schedule_id, gone.notified
            );
            self.stats.expired();
            self.sink.show(&Notice::AlertExpired {
                medicine_name: gone.medicine_name,
            });
            report.expired += 1;
        }

        for claim in &claims {
            report.escalations += 1;
            let medicine_name = claim.medicine_name.clone();
            match self.escalation.fire(claim) {
                EscalationOutcome::Delivered => {
                    report.delivered += 1;
                    self.stats.escalated(true);
                    self.sink.show(&Notice::CaregiverNotified { medicine_name });
                }
                EscalationOutcome::Failed(reason) => {
                    self.stats.escalated(false);
                    self.sink.show(&Notice::CaregiverNotifyFailed {
                        medicine_name,
                        reason,
                    });
                }
                EscalationOutcome::Unavailable => {
                    self.stats.escalated(false);
                    self.sink.show(&Notice::NotifierUnavailable { medicine_name });
                }
            }
        }

        for reminder in reminders {
            report.reminders += 1;
            match reminder {
                ReminderDue::Repeat {
                    medicine_name,
                    compartment,
                    attempt,
                    of,
                    ..
                } => self.sink.show(&Notice::Reminder {
                    medicine_name,
                    compartment,
                    attempt,
                    of,
                }),
                ReminderDue::Exhausted {
                    schedule_id,
                    medicine_name,
                } => {
                    info!("ALERT {schedule_id}: reminders exhausted");
                    self.sink.show(&Notice::RemindersExhausted { medicine_name });
                }
            }
        }

        for (schedule_id, taken_at) in unrecorded {
            if self.report_taken(schedule_id, taken_at) {
                report.recorded += 1;
            }
        }

        report
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn telemetry(&self, ops_in_window: Option<u8>) -> TelemetryData {
        TelemetryData {
            uptime: self.clock.monotonic(),
            system_enabled: self.poller.is_enabled(),
            book: self.book_counts(),
            stats: self.stats.snapshot(),
            ops_in_window,
        }
    }

    /// Poll period for the current enabled state.
    pub fn poll_interval_ms(&self) -> u32 {
        self.poller.interval_ms()
    }

    pub fn is_enabled(&self) -> bool {
        self.poller.is_enabled()
    }

    pub fn book_counts(&self) -> BookCounts {
        self.with_book(|b| b.counts())
    }

    pub fn alert_phase(&self, schedule_id: ScheduleId) -> Option<AlertPhase> {
        self.with_book(|b| b.alert(schedule_id).map(|a| a.phase))
    }

    pub fn has_pending(&self, schedule_id: ScheduleId) -> bool {
        self.with_book(|b| b.pending(schedule_id).is_some())
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &V {
        &self.sink
    }

    pub fn notifier(&self) -> Option<&N> {
        self.escalation.sender()
    }

    // ── Internal ──────────────────────────────────────────────

    fn with_book<R>(&self, f: impl FnOnce(&mut AlertBook) -> R) -> R {
        self.book.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Profile snapshot and escalation delay for a new alert.  Falls back to
    /// the configured default when the store cannot supply a profile.
    fn escalation_profile(&self) -> (NotificationProfile, Duration) {
        match self.store.notification_profile(self.config.user_id) {
            Ok(profile) => {
                let delay = match profile.notification_delay_minutes {
                    0 => self.config.default_notify_delay(),
                    m => Duration::from_secs(m as u64 * 60),
                };
                (profile, delay)
            }
            Err(e) => {
                warn!("ALERT: profile fetch failed, using defaults: {e}");
                self.stats.transport_failed();
                (
                    NotificationProfile::fallback(self.config.user_id),
                    self.config.default_notify_delay(),
                )
            }
        }
    }

    fn decrement_stock(&self, due: &DueSchedule) {
        let delta = -(due.dose_units().min(i32::MAX as u32) as i32);
        match self.store.update_medicine_quantity(due.medicine_id, delta) {
            Ok(remaining) => {
                info!("STOCK: {} now {}", due.medicine_name, remaining);
                self.sink.show(&Notice::StockUpdated {
                    medicine_name: due.medicine_name.clone(),
                    remaining,
                });
            }
            Err(e) => {
                warn!("STOCK: quantity update for medicine {} failed: {e}", due.medicine_id);
                self.stats.transport_failed();
            }
        }
    }

    /// Send a "taken" report the caller has claimed in the book, then
    /// settle or release the claim.
    fn report_taken(&self, schedule_id: ScheduleId, taken_at: NaiveDateTime) -> bool {
        match self
            .store
            .record_confirmation(schedule_id, self.config.user_id, taken_at)
        {
            Ok(()) => {
                self.with_book(|b| b.mark_recorded(schedule_id));
                true
            }
            Err(e) if e.is_transient() => {
                self.stats.transport_failed();
                let now = self.clock.monotonic();
                match self.with_book(|b| b.release(schedule_id, now)) {
                    Some(delay) => warn!(
                        "CONFIRM: taken report for schedule {schedule_id} failed, retry in {}s: {e}",
                        delay.as_secs()
                    ),
                    None => warn!("CONFIRM: taken report for schedule {schedule_id} failed: {e}"),
                }
                false
            }
            Err(e) => {
                self.stats.transport_failed();
                self.with_book(|b| b.mark_rejected(schedule_id));
                warn!("CONFIRM: store rejected taken report for schedule {schedule_id}, not retrying: {e}");
                false
            }
        }
    }

    fn mark_reachable(&self) {
        if !self.store_reachable.swap(true, Ordering::AcqRel) {
            info!("STORE: reachable again");
        }
    }

    fn mark_unreachable(&self, e: TransportError) {
        self.stats.transport_failed();
        if self.store_reachable.swap(false, Ordering::AcqRel) {
            self.sink.show(&Notice::StoreUnavailable(e));
        }
    }
}
