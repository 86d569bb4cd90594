//! Alert book: every alert, pending notification and completed intake the
//! controller is tracking.
//!
//! The book is plain data with no I/O.  The controller keeps it behind a
//! single mutex and performs store, notifier and actuator calls only after
//! releasing the lock, feeding results back in with another short critical
//! section.  That keeps two properties trivially true:
//!
//! - A pending notification exists iff its alert exists and is in
//!   `AwaitingConfirmation` or `Escalated`.
//! - Confirming removes the pending notification in the same critical
//!   section a sweep would use to claim it, so a confirmed alert can never
//!   be escalated afterwards and an escalation is claimed at most once.
//! - A "taken" report is claimed (`InFlight`) under the lock before it is
//!   sent, so the confirming thread and a sweep never both send it.
//!
//! Capacities are fixed: at most [`MAX_ALERTS`] alerts (further limited by
//! the configured `max_concurrent_alerts`) and [`LEDGER_CAPACITY`] ledger
//! entries.

use core::time::Duration;

use chrono::NaiveDateTime;
use heapless::FnvIndexMap;
use log::{debug, warn};

use crate::config::MAX_ALERTS;
use crate::model::{DueSchedule, MedicineId, NotificationProfile, ScheduleId};

use super::{AlertEvent, AlertPhase, transition};

/// Completed intakes remembered at once.
pub const LEDGER_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlert {
    pub schedule_id: ScheduleId,
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub compartment: u8,
    pub dose_units: u32,
    pub triggered_at: Duration,
    pub triggered_wall: NaiveDateTime,
    pub phase: AlertPhase,
    /// Announcements made so far, the initial one included.
    pub reminders_sent: u8,
    pub last_reminder_at: Duration,
    pub reminders_exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub profile: NotificationProfile,
    pub medicine_name: String,
    pub compartment: u8,
    pub triggered_at: Duration,
    pub notify_after: Duration,
    pub notified: bool,
}

/// First retry delay for a failed "taken" report; doubles per attempt.
pub const REPORT_RETRY_BASE: Duration = Duration::from_secs(5);
/// Longest gap between "taken" report retries.
pub const REPORT_RETRY_MAX: Duration = Duration::from_secs(300);

/// Where the "taken" report for a completed intake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// Claimed by one thread, request outstanding.
    InFlight { attempts: u8 },
    /// Failed transiently; retry once `retry_at` passes.
    Pending { attempts: u8, retry_at: Duration },
    /// The store acknowledged it.
    Recorded,
    /// The store refused it for good.
    Rejected,
}

impl ReportState {
    /// No further report will be sent.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Recorded | Self::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedIntake {
    pub taken_at: NaiveDateTime,
    pub triggered_at: Duration,
    pub report: ReportState,
}

/// Backoff before retry number `attempts + 1`.
fn retry_delay(attempts: u8) -> Duration {
    let shift = attempts.saturating_sub(1).min(16) as u32;
    REPORT_RETRY_BASE
        .saturating_mul(1 << shift)
        .min(REPORT_RETRY_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginRefused {
    AlreadyTracked,
    AtCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseFinish {
    /// Alert moved to `AwaitingConfirmation`; escalation timer armed.
    AwaitingConfirmation,
    /// Confirmed while the gate was still moving; nothing armed.
    AlreadyConfirmed,
    /// The alert is gone (expired).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub schedule_id: ScheduleId,
    pub medicine_name: String,
    /// Confirmation time minus trigger time, on the monotonic clock.
    pub latency: Duration,
    pub was_escalated: bool,
    pub taken_at: NaiveDateTime,
}

/// Snapshot handed to the escalation gate once a notification is claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationClaim {
    pub schedule_id: ScheduleId,
    pub profile: NotificationProfile,
    pub medicine_name: String,
    pub compartment: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderDue {
    Repeat {
        schedule_id: ScheduleId,
        medicine_name: String,
        compartment: u8,
        attempt: u8,
        of: u8,
    },
    Exhausted {
        schedule_id: ScheduleId,
        medicine_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    pub schedule_id: ScheduleId,
    pub medicine_name: String,
    pub notified: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookCounts {
    pub active: usize,
    pub pending: usize,
    pub unrecorded: usize,
}

pub struct AlertBook {
    alerts: FnvIndexMap<ScheduleId, ActiveAlert, MAX_ALERTS>,
    pending: FnvIndexMap<ScheduleId, PendingNotification, MAX_ALERTS>,
    ledger: FnvIndexMap<ScheduleId, CompletedIntake, LEDGER_CAPACITY>,
    max_alerts: usize,
}

impl AlertBook {
    pub fn new(max_alerts: u8) -> Self {
        Self {
            alerts: FnvIndexMap::new(),
            pending: FnvIndexMap::new(),
            ledger: FnvIndexMap::new(),
            max_alerts: (max_alerts as usize).clamp(1, MAX_ALERTS),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// True if the schedule has a live alert or a completed intake.
    pub fn is_tracked(&self, schedule_id: ScheduleId) -> bool {
        self.alerts.contains_key(&schedule_id) || self.ledger.contains_key(&schedule_id)
    }

    pub fn has_capacity(&self) -> bool {
        self.alerts.len() < self.max_alerts
    }

    pub fn alert(&self, schedule_id: ScheduleId) -> Option<&ActiveAlert> {
        self.alerts.get(&schedule_id)
    }

    pub fn pending(&self, schedule_id: ScheduleId) -> Option<&PendingNotification> {
        self.pending.get(&schedule_id)
    }

    pub fn intake(&self, schedule_id: ScheduleId) -> Option<&CompletedIntake> {
        self.ledger.get(&schedule_id)
    }

    /// The unconfirmed alert raised first.
    pub fn oldest_open(&self) -> Option<ScheduleId> {
        self.alerts
            .values()
            .filter(|a| a.phase.is_open())
            .min_by_key(|a| a.triggered_at)
            .map(|a| a.schedule_id)
    }

    pub fn counts(&self) -> BookCounts {
        BookCounts {
            active: self.alerts.len(),
            pending: self.pending.len(),
            unrecorded: self.ledger.values().filter(|i| !i.report.is_settled()).count(),
        }
    }

    // ── Alert lifecycle ───────────────────────────────────────

    /// `Idle → Dispensing`.  The initial announcement counts as the first
    /// reminder.
    pub fn begin(
        &mut self,
        due: &DueSchedule,
        now: Duration,
        wall: NaiveDateTime,
    ) -> Result<(), BeginRefused> {
        if self.is_tracked(due.schedule_id) {
            return Err(BeginRefused::AlreadyTracked);
        }
        if !self.has_capacity() {
            return Err(BeginRefused::AtCapacity);
        }
        let alert = ActiveAlert {
            schedule_id: due.schedule_id,
            medicine_id: due.medicine_id,
            medicine_name: due.medicine_name.clone(),
            compartment: due.compartment_number,
            dose_units: due.dose_units(),
            triggered_at: now,
            triggered_wall: wall,
            phase: AlertPhase::Dispensing,
            reminders_sent: 1,
            last_reminder_at: now,
            reminders_exhausted: false,
        };
        self.alerts
            .insert(due.schedule_id, alert)
            .map_err(|_| BeginRefused::AtCapacity)?;
        debug!("ALERT {}: Idle -> Dispensing", due.schedule_id);
        Ok(())
    }

    /// `Dispensing → AwaitingConfirmation`, arming the escalation timer.
    pub fn finish_dispense(
        &mut self,
        schedule_id: ScheduleId,
        profile: NotificationProfile,
        notify_after: Duration,
    ) -> DispenseFinish {
        let Some(alert) = self.alerts.get_mut(&schedule_id) else {
            return if self.ledger.contains_key(&schedule_id) {
                DispenseFinish::AlreadyConfirmed
            } else {
                DispenseFinish::Unknown
            };
        };
        if !transition(schedule_id, &mut alert.phase, AlertEvent::DispenseDone) {
            return DispenseFinish::Unknown;
        }
        let pending = PendingNotification {
            profile,
            medicine_name: alert.medicine_name.clone(),
            compartment: alert.compartment,
            triggered_at: alert.triggered_at,
            notify_after,
            notified: false,
        };
        // Same capacity as `alerts`, and at most one entry per alert.
        if self.pending.insert(schedule_id, pending).is_err() {
            debug_assert!(false, "pending map smaller than alert map");
            warn!("ALERT {schedule_id}: pending map full, escalation not armed");
        }
        DispenseFinish::AwaitingConfirmation
    }

    /// `* → Confirmed`.  Cancels the pending notification and records the
    /// intake in the ledger with its report already claimed by the caller.
    /// `None` for an unknown or already-confirmed schedule.
    pub fn confirm(
        &mut self,
        schedule_id: ScheduleId,
        now: Duration,
        wall: NaiveDateTime,
    ) -> Option<Confirmation> {
        let mut alert = self.alerts.remove(&schedule_id)?;
        let was_escalated = alert.phase == AlertPhase::Escalated;
        transition(schedule_id, &mut alert.phase, AlertEvent::Confirm);
        self.pending.remove(&schedule_id);

        self.remember_intake(
            schedule_id,
            CompletedIntake {
                taken_at: wall,
                triggered_at: alert.triggered_at,
                report: ReportState::InFlight { attempts: 1 },
            },
        );

        Some(Confirmation {
            schedule_id,
            medicine_name: alert.medicine_name,
            latency: now.saturating_sub(alert.triggered_at),
            was_escalated,
            taken_at: wall,
        })
    }

    // ── Sweep helpers ─────────────────────────────────────────

    /// Claim every notification whose deadline has passed.  Each is marked
    /// `notified` here, so no later sweep returns it again.
    pub fn claim_due_escalations(&mut self, now: Duration) -> heapless::Vec<EscalationClaim, MAX_ALERTS> {
        let mut claims = heapless::Vec::new();
        for (&schedule_id, pending) in self.pending.iter_mut() {
            if pending.notified || now.saturating_sub(pending.triggered_at) < pending.notify_after {
                continue;
            }
            pending.notified = true;
            if let Some(alert) = self.alerts.get_mut(&schedule_id) {
                transition(schedule_id, &mut alert.phase, AlertEvent::NotifyDeadline);
            }
            let _ = claims.push(EscalationClaim {
                schedule_id,
                profile: pending.profile.clone(),
                medicine_name: pending.medicine_name.clone(),
                compartment: pending.compartment,
            });
        }
        claims
    }

    /// Reminder announcements due at `now`.
    pub fn due_reminders(
        &mut self,
        now: Duration,
        interval: Duration,
        repeats: u8,
    ) -> heapless::Vec<ReminderDue, MAX_ALERTS> {
        let mut due = heapless::Vec::new();
        for alert in self.alerts.values_mut() {
            if !alert.phase.awaits_patient() || alert.reminders_exhausted {
                continue;
            }
            if now.saturating_sub(alert.last_reminder_at) < interval {
                continue;
            }
            alert.last_reminder_at = now;
            let item = if alert.reminders_sent < repeats {
                alert.reminders_sent += 1;
                ReminderDue::Repeat {
                    schedule_id: alert.schedule_id,
                    medicine_name: alert.medicine_name.clone(),
                    compartment: alert.compartment,
                    attempt: alert.reminders_sent,
                    of: repeats,
                }
            } else {
                alert.reminders_exhausted = true;
                ReminderDue::Exhausted {
                    schedule_id: alert.schedule_id,
                    medicine_name: alert.medicine_name.clone(),
                }
            };
            let _ = due.push(item);
        }
        due
    }

    /// Drop alerts, pending notifications and ledger entries older than
    /// `retention`.  Returns the alerts that aged out unconfirmed.
    pub fn expire(&mut self, now: Duration, retention: Duration) -> heapless::Vec<Expired, MAX_ALERTS> {
        let stale: heapless::Vec<ScheduleId, MAX_ALERTS> = self
            .alerts
            .values()
            .filter(|a| now.saturating_sub(a.triggered_at) >= retention)
            .map(|a| a.schedule_id)
            .collect();

        let mut expired = heapless::Vec::new();
        for schedule_id in stale {
            let notified = self.pending.remove(&schedule_id).is_some_and(|p| p.notified);
            if let Some(alert) = self.alerts.remove(&schedule_id) {
                let _ = expired.push(Expired {
                    schedule_id,
                    medicine_name: alert.medicine_name,
                    notified,
                });
            }
        }

        let old: heapless::Vec<ScheduleId, LEDGER_CAPACITY> = self
            .ledger
            .iter()
            .filter(|(_, i)| now.saturating_sub(i.triggered_at) >= retention)
            .map(|(&id, _)| id)
            .collect();
        for schedule_id in old {
            if let Some(intake) = self.ledger.remove(&schedule_id) {
                if !intake.report.is_settled() {
                    warn!("ALERT {schedule_id}: taken report never reached the store, dropping");
                }
            }
        }
        expired
    }

    /// Claim every "taken" report whose retry time has come.  Claimed
    /// entries are `InFlight` until [`mark_recorded`](Self::mark_recorded),
    /// [`release`](Self::release) or [`mark_rejected`](Self::mark_rejected),
    /// so no other caller sends them meanwhile.
    pub fn claim_unrecorded(&mut self, now: Duration) -> heapless::Vec<(ScheduleId, NaiveDateTime), LEDGER_CAPACITY> {
        let mut claimed = heapless::Vec::new();
        for (&schedule_id, intake) in self.ledger.iter_mut() {
            if let ReportState::Pending { attempts, retry_at } = intake.report {
                if now >= retry_at {
                    intake.report = ReportState::InFlight {
                        attempts: attempts.saturating_add(1),
                    };
                    let _ = claimed.push((schedule_id, intake.taken_at));
                }
            }
        }
        claimed
    }

    /// Returns `false` if the entry is gone.
    pub fn mark_recorded(&mut self, schedule_id: ScheduleId) -> bool {
        self.settle(schedule_id, ReportState::Recorded)
    }

    /// The store refused the report; it is never sent again.  The entry
    /// still blocks a re-raise until retention.
    pub fn mark_rejected(&mut self, schedule_id: ScheduleId) -> bool {
        self.settle(schedule_id, ReportState::Rejected)
    }

    /// Hand a failed in-flight report back for a later retry.  Returns the
    /// backoff chosen, or `None` if the entry is gone or not in flight.
    pub fn release(&mut self, schedule_id: ScheduleId, now: Duration) -> Option<Duration> {
        let intake = self.ledger.get_mut(&schedule_id)?;
        let ReportState::InFlight { attempts } = intake.report else {
            return None;
        };
        let delay = retry_delay(attempts);
        intake.report = ReportState::Pending {
            attempts,
            retry_at: now.saturating_add(delay),
        };
        Some(delay)
    }

    // ── Internal ──────────────────────────────────────────────

    fn settle(&mut self, schedule_id: ScheduleId, state: ReportState) -> bool {
        match self.ledger.get_mut(&schedule_id) {
            Some(intake) => {
                intake.report = state;
                true
            }
            None => false,
        }
    }

    /// Insert into the ledger, evicting the oldest entry (settled ones
    /// first) when full.
    fn remember_intake(&mut self, schedule_id: ScheduleId, intake: CompletedIntake) {
        if self.ledger.len() == LEDGER_CAPACITY && !self.ledger.contains_key(&schedule_id) {
            let victim = self
                .ledger
                .iter()
                .filter(|(_, i)| i.report.is_settled())
                .min_by_key(|(_, i)| i.triggered_at)
                .or_else(|| self.ledger.iter().min_by_key(|(_, i)| i.triggered_at))
                .map(|(&id, _)| id);
            if let Some(victim) = victim {
                warn!("ALERT ledger full, forgetting schedule {victim}");
                self.ledger.remove(&victim);
            }
        }
        let _ = self.ledger.insert(schedule_id, intake);
    }
}
