//! Per-alert finite state machine.
//!
//! Every raised alert walks the same table:
//!
//! ```text
//! ┌──────────────────────┬─────────────────┬──────────────────────┐
//! │ Phase                │ Event           │ Next                 │
//! ├──────────────────────┼─────────────────┼──────────────────────┤
//! │ Dispensing           │ DispenseDone    │ AwaitingConfirmation │
//! │ Dispensing           │ Confirm         │ Confirmed            │
//! │ AwaitingConfirmation │ Confirm         │ Confirmed            │
//! │ AwaitingConfirmation │ NotifyDeadline  │ Escalated            │
//! │ Escalated            │ Confirm         │ Confirmed            │
//! └──────────────────────┴─────────────────┴──────────────────────┘
//! ```
//!
//! `Idle` is the absence of an alert for a schedule.  `Confirmed` is
//! terminal.  Expiry removes an alert from any phase and is not a
//! transition.  Any pair not in the table is rejected and leaves the phase
//! unchanged.
//!
//! The alerts themselves, with their pending notifications and the intake
//! ledger, live in [`book::AlertBook`].

pub mod book;

use log::info;

use crate::model::ScheduleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertPhase {
    Dispensing = 0,
    AwaitingConfirmation = 1,
    Escalated = 2,
    Confirmed = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    /// The actuator sequence finished, successfully or not.
    DispenseDone,
    /// A confirmation bound to this alert arrived.
    Confirm,
    /// The escalation delay ran out with no confirmation.
    NotifyDeadline,
}

impl AlertPhase {
    /// Look up the transition for `event`.  `None` if the table has no row.
    pub fn next(self, event: AlertEvent) -> Option<AlertPhase> {
        use AlertEvent as E;
        use AlertPhase as P;
        match (self, event) {
            (P::Dispensing, E::DispenseDone) => Some(P::AwaitingConfirmation),
            (P::Dispensing | P::AwaitingConfirmation | P::Escalated, E::Confirm) => {
                Some(P::Confirmed)
            }
            (P::AwaitingConfirmation, E::NotifyDeadline) => Some(P::Escalated),
            _ => None,
        }
    }

    /// Still waiting on the patient.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Confirmed)
    }

    /// Past the actuator sequence and not confirmed.
    pub fn awaits_patient(self) -> bool {
        matches!(self, Self::AwaitingConfirmation | Self::Escalated)
    }
}

/// Apply `event` to `phase` in place, logging the transition.
/// Returns `false` (phase untouched) if the table has no row for it.
pub fn transition(schedule_id: ScheduleId, phase: &mut AlertPhase, event: AlertEvent) -> bool {
    match phase.next(event) {
        Some(next) => {
            info!("ALERT {schedule_id}: {:?} -> {:?}", phase, next);
            *phase = next;
            true
        }
        None => false,
    }
}
