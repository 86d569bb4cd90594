//! Escalation notifier gate.
//!
//! The gate turns claimed escalations (see
//! [`AlertBook::claim_due_escalations`](crate::fsm::book::AlertBook::claim_due_escalations))
//! into calls on the [`NotificationSender`].  Claims are made inside the
//! book's critical section; delivery happens here, outside it.
//!
//! Policy is one-shot: a failed delivery is logged and reported, never
//! retried, and the claim stays marked `notified`.  With no sender
//! configured the attempt is logged as unavailable and likewise not
//! repeated.

use log::{error, info, warn};

use crate::app::ports::NotificationSender;
use crate::error::NotifyError;
use crate::fsm::book::EscalationClaim;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    Delivered,
    Failed(NotifyError),
    /// No sender configured.
    Unavailable,
}

pub struct EscalationGate<N> {
    sender: Option<N>,
}

impl<N: NotificationSender> EscalationGate<N> {
    pub fn new(sender: Option<N>) -> Self {
        if sender.is_none() {
            warn!("ESCALATION: no notification sender configured");
        }
        Self { sender }
    }

    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// Deliver one claimed escalation.
    pub fn fire(&self, claim: &EscalationClaim) -> EscalationOutcome {
        let Some(sender) = &self.sender else {
            warn!(
                "ESCALATION: schedule {} unconfirmed but notifier unavailable",
                claim.schedule_id
            );
            return EscalationOutcome::Unavailable;
        };
        if !claim.profile.has_contact() {
            warn!(
                "ESCALATION: user {} has no emergency contact on file",
                claim.profile.user_id
            );
        }
        match sender.send_emergency(&claim.profile, &claim.medicine_name, claim.compartment) {
            Ok(()) => {
                info!(
                    "ESCALATION: caregiver notified for schedule {} ({})",
                    claim.schedule_id, claim.medicine_name
                );
                EscalationOutcome::Delivered
            }
            Err(e) => {
                error!(
                    "ESCALATION: delivery failed for schedule {}: {e}",
                    claim.schedule_id
                );
                EscalationOutcome::Failed(e)
            }
        }
    }

    pub fn sender(&self) -> Option<&N> {
        self.sender.as_ref()
    }
}
