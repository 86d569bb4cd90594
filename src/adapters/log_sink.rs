//! Log-based notice sink adapter.
//!
//! Implements [`NoticeSink`] by writing every notice to the log as a
//! `NOTICE | ...` line.  On a headless unit this is the only display; a
//! panel or speaker adapter would implement the same trait.
//!
//! [`LogNotifier`] stands in for the caregiver channel in simulation runs.

use log::{info, warn};

use crate::app::events::Notice;
use crate::app::ports::{NoticeSink, NotificationSender};
use crate::error::NotifyError;
use crate::model::NotificationProfile;

/// Adapter that logs every [`Notice`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSink;

impl LogNoticeSink {
    pub fn new() -> Self {
        Self
    }
}

impl NoticeSink for LogNoticeSink {
    fn show(&self, notice: &Notice) {
        match notice {
            Notice::DispenseFailed { .. }
            | Notice::CaregiverNotifyFailed { .. }
            | Notice::NotifierUnavailable { .. }
            | Notice::StoreUnavailable(_)
            | Notice::AlertExpired { .. } => warn!("NOTICE | {}", notice),
            _ => info!("NOTICE | {}", notice),
        }
    }
}

/// Caregiver "delivery" that only logs.  Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSender for LogNotifier {
    fn send_emergency(
        &self,
        profile: &NotificationProfile,
        medicine_name: &str,
        compartment: u8,
    ) -> Result<(), NotifyError> {
        let contact = profile
            .emergency_contact_name
            .as_deref()
            .unwrap_or("emergency contact");
        warn!(
            "EMERGENCY | {} has not taken {} (compartment {}); notifying {}",
            if profile.full_name.is_empty() { "patient" } else { profile.full_name.as_str() },
            medicine_name,
            compartment,
            contact
        );
        Ok(())
    }
}
