//! Outbound notices.
//!
//! The [`AlertController`](super::service::AlertController) emits these through
//! the [`NoticeSink`](super::ports::NoticeSink) port.  Adapters on the other
//! side decide what to do with them: write a log line, drive an LCD, speak
//! through a buzzer or TTS engine.  `Display` gives the patient-facing text.

use core::fmt;
use core::time::Duration;

use crate::error::{DispenseError, NotifyError, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Controller started; carries the enabled flag it starts with.
    Started { enabled: bool },

    /// A dose is due and the compartment is being opened.
    TimeToTake {
        medicine_name: String,
        compartment: u8,
        dosage: String,
    },

    /// Repeat announcement while the alert is unconfirmed.
    Reminder {
        medicine_name: String,
        compartment: u8,
        attempt: u8,
        of: u8,
    },

    /// All reminder announcements were used up.
    RemindersExhausted { medicine_name: String },

    /// The compartment could not be actuated.  Confirmation is still asked for.
    DispenseFailed {
        medicine_name: String,
        compartment: u8,
        reason: DispenseError,
    },

    /// Stock after a successful dispense.
    StockUpdated {
        medicine_name: String,
        remaining: u32,
    },

    /// The patient confirmed the dose.
    Confirmed {
        medicine_name: String,
        latency: Duration,
    },

    /// Caregiver escalation sent.
    CaregiverNotified { medicine_name: String },

    /// Caregiver escalation attempted and failed (not retried).
    CaregiverNotifyFailed {
        medicine_name: String,
        reason: NotifyError,
    },

    /// Escalation due, but no sender is configured.
    NotifierUnavailable { medicine_name: String },

    /// An unconfirmed alert aged out.
    AlertExpired { medicine_name: String },

    /// The system-enabled flag changed.
    SystemToggled { enabled: bool },

    /// The schedule store could not be reached.
    StoreUnavailable(TransportError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { enabled } => {
                write!(f, "PillBox ready ({})", if *enabled { "enabled" } else { "disabled" })
            }
            Self::TimeToTake {
                medicine_name,
                compartment,
                dosage,
            } => {
                write!(f, "Time to take {medicine_name}")?;
                if !dosage.is_empty() {
                    write!(f, " ({dosage})")?;
                }
                write!(f, " from compartment {compartment}")
            }
            Self::Reminder {
                medicine_name,
                compartment,
                attempt,
                of,
            } => write!(
                f,
                "Reminder {attempt}/{of}: please take {medicine_name} from compartment {compartment}"
            ),
            Self::RemindersExhausted { medicine_name } => {
                write!(f, "{medicine_name} not confirmed, please check history")
            }
            Self::DispenseFailed {
                medicine_name,
                compartment,
                reason,
            } => write!(
                f,
                "Could not open compartment {compartment} for {medicine_name} ({reason}), please take it manually"
            ),
            Self::StockUpdated {
                medicine_name,
                remaining,
            } => write!(f, "{medicine_name}: {remaining} left"),
            Self::Confirmed {
                medicine_name,
                latency,
            } => write!(f, "{medicine_name} taken (after {}s)", latency.as_secs()),
            Self::CaregiverNotified { medicine_name } => {
                write!(f, "Caregiver notified about {medicine_name}")
            }
            Self::CaregiverNotifyFailed {
                medicine_name,
                reason,
            } => write!(f, "Could not notify caregiver about {medicine_name} ({reason})"),
            Self::NotifierUnavailable { medicine_name } => {
                write!(f, "No caregiver channel configured for {medicine_name}")
            }
            Self::AlertExpired { medicine_name } => {
                write!(f, "{medicine_name} alert expired unconfirmed")
            }
            Self::SystemToggled { enabled } => {
                write!(f, "System {}", if *enabled { "enabled" } else { "disabled" })
            }
            Self::StoreUnavailable(e) => write!(f, "Server unavailable ({e})"),
        }
    }
}
