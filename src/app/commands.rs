//! Inbound commands to the alert controller.
//!
//! These represent actions requested by the outside world (buttons, a
//! future local API) that the [`AlertController`](super::service::AlertController)
//! interprets and acts upon.

use crate::events::{Button, InputEvent};
use crate::model::ScheduleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Confirm the alert for a specific schedule.
    Confirm(ScheduleId),

    /// Confirm whichever unconfirmed alert was raised first.
    ConfirmOldest,

    /// Flip the system-enabled flag.
    TogglePower,
}

impl From<InputEvent> for ControllerCommand {
    fn from(event: InputEvent) -> Self {
        match event.button {
            Button::Confirm => Self::ConfirmOldest,
            Button::Power => Self::TogglePower,
        }
    }
}
