//! Application core: domain logic behind port traits.
//!
//! This module contains the business rules for the PillBox controller:
//! alert orchestration, confirmation handling and escalation timing.
//! All interaction with the store, the caregiver channel, the display and
//! the compartments happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without a server or servos.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
