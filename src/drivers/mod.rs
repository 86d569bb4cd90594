//! Actuator and input drivers.

pub mod button;
pub mod dispenser;
pub mod servo;
