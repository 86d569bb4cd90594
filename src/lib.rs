//! PillBox controller library.
//!
//! Exposes the pure-logic modules and the host adapters for integration
//! testing.  The binary in `main.rs` wires them into the running controller.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod due;
pub mod error;
pub mod escalation;
pub mod events;
pub mod fsm;
pub mod model;
pub mod pins;
pub mod poller;
pub mod safety;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
