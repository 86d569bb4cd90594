//! Fuzz target: controller configuration
//!
//! Any configuration that decodes and validates must describe a loop that
//! can actually run: non-zero tick, and an alert book within capacity.
//!
//! cargo fuzz run fuzz_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use pillbox::config::{ControllerConfig, MAX_ALERTS};

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<ControllerConfig>(data) else {
        return;
    };
    if config.validate().is_ok() {
        assert!(config.tick_ms > 0);
        assert!(config.max_concurrent_alerts as usize <= MAX_ALERTS);
        assert!(!config.servo.compartments.is_empty());
    }
});
