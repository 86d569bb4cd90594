//! Fuzz target: "due now" response decoding
//!
//! Feeds arbitrary bytes to the `DueSchedule` list decoder the web store
//! uses, and checks that anything it accepts yields a sane dose count.
//!
//! cargo fuzz run fuzz_due_schedules

#![no_main]

use libfuzzer_sys::fuzz_target;
use pillbox::model::DueSchedule;

fuzz_target!(|data: &[u8]| {
    if let Ok(due) = serde_json::from_slice::<Vec<DueSchedule>>(data) {
        for entry in &due {
            assert!(entry.dose_units() >= 1, "dose count must be at least one");
        }
    }
});
