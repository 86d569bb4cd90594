//! Fuzz target: in-memory store fixture
//!
//! Decodes arbitrary bytes as a store fixture and, when that succeeds, runs
//! a due-now query over it.  Neither step may panic.
//!
//! cargo fuzz run fuzz_store_fixture

#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use pillbox::adapters::memory_store::MemoryScheduleStore;
use pillbox::adapters::time::ManualClock;
use pillbox::app::ports::ScheduleStore;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(store) = MemoryScheduleStore::from_json(json, ManualClock::new(), Duration::from_secs(120)) {
        let _ = store.due_schedules(1);
        let _ = store.update_medicine_quantity(1, i32::MIN);
    }
});
