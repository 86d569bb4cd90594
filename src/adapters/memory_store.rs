//! In-memory schedule store.
//!
//! Implements [`ScheduleStore`] over a JSON fixture of profiles, medicines,
//! schedules and intake history, so the controller can run without the web
//! API.  Due schedules are evaluated with [`due::is_due`](crate::due::is_due)
//! against the injected clock, exactly as the web store does it.
//!
//! Quantity updates clamp at zero and warn when stock falls to the medicine's
//! minimum.  [`set_reachable(false)`](MemoryScheduleStore::set_reachable)
//! makes every call fail with [`TransportError::Unreachable`], which is how
//! the simulation exercises the transport-failure paths.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::path::Path;

use chrono::NaiveDateTime;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{Clock, ConfigError, ScheduleStore};
use crate::due;
use crate::error::TransportError;
use crate::model::{
    DueSchedule, HistoryEntry, Medicine, MedicineId, NotificationProfile, Schedule, ScheduleId,
    UserId,
};

/// Fixture file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreFixture {
    pub system_enabled: bool,
    pub profiles: Vec<NotificationProfile>,
    pub medicines: Vec<Medicine>,
    pub schedules: Vec<Schedule>,
    pub history: Vec<HistoryEntry>,
}

pub struct MemoryScheduleStore<C> {
    state: Mutex<CriticalSectionRawMutex, RefCell<StoreFixture>>,
    clock: C,
    tolerance: Duration,
    reachable: AtomicBool,
}

impl<C: Clock> MemoryScheduleStore<C> {
    pub fn new(fixture: StoreFixture, clock: C, tolerance: Duration) -> Self {
        info!(
            "STORE(mem): {} schedules, {} medicines, {} profiles",
            fixture.schedules.len(),
            fixture.medicines.len(),
            fixture.profiles.len()
        );
        Self {
            state: Mutex::new(RefCell::new(fixture)),
            clock,
            tolerance,
            reachable: AtomicBool::new(true),
        }
    }

    pub fn from_json(json: &str, clock: C, tolerance: Duration) -> Result<Self, ConfigError> {
        let fixture: StoreFixture =
            serde_json::from_str(json).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        Ok(Self::new(fixture, clock, tolerance))
    }

    pub fn from_file(path: &Path, clock: C, tolerance: Duration) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(e.to_string()),
        })?;
        Self::from_json(&json, clock, tolerance)
    }

    /// Simulate the server going away (`false`) or coming back (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.with_state(|s| s.history.clone())
    }

    pub fn medicine(&self, medicine_id: MedicineId) -> Option<Medicine> {
        self.with_state(|s| s.medicines.iter().find(|m| m.id == medicine_id).cloned())
    }

    pub fn enabled_flag(&self) -> bool {
        self.with_state(|s| s.system_enabled)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StoreFixture) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn online(&self) -> Result<(), TransportError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unreachable("simulated outage".into()))
        }
    }
}

fn due_entries(
    state: &StoreFixture,
    user_id: UserId,
    now: NaiveDateTime,
    tolerance: Duration,
) -> Vec<DueSchedule> {
    let mut entries: Vec<DueSchedule> = state
        .schedules
        .iter()
        .filter(|s| s.user_id == user_id)
        .filter(|s| {
            let taken = due::taken_on_day(&state.history, s.id, now);
            due::is_due(s, now, tolerance, taken)
        })
        .filter_map(|s| {
            let med = state.medicines.iter().find(|m| m.id == s.medicine_id)?;
            Some(DueSchedule {
                schedule_id: s.id,
                medicine_id: med.id,
                medicine_name: med.name.clone(),
                compartment_number: med.compartment_number,
                time: s.time.format("%H:%M").to_string(),
                dosage: med.dosage.clone(),
                notes: med.notes.clone(),
            })
        })
        .collect();
    entries.sort_by_key(|d| d.schedule_id);
    entries
}

impl<C: Clock> ScheduleStore for MemoryScheduleStore<C> {
    fn due_schedules(&self, user_id: UserId) -> Result<Vec<DueSchedule>, TransportError> {
        self.online()?;
        let now = self.clock.wall_now();
        let tolerance = self.tolerance;
        Ok(self.with_state(|s| due_entries(s, user_id, now, tolerance)))
    }

    fn record_confirmation(
        &self,
        schedule_id: ScheduleId,
        user_id: UserId,
        taken_at: NaiveDateTime,
    ) -> Result<(), TransportError> {
        self.online()?;
        self.with_state(|s| {
            let schedule = s
                .schedules
                .iter()
                .find(|sch| sch.id == schedule_id)
                .ok_or(TransportError::Status(404))?;
            if schedule.user_id != user_id {
                return Err(TransportError::Status(403));
            }
            s.history.push(HistoryEntry {
                schedule_id,
                user_id,
                taken_at,
                status: "taken".into(),
            });
            Ok(())
        })
    }

    fn system_enabled(&self) -> Result<bool, TransportError> {
        self.online()?;
        Ok(self.with_state(|s| s.system_enabled))
    }

    fn set_system_enabled(&self, enabled: bool, source: &str) -> Result<bool, TransportError> {
        self.online()?;
        info!(
            "STORE(mem): system {} by {source}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(self.with_state(|s| {
            s.system_enabled = enabled;
            s.system_enabled
        }))
    }

    fn notification_profile(&self, user_id: UserId) -> Result<NotificationProfile, TransportError> {
        self.online()?;
        self.with_state(|s| {
            s.profiles
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned()
                .ok_or(TransportError::Status(404))
        })
    }

    fn update_medicine_quantity(&self, medicine_id: MedicineId, delta: i32) -> Result<u32, TransportError> {
        self.online()?;
        self.with_state(|s| {
            let med = s
                .medicines
                .iter_mut()
                .find(|m| m.id == medicine_id)
                .ok_or(TransportError::Status(404))?;
            let next = (med.quantity as i64 + delta as i64).max(0);
            med.quantity = next.min(u32::MAX as i64) as u32;
            if med.quantity <= med.min_quantity {
                warn!(
                    "STORE(mem): {} low on stock ({} left, minimum {})",
                    med.name, med.quantity, med.min_quantity
                );
            }
            Ok(med.quantity)
        })
    }
}
