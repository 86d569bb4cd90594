//! Mock ports for integration tests.
//!
//! Every mock records what the controller asked of it so tests can assert on
//! the full call history.  State sits behind `std::sync::Mutex` because the
//! port traits take `&self`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use pillbox::app::events::Notice;
use pillbox::app::ports::{Dispenser, NoticeSink, NotificationSender, ScheduleStore};
use pillbox::error::{DispenseError, NotifyError, TransportError};
use pillbox::model::{DueSchedule, MedicineId, NotificationProfile, ScheduleId, UserId};

/// 2026-10-12 08:01:30, a Monday.
pub fn monday_morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 12)
        .unwrap()
        .and_hms_opt(8, 1, 30)
        .unwrap()
}

pub fn due(schedule_id: ScheduleId, compartment: u8, medicine: &str) -> DueSchedule {
    DueSchedule {
        schedule_id,
        medicine_id: schedule_id + 100,
        medicine_name: medicine.into(),
        compartment_number: compartment,
        time: "08:00".into(),
        dosage: "1 tablet".into(),
        notes: String::new(),
    }
}

// ── Schedule store ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StoreState {
    pub enabled: bool,
    pub due: Vec<DueSchedule>,
    pub profile: Option<NotificationProfile>,
    /// Upcoming calls that fail with `Unreachable`, any operation.
    pub outages: u32,
    /// Upcoming `record_confirmation` calls that fail with a 503.
    pub record_failures: u32,
    /// Every `record_confirmation` call fails with this status.
    pub record_rejection: Option<u16>,
    /// `record_confirmation` blocks this long, without holding the state lock.
    pub record_latency: Duration,
    pub records: Vec<(ScheduleId, UserId, NaiveDateTime)>,
    pub record_attempts: u32,
    pub quantity_updates: Vec<(MedicineId, i32)>,
    pub toggles: Vec<(bool, String)>,
    pub due_queries: u32,
}

pub struct MockStore {
    pub state: Mutex<StoreState>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new(due: Vec<DueSchedule>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                enabled: true,
                due,
                profile: Some(NotificationProfile::fallback(1)),
                ..StoreState::default()
            }),
        }
    }

    pub fn set_due(&self, due: Vec<DueSchedule>) {
        self.state.lock().unwrap().due = due;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().enabled = enabled;
    }

    pub fn fail_next(&self, calls: u32) {
        self.state.lock().unwrap().outages = calls;
    }

    pub fn fail_records(&self, calls: u32) {
        self.state.lock().unwrap().record_failures = calls;
    }

    pub fn reject_records(&self, status: u16) {
        self.state.lock().unwrap().record_rejection = Some(status);
    }

    pub fn slow_records(&self, latency: Duration) {
        self.state.lock().unwrap().record_latency = latency;
    }

    pub fn records(&self) -> Vec<(ScheduleId, UserId, NaiveDateTime)> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn record_attempts(&self) -> u32 {
        self.state.lock().unwrap().record_attempts
    }

    pub fn due_queries(&self) -> u32 {
        self.state.lock().unwrap().due_queries
    }

    pub fn quantity_updates(&self) -> Vec<(MedicineId, i32)> {
        self.state.lock().unwrap().quantity_updates.clone()
    }

    fn outage(state: &mut StoreState) -> Result<(), TransportError> {
        if state.outages > 0 {
            state.outages -= 1;
            Err(TransportError::Unreachable("mock outage".into()))
        } else {
            Ok(())
        }
    }
}

impl ScheduleStore for MockStore {
    fn due_schedules(&self, _user_id: UserId) -> Result<Vec<DueSchedule>, TransportError> {
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        s.due_queries += 1;
        Ok(s.due.clone())
    }

    fn record_confirmation(
        &self,
        schedule_id: ScheduleId,
        user_id: UserId,
        taken_at: NaiveDateTime,
    ) -> Result<(), TransportError> {
        let latency = {
            let mut s = self.state.lock().unwrap();
            s.record_attempts += 1;
            s.record_latency
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        if let Some(status) = s.record_rejection {
            return Err(TransportError::Status(status));
        }
        if s.record_failures > 0 {
            s.record_failures -= 1;
            return Err(TransportError::Status(503));
        }
        s.records.push((schedule_id, user_id, taken_at));
        Ok(())
    }

    fn system_enabled(&self) -> Result<bool, TransportError> {
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        Ok(s.enabled)
    }

    fn set_system_enabled(&self, enabled: bool, source: &str) -> Result<bool, TransportError> {
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        s.enabled = enabled;
        s.toggles.push((enabled, source.to_string()));
        Ok(enabled)
    }

    fn notification_profile(&self, user_id: UserId) -> Result<NotificationProfile, TransportError> {
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        s.profile
            .clone()
            .map(|mut p| {
                p.user_id = user_id;
                p
            })
            .ok_or(TransportError::Status(404))
    }

    fn update_medicine_quantity(&self, medicine_id: MedicineId, delta: i32) -> Result<u32, TransportError> {
        let mut s = self.state.lock().unwrap();
        Self::outage(&mut s)?;
        s.quantity_updates.push((medicine_id, delta));
        Ok(10u32.saturating_add_signed(delta))
    }
}

// ── Notification sender ───────────────────────────────────────

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(UserId, String, u8)>>,
    pub fail: Mutex<bool>,
}

#[allow(dead_code)]
impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let s = Self::default();
        *s.fail.lock().unwrap() = true;
        s
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl NotificationSender for RecordingSender {
    fn send_emergency(
        &self,
        profile: &NotificationProfile,
        medicine_name: &str,
        compartment: u8,
    ) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Delivery("mock smtp down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((profile.user_id, medicine_name.to_string(), compartment));
        Ok(())
    }
}

// ── Notice sink ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub notices: Mutex<Vec<Notice>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Notice) -> bool) -> usize {
        self.notices.lock().unwrap().iter().filter(|n| pred(n)).count()
    }
}

impl NoticeSink for RecordingSink {
    fn show(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

// ── Dispenser ─────────────────────────────────────────────────

pub struct MockDispenser {
    pub compartments: Vec<u8>,
    pub calls: Vec<(u8, Duration)>,
    /// Scripted results, oldest first; `Ok(())` once empty.
    pub script: VecDeque<Result<(), DispenseError>>,
}

#[allow(dead_code)]
impl MockDispenser {
    pub fn new() -> Self {
        Self {
            compartments: vec![1, 2, 3, 4],
            calls: Vec::new(),
            script: VecDeque::new(),
        }
    }

    pub fn then(mut self, result: Result<(), DispenseError>) -> Self {
        self.script.push_back(result);
        self
    }
}

impl Dispenser for MockDispenser {
    fn open_and_close(&mut self, compartment: u8, hold: Duration) -> Result<(), DispenseError> {
        self.calls.push((compartment, hold));
        self.script.pop_front().unwrap_or(Ok(()))
    }

    fn compartments(&self) -> &[u8] {
        &self.compartments
    }
}
