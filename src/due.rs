//! The due-now rule.
//!
//! A schedule is due when:
//! - it is active and today's weekday is in its day set,
//! - its time of day, placed on *today's* date, is within `tolerance` of now,
//! - no "taken" entry exists for it today.
//!
//! The schedule time is never moved to the previous or next date, so a 23:59
//! schedule is not due at 00:00.

use core::time::Duration;

use chrono::{Datelike, NaiveDateTime};

use crate::model::{HistoryEntry, Schedule};

/// Evaluate the rule for one schedule.
pub fn is_due(schedule: &Schedule, now: NaiveDateTime, tolerance: Duration, taken_today: bool) -> bool {
    if !schedule.is_active || taken_today {
        return false;
    }
    if !schedule.days_of_week.contains(now.weekday()) {
        return false;
    }
    let scheduled = now.date().and_time(schedule.time);
    let diff = (scheduled - now).num_seconds().unsigned_abs();
    diff <= tolerance.as_secs()
}

/// True if `history` holds a "taken" entry for `schedule_id` on `now`'s date.
pub fn taken_on_day(history: &[HistoryEntry], schedule_id: u32, now: NaiveDateTime) -> bool {
    history
        .iter()
        .any(|h| h.schedule_id == schedule_id && h.is_taken() && h.taken_at.date() == now.date())
}
