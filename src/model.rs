//! Wire and domain records shared by the ports, the store adapters and the
//! alert book.
//!
//! Field names follow the schedule store's JSON so the same types decode the
//! web API responses and the simulation fixture.

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub type ScheduleId = u32;
pub type MedicineId = u32;
pub type UserId = u32;

// ───────────────────────────────────────────────────────────────
// Weekday set
// ───────────────────────────────────────────────────────────────

/// Days a schedule is active on.  Bit 0 = Monday.
///
/// Serialized as a list of lowercase English day names
/// (`["monday", "friday"]`), which is what the store keeps in its
/// `days_of_week` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct WeekdaySet(u8);

const DAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

impl WeekdaySet {
    pub const EVERY_DAY: Self = Self(0x7F);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, day: Weekday) -> Self {
        self.0 |= 1 << day.num_days_from_monday();
        self
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<Vec<String>> for WeekdaySet {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        let mut set = Self::empty();
        for name in &names {
            let lower = name.trim().to_ascii_lowercase();
            let idx = DAY_NAMES
                .iter()
                .position(|d| *d == lower)
                .ok_or_else(|| format!("unknown weekday '{name}'"))?;
            set.0 |= 1 << idx;
        }
        Ok(set)
    }
}

impl From<WeekdaySet> for Vec<String> {
    fn from(set: WeekdaySet) -> Self {
        DAY_NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| set.0 & (1 << i) != 0)
            .map(|(_, d)| (*d).to_string())
            .collect()
    }
}

// ───────────────────────────────────────────────────────────────
// Store records
// ───────────────────────────────────────────────────────────────

/// A recurring intake time for one medicine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub user_id: UserId,
    pub medicine_id: MedicineId,
    /// Time of day, `HH:MM` on the wire.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub days_of_week: WeekdaySet,
    #[serde(default = "default_true", alias = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub compartment_number: u8,
    #[serde(default, deserialize_with = "nullable")]
    pub dosage: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub min_quantity: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: String,
}

/// One entry of the "due now" answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueSchedule {
    pub schedule_id: ScheduleId,
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub compartment_number: u8,
    #[serde(default, deserialize_with = "nullable")]
    pub time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub dosage: String,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: String,
}

impl DueSchedule {
    /// Number of units to take, read from the leading integer of the dosage
    /// text (`"2 tablets"` → 2).  Anything unparseable counts as one unit.
    pub fn dose_units(&self) -> u32 {
        let digits: String = self
            .dosage
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        match digits.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => 1,
        }
    }
}

/// Who to notify, and after how long, when an alert goes unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationProfile {
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_delay_minutes")]
    pub notification_delay_minutes: u32,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_email: Option<String>,
}

impl NotificationProfile {
    /// Profile used when the store cannot supply one.
    pub fn fallback(user_id: UserId) -> Self {
        Self {
            user_id,
            username: String::new(),
            full_name: String::new(),
            notification_delay_minutes: default_delay_minutes(),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_email: None,
        }
    }

    pub fn has_contact(&self) -> bool {
        self.emergency_contact_phone.as_deref().is_some_and(|p| !p.is_empty())
            || self.emergency_contact_email.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// A past intake as kept by the store's history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub schedule_id: ScheduleId,
    pub user_id: UserId,
    pub taken_at: NaiveDateTime,
    #[serde(default = "default_taken")]
    pub status: String,
}

impl HistoryEntry {
    pub fn is_taken(&self) -> bool {
        self.status == "taken"
    }
}

/// `null` and missing both decode as an empty string.
fn nullable<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

fn default_delay_minutes() -> u32 {
    15
}

fn default_taken() -> String {
    "taken".into()
}

/// `HH:MM` (seconds optional on input) for schedule times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
