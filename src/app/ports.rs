//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlertController (domain)
//! ```
//!
//! Driven adapters (schedule store, notification sender, notice sink,
//! clock, dispenser, config storage) implement these traits.  The
//! [`AlertController`](super::service::AlertController) consumes them via
//! generics, so the domain core never touches HTTP or PWM directly.
//!
//! The controller is shared between the control thread and the input
//! thread, so every port it owns takes `&self` and is `Send + Sync`.
//! [`Dispenser`] is the exception: it is owned by the control thread and
//! passed in at the call site.

use core::time::Duration;

use chrono::NaiveDateTime;

use crate::config::ControllerConfig;
use crate::error::{DispenseError, NotifyError, TransportError};
use crate::model::{DueSchedule, MedicineId, NotificationProfile, ScheduleId, UserId};

use super::events::Notice;

// ───────────────────────────────────────────────────────────────
// Schedule store port (driven adapter: domain ↔ web API)
// ───────────────────────────────────────────────────────────────

/// Request/response access to the schedule store.
///
/// Every call may fail with a [`TransportError`]; the caller skips the
/// current cycle and retries on the next one.
pub trait ScheduleStore: Send + Sync {
    /// Schedules due now for `user_id`, in the store's order.
    fn due_schedules(&self, user_id: UserId) -> Result<Vec<DueSchedule>, TransportError>;

    /// Report that `schedule_id` was taken at `taken_at` (local wall time).
    fn record_confirmation(
        &self,
        schedule_id: ScheduleId,
        user_id: UserId,
        taken_at: NaiveDateTime,
    ) -> Result<(), TransportError>;

    /// Current value of the system-enabled flag.
    fn system_enabled(&self) -> Result<bool, TransportError>;

    /// Set the system-enabled flag.  Returns the value the store now holds.
    /// `source` ends up in the store's audit trail.
    fn set_system_enabled(&self, enabled: bool, source: &str) -> Result<bool, TransportError>;

    /// Escalation profile for `user_id`.
    fn notification_profile(&self, user_id: UserId) -> Result<NotificationProfile, TransportError>;

    /// Add `delta` to the medicine's stock (negative after a dispense).
    /// Returns the new quantity; the store clamps at zero.
    fn update_medicine_quantity(&self, medicine_id: MedicineId, delta: i32) -> Result<u32, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Notification sender port (driven adapter: domain → caregiver)
// ───────────────────────────────────────────────────────────────

/// Delivers the caregiver escalation.  The core only decides *when*.
pub trait NotificationSender: Send + Sync {
    fn send_emergency(
        &self,
        profile: &NotificationProfile,
        medicine_name: &str,
        compartment: u8,
    ) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Notice sink port (driven adapter: domain → display / log)
// ───────────────────────────────────────────────────────────────

/// Human-facing output.  Implementations must not block for long; they are
/// called from both the control and input threads.
pub trait NoticeSink: Send + Sync {
    fn show(&self, notice: &Notice);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time for intervals and timeouts; wall time for timestamps and
/// the due-now rule only.
pub trait Clock: Clone + Send + Sync {
    /// Time since an arbitrary fixed origin.  Never goes backwards.
    fn monotonic(&self) -> Duration;

    /// Local wall-clock time.
    fn wall_now(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Dispenser port (driven adapter: domain → compartment actuators)
// ───────────────────────────────────────────────────────────────

/// A safety-gated set of compartment gates.
pub trait Dispenser {
    /// Open `compartment`, hold for `hold`, close it again.
    fn open_and_close(&mut self, compartment: u8, hold: Duration) -> Result<(), DispenseError>;

    /// Compartment numbers this dispenser can actuate.
    fn compartments(&self) -> &[u8];
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the controller)
// ───────────────────────────────────────────────────────────────

/// Periodic tasks driven by the [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Query the store for due schedules (or health-check while disabled).
    PollSchedules,
    /// Escalation sweep, reminders, expiry and report retries.
    SweepPending,
    /// Emit a telemetry line.
    Telemetry,
}

/// Callback trait that the scheduler invokes when a task falls due.
///
/// The scheduler knows nothing about the controller, the store or the
/// actuator; the main loop implements the delegate and does the work.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, task: TaskKind);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file found.
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
