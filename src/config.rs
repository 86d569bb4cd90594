//! Controller configuration parameters
//!
//! All tunable parameters for the PillBox controller.
//! Values are loaded from a JSON file through [`ConfigPort`](crate::app::ports::ConfigPort)
//! and fall back to these defaults when no file exists.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Upper bound on compartments a single controller drives.
pub const MAX_COMPARTMENTS: usize = 8;

/// Upper bound on simultaneously tracked alerts (sizes the alert book).
pub const MAX_ALERTS: usize = 8;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Schedule store ---
    /// Base URL of the schedule store web API
    pub server_url: String,
    /// Value of the `X-API-Key` header
    pub api_key: String,
    /// Patient whose schedules this dispenser serves
    pub user_id: u32,
    /// HTTP request timeout (seconds)
    pub http_timeout_secs: u64,
    /// JSON fixture for the in-memory store; replaces the web store when set
    pub simulation_fixture: Option<String>,

    // --- Timing ---
    /// Control loop tick (milliseconds)
    pub tick_ms: u32,
    /// Schedule poll interval while enabled (milliseconds)
    pub poll_interval_ms: u32,
    /// Health-check interval while the system is disabled (milliseconds)
    pub disabled_poll_interval_ms: u32,
    /// Pending-notification sweep interval (milliseconds)
    pub sweep_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,

    // --- Alerting ---
    /// A schedule is due within +/- this many seconds of its time
    pub due_tolerance_secs: u32,
    /// Escalation delay when the profile does not provide one (seconds)
    pub default_notify_delay_secs: u32,
    /// Alerts and pending notifications are dropped after this long (seconds)
    pub retention_secs: u32,
    /// Alerts tracked at once (1 = one alert at a time)
    pub max_concurrent_alerts: u8,
    /// Announcements per alert, including the first one
    pub reminder_repeats: u8,
    /// Gap between reminder announcements (seconds)
    pub reminder_interval_secs: u32,

    // --- Inputs ---
    /// Confirmation button debounce (milliseconds)
    pub confirm_debounce_ms: u32,
    /// Power button debounce (milliseconds)
    pub power_debounce_ms: u32,

    // --- Actuators ---
    pub servo: ServoConfig,
}

/// Servo gate and safety-gate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Compartment numbers wired to a gate
    pub compartments: heapless::Vec<u8, MAX_COMPARTMENTS>,
    /// Minimum gap between actuations on any compartment (milliseconds)
    pub cooldown_ms: u32,
    /// Actuations allowed per window
    pub max_operations_per_window: u8,
    /// Operation counting window (seconds)
    pub window_secs: u32,
    /// Time the gate stays open (milliseconds)
    pub hold_ms: u32,
    /// Time allowed for the horn to reach position (milliseconds)
    pub settle_ms: u32,
    /// Servo PWM frequency (Hz)
    pub pwm_hz: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Schedule store
            server_url: "http://localhost:5000".into(),
            api_key: String::new(),
            user_id: 1,
            http_timeout_secs: 10,
            simulation_fixture: None,

            // Timing
            tick_ms: 100,
            poll_interval_ms: 5_000,           // 0.2 Hz
            disabled_poll_interval_ms: 30_000, // health check only
            sweep_interval_ms: 1_000,          // 1 Hz
            telemetry_interval_secs: 60,       // 1/min

            // Alerting
            due_tolerance_secs: 120,
            default_notify_delay_secs: 900, // 15 min
            retention_secs: 7_200,          // 2 h
            max_concurrent_alerts: 1,
            reminder_repeats: 3,
            reminder_interval_secs: 30,

            // Inputs
            confirm_debounce_ms: 300,
            power_debounce_ms: 2_000,

            servo: ServoConfig::default(),
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        let mut compartments = heapless::Vec::new();
        for c in 1..=4 {
            let _ = compartments.push(c);
        }
        Self {
            compartments,
            cooldown_ms: 2_000,
            max_operations_per_window: 10,
            window_secs: 60,
            hold_ms: 2_000,
            settle_ms: 500,
            pwm_hz: 50,
        }
    }
}

impl ControllerConfig {
    /// Reject values that would make the loop spin, never escalate, or
    /// overrun the fixed-capacity alert book.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_ms must be > 0"));
        }
        if self.poll_interval_ms < self.tick_ms || self.sweep_interval_ms < self.tick_ms {
            return Err(ConfigError::ValidationFailed(
                "poll and sweep intervals must be >= tick_ms",
            ));
        }
        if self.disabled_poll_interval_ms < self.poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "disabled_poll_interval_ms must be >= poll_interval_ms",
            ));
        }
        if self.retention_secs <= self.default_notify_delay_secs {
            return Err(ConfigError::ValidationFailed(
                "retention_secs must exceed default_notify_delay_secs",
            ));
        }
        if self.max_concurrent_alerts == 0 || self.max_concurrent_alerts as usize > MAX_ALERTS {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_alerts must be 1..=8",
            ));
        }
        if self.confirm_debounce_ms < 300 {
            return Err(ConfigError::ValidationFailed(
                "confirm_debounce_ms must be >= 300",
            ));
        }
        if self.power_debounce_ms < 2_000 {
            return Err(ConfigError::ValidationFailed(
                "power_debounce_ms must be >= 2000",
            ));
        }
        self.servo.validate()
    }

    pub fn due_tolerance(&self) -> Duration {
        Duration::from_secs(self.due_tolerance_secs as u64)
    }

    pub fn default_notify_delay(&self) -> Duration {
        Duration::from_secs(self.default_notify_delay_secs as u64)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs as u64)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs as u64)
    }
}

impl ServoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compartments.is_empty() {
            return Err(ConfigError::ValidationFailed("no compartments configured"));
        }
        if self.compartments.iter().any(|&c| c == 0) {
            return Err(ConfigError::ValidationFailed(
                "compartment numbers start at 1",
            ));
        }
        if self.max_operations_per_window == 0 || self.window_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "operation window must allow at least one actuation",
            ));
        }
        if self.pwm_hz == 0 || self.pwm_hz > 400 {
            return Err(ConfigError::ValidationFailed("pwm_hz must be 1..=400"));
        }
        if self.hold_ms > 10_000 || self.settle_ms > 5_000 {
            return Err(ConfigError::ValidationFailed(
                "hold/settle too long for a bounded actuation",
            ));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms as u64)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs as u64)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms as u64)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms as u64)
    }
}
