//! Unified error types for the PillBox controller.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! loop handles failures uniformly.  Dispense errors are `Copy` so they can be
//! passed through the safety gate and alert book without allocation; transport
//! errors carry the collaborator's message for the log.

use core::fmt;
use core::time::Duration;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A compartment actuation was refused or failed.
    Dispense(DispenseError),
    /// The schedule store could not be reached or answered badly.
    Transport(TransportError),
    /// The emergency notification could not be delivered.
    Notify(NotifyError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispense(e) => write!(f, "dispense: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Dispense errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseError {
    /// Compartment number is not wired to a gate.
    InvalidCompartment(u8),
    /// The safety gate refused the actuation.
    RateLimited(RateLimit),
    /// A PWM write failed mid-sequence; the output was forced neutral.
    ActuatorFault { compartment: u8 },
}

/// Why the safety gate refused an actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    /// Too soon after the previous actuation on any compartment.
    Cooldown { remaining: Duration },
    /// The per-window operation budget is spent.
    WindowExhausted,
}

impl fmt::Display for DispenseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCompartment(c) => write!(f, "invalid compartment {c}"),
            Self::RateLimited(RateLimit::Cooldown { remaining }) => {
                write!(f, "rate limited (cooldown, {}ms left)", remaining.as_millis())
            }
            Self::RateLimited(RateLimit::WindowExhausted) => {
                write!(f, "rate limited (operation window exhausted)")
            }
            Self::ActuatorFault { compartment } => {
                write!(f, "actuator fault on compartment {compartment}")
            }
        }
    }
}

impl std::error::Error for DispenseError {}

impl From<DispenseError> for Error {
    fn from(e: DispenseError) -> Self {
        Self::Dispense(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures talking to the schedule store or notification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout.
    Unreachable(String),
    /// The collaborator answered with a non-success HTTP status.
    Status(u16),
    /// The response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "unreachable: {msg}"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Decode(msg) => write!(f, "bad response: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Worth retrying: the collaborator was down or overloaded.  Client
    /// errors and rejected replies will not change on resend.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            Self::Decode(_) => false,
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The sender accepted the request but reported a failed delivery.
    Delivery(String),
    /// The sender could not be reached.
    Transport(TransportError),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery(msg) => write!(f, "delivery failed: {msg}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<TransportError> for NotifyError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
