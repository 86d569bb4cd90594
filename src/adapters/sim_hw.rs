//! Simulated hardware for host runs and tests.
//!
//! [`SimulatedPwm`] implements `embedded-hal`'s [`SetDutyCycle`] with a
//! 1000-step resolution, so duty values read back directly in tenths of a
//! percent.  It records every write and can be told to fail a position
//! write to exercise the actuator fault path.  Fully-off writes never fail.
//!
//! [`StdDelay`] implements [`DelayNs`] with `std::thread::sleep`.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{self, ErrorKind, ErrorType, SetDutyCycle};

const SIM_MAX_DUTY: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPwmFault;

impl pwm::Error for SimPwmFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedPwm {
    duty: u16,
    writes: Vec<u16>,
    /// Position writes left before the next one fails.
    fail_after: Option<usize>,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` position writes succeed, then fail the next one (once).
    pub fn fail_position_write_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Current duty in tenths of a percent.
    pub fn permille(&self) -> u16 {
        self.duty
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> &[u16] {
        &self.writes
    }
}

impl ErrorType for SimulatedPwm {
    type Error = SimPwmFault;
}

impl SetDutyCycle for SimulatedPwm {
    fn max_duty_cycle(&self) -> u16 {
        SIM_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if duty != 0 {
            match self.fail_after {
                Some(0) => {
                    self.fail_after = None;
                    return Err(SimPwmFault);
                }
                Some(n) => self.fail_after = Some(n - 1),
                None => {}
            }
        }
        self.duty = duty.min(SIM_MAX_DUTY);
        self.writes.push(self.duty);
        Ok(())
    }
}

/// Blocking delay on the host thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        if ns > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        if ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(ms as u64));
        }
    }
}
