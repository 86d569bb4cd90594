//! Compartment gate servo (SG90-class hobby servo).
//!
//! Position is set by pulse width on a 50 Hz PWM channel:
//!
//! | Angle | Duty  | Gate   |
//! |-------|-------|--------|
//! | 0°    | 2 %   | Closed |
//! | 90°   | 7 %   | Open   |
//!
//! `duty% = angle / 18 + 2`.  Once the horn has reached position the output
//! is dropped to fully off ("neutral") so the servo does not hunt and buzz
//! while holding.
//!
//! ## Dual-target design
//!
//! The gate is generic over [`SetDutyCycle`], so the same driver runs on a
//! real PWM peripheral or on [`SimulatedPwm`](crate::adapters::sim_hw::SimulatedPwm),
//! which only tracks state in memory.

use embedded_hal::pwm::SetDutyCycle;

pub const CLOSED_DEG: u16 = 0;
pub const OPEN_DEG: u16 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Open,
}

impl GateState {
    pub fn angle(self) -> u16 {
        match self {
            Self::Closed => CLOSED_DEG,
            Self::Open => OPEN_DEG,
        }
    }
}

/// Duty cycle in tenths of a percent for a horn angle (0..=180°).
pub fn angle_to_permille(angle: u16) -> u16 {
    let angle = angle.min(180);
    20 + angle * 5 / 9
}

pub struct ServoGate<P> {
    pwm: P,
    state: GateState,
    energised: bool,
}

impl<P: SetDutyCycle> ServoGate<P> {
    /// Wraps a PWM channel.  The gate is assumed closed until homed.
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            state: GateState::Closed,
            energised: false,
        }
    }

    /// Start driving the horn towards `target`.  The caller waits for it to
    /// settle and then calls [`neutral`](Self::neutral).
    pub fn drive(&mut self, target: GateState) -> Result<(), P::Error> {
        self.pwm
            .set_duty_cycle_fraction(angle_to_permille(target.angle()), 1000)?;
        self.energised = true;
        self.state = target;
        Ok(())
    }

    /// Drop the output to fully off.
    pub fn neutral(&mut self) -> Result<(), P::Error> {
        self.pwm.set_duty_cycle_fully_off()?;
        self.energised = false;
        Ok(())
    }

    /// Best-effort neutral after a failed write.  The output is treated as
    /// off even if the channel reports another error.
    pub fn force_neutral(&mut self) {
        let _ = self.pwm.set_duty_cycle_fully_off();
        self.energised = false;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_energised(&self) -> bool {
        self.energised
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}
