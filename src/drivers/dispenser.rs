//! Multi-compartment dispenser built from one [`ServoGate`] per compartment.
//!
//! ## Actuation sequence
//!
//! ```text
//!  safety gate ──▶ Open ─ settle ─ neutral ─ hold ─ Closed ─ settle ─ neutral
//! ```
//!
//! The safety gate is consulted before the first PWM write, and a refused
//! request moves no gate.  If any write fails mid-sequence the channel is
//! forced to neutral before the fault is reported.  The sequence blocks the
//! calling thread for `hold + 2 × settle`.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{error, info};

use crate::app::ports::{Clock, ConfigError, Dispenser};
use crate::config::{MAX_COMPARTMENTS, ServoConfig};
use crate::drivers::servo::{GateState, ServoGate};
use crate::error::DispenseError;
use crate::safety::ActuatorSafetyGate;

pub struct CompartmentActuator<P, D, C> {
    ids: heapless::Vec<u8, MAX_COMPARTMENTS>,
    gates: heapless::Vec<ServoGate<P>, MAX_COMPARTMENTS>,
    safety: ActuatorSafetyGate,
    settle: Duration,
    delay: D,
    clock: C,
}

impl<P, D, C> CompartmentActuator<P, D, C>
where
    P: SetDutyCycle,
    D: DelayNs,
    C: Clock,
{
    /// Pair each configured compartment, in order, with a PWM channel.
    pub fn new(
        config: &ServoConfig,
        channels: impl IntoIterator<Item = P>,
        delay: D,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut gates = heapless::Vec::new();
        for pwm in channels.into_iter().take(config.compartments.len()) {
            if gates.push(ServoGate::new(pwm)).is_err() {
                break;
            }
        }
        if gates.len() != config.compartments.len() {
            return Err(ConfigError::ValidationFailed(
                "one PWM channel per compartment required",
            ));
        }
        Ok(Self {
            ids: config.compartments.clone(),
            gates,
            safety: ActuatorSafetyGate::new(config),
            settle: config.settle(),
            delay,
            clock,
        })
    }

    /// Drive every gate closed, then neutral.  Not counted by the safety gate.
    pub fn home_all(&mut self) -> Result<(), DispenseError> {
        let mut first_fault = None;
        for (idx, &compartment) in self.ids.iter().enumerate() {
            let gate = &mut self.gates[idx];
            if gate.drive(GateState::Closed).is_err() {
                gate.force_neutral();
                error!("SERVO: homing failed on compartment {compartment}");
                first_fault.get_or_insert(DispenseError::ActuatorFault { compartment });
            }
        }
        self.delay.delay_ms(self.settle.as_millis() as u32);
        for (idx, &compartment) in self.ids.iter().enumerate() {
            if self.gates[idx].neutral().is_err() {
                self.gates[idx].force_neutral();
                first_fault.get_or_insert(DispenseError::ActuatorFault { compartment });
            }
        }
        match first_fault {
            Some(fault) => Err(fault),
            None => {
                info!("SERVO: {} compartments homed", self.ids.len());
                Ok(())
            }
        }
    }

    pub fn safety(&self) -> &ActuatorSafetyGate {
        &self.safety
    }

    pub fn gate(&self, compartment: u8) -> Option<&ServoGate<P>> {
        self.index_of(compartment).map(|i| &self.gates[i])
    }

    fn index_of(&self, compartment: u8) -> Option<usize> {
        self.ids.iter().position(|&c| c == compartment)
    }

    fn run_sequence(&mut self, idx: usize, hold: Duration) -> Result<(), P::Error> {
        let settle_ms = self.settle.as_millis() as u32;
        let gate = &mut self.gates[idx];

        gate.drive(GateState::Open)?;
        self.delay.delay_ms(settle_ms);
        gate.neutral()?;

        self.delay.delay_ms(hold.as_millis() as u32);

        gate.drive(GateState::Closed)?;
        self.delay.delay_ms(settle_ms);
        gate.neutral()
    }
}

impl<P, D, C> Dispenser for CompartmentActuator<P, D, C>
where
    P: SetDutyCycle,
    D: DelayNs,
    C: Clock,
{
    fn open_and_close(&mut self, compartment: u8, hold: Duration) -> Result<(), DispenseError> {
        let idx = self
            .index_of(compartment)
            .ok_or(DispenseError::InvalidCompartment(compartment))?;

        let now = self.clock.monotonic();
        self.safety
            .try_acquire(now)
            .map_err(DispenseError::RateLimited)?;

        info!("SERVO: compartment {compartment} open (hold {}ms)", hold.as_millis());
        if self.run_sequence(idx, hold).is_err() {
            self.gates[idx].force_neutral();
            error!("SERVO: PWM write failed on compartment {compartment}, output forced off");
            return Err(DispenseError::ActuatorFault { compartment });
        }
        info!("SERVO: compartment {compartment} closed");
        Ok(())
    }

    fn compartments(&self) -> &[u8] {
        &self.ids
    }
}
