//! GPIO assignments for the PillBox carrier board (BCM numbering).
//!
//! Single source of truth for the wiring.  The host build drives simulated
//! PWM channels, but logs this map at boot so a bench setup can be checked
//! against it.

/// Servo signal pins, indexed by compartment number (1-based).
/// GPIO 12/13 and 18/19 are the two hardware PWM pairs.
pub const SERVO_GPIO: [(u8, u8); 4] = [(1, 12), (2, 13), (3, 18), (4, 19)];

/// Confirmation push button, active low with internal pull-up.
pub const CONFIRM_BUTTON_GPIO: u8 = 17;

/// Power (system enable) push button, active low with internal pull-up.
pub const POWER_BUTTON_GPIO: u8 = 27;

/// Servo pin for `compartment`, if the board wires one.
pub fn servo_gpio(compartment: u8) -> Option<u8> {
    SERVO_GPIO
        .iter()
        .find(|(c, _)| *c == compartment)
        .map(|(_, gpio)| *gpio)
}
