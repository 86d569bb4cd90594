//! End-to-end scenarios: due schedule → dispense → confirm or escalate,
//! plus the actuator safety limits.

use std::time::Duration;

use pillbox::adapters::sim_hw::{SimulatedPwm, StdDelay};
use pillbox::adapters::time::ManualClock;
use pillbox::app::events::Notice;
use pillbox::app::ports::Dispenser;
use pillbox::app::service::{AlertController, ConfirmOutcome, PollOutcome};
use pillbox::config::{ControllerConfig, ServoConfig};
use pillbox::drivers::dispenser::CompartmentActuator;
use pillbox::error::{DispenseError, RateLimit};
use pillbox::fsm::AlertPhase;

use crate::mock_ports::{MockDispenser, MockStore, RecordingSender, RecordingSink, due, monday_morning};

type TestController = AlertController<MockStore, RecordingSender, ManualClock, RecordingSink>;

fn raised_controller() -> (TestController, ManualClock, MockDispenser) {
    let clock = ManualClock::starting_at(monday_morning());
    let store = MockStore::new(vec![due(1, 1, "Aspirin")]);
    let controller = AlertController::new(
        ControllerConfig::default(),
        store,
        Some(RecordingSender::new()),
        clock.clone(),
        RecordingSink::default(),
    );
    controller.start();
    let mut dispenser = MockDispenser::new();
    assert_eq!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised {
            schedule_id: 1,
            dispensed: true
        }
    );
    (controller, clock, dispenser)
}

fn sent(controller: &TestController) -> usize {
    controller.notifier().map_or(0, RecordingSender::count)
}

// ── Scenario A: due schedule raises an alert and dispenses ────

#[test]
fn due_schedule_dispenses_and_arms_escalation() {
    let (controller, clock, dispenser) = raised_controller();

    assert_eq!(dispenser.calls, vec![(1, Duration::from_secs(2))]);
    assert_eq!(controller.alert_phase(1), Some(AlertPhase::AwaitingConfirmation));
    assert!(controller.has_pending(1));
    assert_eq!(controller.store().quantity_updates(), vec![(101, -1)]);
    assert_eq!(
        controller
            .sink()
            .count(|n| matches!(n, Notice::TimeToTake { compartment: 1, .. })),
        1
    );

    // One second short of the 900 s profile delay nothing fires.
    clock.advance_secs(899);
    assert_eq!(controller.sweep().escalations, 0);
    clock.advance_secs(1);
    assert_eq!(controller.sweep().escalations, 1);
}

// ── Scenario B: confirmation within the delay ─────────────────

#[test]
fn confirmation_records_taken_and_cancels_escalation() {
    let (controller, clock, _) = raised_controller();

    clock.advance_secs(45);
    let outcome = controller.on_confirmation_pressed();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            schedule_id: 1,
            latency: Duration::from_secs(45),
            recorded: true
        }
    );
    assert_eq!(controller.alert_phase(1), None);
    assert!(!controller.has_pending(1));

    let records = controller.store().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, 1);
    assert_eq!(records[0].2, monday_morning() + chrono::Duration::seconds(45));

    clock.advance_secs(1_000);
    assert_eq!(controller.sweep().escalations, 0);
    assert_eq!(sent(&controller), 0);
}

// ── Scenario C: no confirmation, escalation exactly once ──────

#[test]
fn unconfirmed_alert_escalates_once() {
    let (controller, clock, _) = raised_controller();

    clock.advance_secs(900);
    let report = controller.sweep();
    assert_eq!((report.escalations, report.delivered), (1, 1));
    assert_eq!(sent(&controller), 1);
    assert_eq!(controller.alert_phase(1), Some(AlertPhase::Escalated));

    clock.advance_secs(5);
    assert_eq!(controller.sweep().escalations, 0);
    assert_eq!(sent(&controller), 1);

    // Still confirmable after escalation.
    assert!(matches!(controller.confirm(1), ConfirmOutcome::Confirmed { .. }));
    assert_eq!(controller.store().records().len(), 1);
}

// ── Scenario D: cooldown on the same compartment ──────────────

fn actuator(clock: &ManualClock) -> CompartmentActuator<SimulatedPwm, StdDelay, ManualClock> {
    let config = ServoConfig {
        cooldown_ms: 2_000,
        max_operations_per_window: 10,
        hold_ms: 0,
        settle_ms: 0,
        ..ServoConfig::default()
    };
    let channels = (0..4).map(|_| SimulatedPwm::new());
    CompartmentActuator::new(&config, channels, StdDelay, clock.clone()).unwrap()
}

#[test]
fn cooldown_rejects_then_recovers() {
    let clock = ManualClock::new();
    let mut act = actuator(&clock);

    assert!(act.open_and_close(2, Duration::ZERO).is_ok());

    clock.advance_secs(1);
    assert_eq!(
        act.open_and_close(2, Duration::ZERO),
        Err(DispenseError::RateLimited(RateLimit::Cooldown {
            remaining: Duration::from_secs(1)
        }))
    );
    assert_eq!(act.gate(2).unwrap().pwm().writes().len(), 4);

    clock.advance_secs(2);
    assert!(act.open_and_close(2, Duration::ZERO).is_ok());
}

// ── Scenario E: window limit across compartments ──────────────

#[test]
fn eleventh_operation_in_window_is_refused() {
    let clock = ManualClock::new();
    let mut act = actuator(&clock);

    for i in 0..10u8 {
        let compartment = i % 4 + 1;
        assert!(
            act.open_and_close(compartment, Duration::ZERO).is_ok(),
            "operation {} should pass",
            i + 1
        );
        clock.advance_secs(3);
    }
    assert_eq!(
        act.open_and_close(3, Duration::ZERO),
        Err(DispenseError::RateLimited(RateLimit::WindowExhausted))
    );

    // A fresh window opens 60 s after the first operation.
    clock.advance_secs(30);
    assert!(act.open_and_close(3, Duration::ZERO).is_ok());
}

// ── Actuator fault through the controller ─────────────────────

#[test]
fn actuator_fault_still_solicits_confirmation() {
    let clock = ManualClock::starting_at(monday_morning());
    let servo = ServoConfig {
        hold_ms: 0,
        settle_ms: 0,
        ..ServoConfig::default()
    };
    let config = ControllerConfig {
        servo: servo.clone(),
        ..ControllerConfig::default()
    };
    let controller = AlertController::new(
        config,
        MockStore::new(vec![due(4, 2, "Metformin")]),
        Some(RecordingSender::new()),
        clock.clone(),
        RecordingSink::default(),
    );
    let mut faulty = SimulatedPwm::new();
    faulty.fail_position_write_after(1);
    let channels = [SimulatedPwm::new(), faulty, SimulatedPwm::new(), SimulatedPwm::new()];
    let mut act = CompartmentActuator::new(&servo, channels, StdDelay, clock).unwrap();

    assert_eq!(
        controller.poll_cycle(&mut act),
        PollOutcome::Raised {
            schedule_id: 4,
            dispensed: false
        }
    );
    let gate = act.gate(2).unwrap();
    assert!(!gate.is_energised());
    assert_eq!(gate.pwm().permille(), 0);

    assert_eq!(controller.alert_phase(4), Some(AlertPhase::AwaitingConfirmation));
    assert!(controller.has_pending(4));
    assert!(controller.store().quantity_updates().is_empty());
    assert_eq!(
        controller.sink().count(|n| matches!(
            n,
            Notice::DispenseFailed {
                reason: DispenseError::ActuatorFault { compartment: 2 },
                ..
            }
        )),
        1
    );
    assert_eq!(act.compartments(), &[1, 2, 3, 4]);
}
