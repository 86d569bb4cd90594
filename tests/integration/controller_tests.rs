//! AlertController behaviour against mock ports: enable flag, transport
//! failures, report retries, reminders, capacity and escalation policy.

use std::time::Duration;

use pillbox::adapters::memory_store::MemoryScheduleStore;
use pillbox::adapters::time::ManualClock;
use pillbox::app::commands::ControllerCommand;
use pillbox::app::events::Notice;
use pillbox::app::ports::ScheduleStore;
use pillbox::app::service::{AlertController, ConfirmOutcome, PollOutcome};
use pillbox::config::ControllerConfig;
use pillbox::events::{Button, InputEvent};
use pillbox::fsm::AlertPhase;
use pillbox::model::NotificationProfile;

use crate::mock_ports::{MockDispenser, MockStore, RecordingSender, RecordingSink, due, monday_morning};

type TestController = AlertController<MockStore, RecordingSender, ManualClock, RecordingSink>;

fn controller_with(
    config: ControllerConfig,
    store: MockStore,
    sender: Option<RecordingSender>,
) -> (TestController, ManualClock) {
    let clock = ManualClock::starting_at(monday_morning());
    let controller = AlertController::new(config, store, sender, clock.clone(), RecordingSink::default());
    controller.start();
    (controller, clock)
}

fn standard() -> (TestController, ManualClock) {
    controller_with(
        ControllerConfig::default(),
        MockStore::new(vec![due(1, 1, "Aspirin")]),
        Some(RecordingSender::new()),
    )
}

// ── Enable flag ───────────────────────────────────────────────

#[test]
fn disabled_system_raises_nothing() {
    let store = MockStore::new(vec![due(1, 1, "Aspirin")]);
    store.set_enabled(false);
    let (controller, _) = controller_with(ControllerConfig::default(), store, None);
    let mut dispenser = MockDispenser::new();

    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::Disabled);
    assert!(dispenser.calls.is_empty());
    assert_eq!(controller.store().due_queries(), 0);
    assert_eq!(controller.poll_interval_ms(), 30_000);
    assert_eq!(controller.sink().all()[0], Notice::Started { enabled: false });
}

#[test]
fn power_button_flips_the_store_flag() {
    let store = MockStore::new(vec![due(1, 1, "Aspirin")]);
    store.set_enabled(false);
    let (controller, _) = controller_with(ControllerConfig::default(), store, None);

    controller.handle_command(ControllerCommand::from(InputEvent {
        button: Button::Power,
        at_ms: 0,
    }));
    assert!(controller.is_enabled());
    assert_eq!(controller.poll_interval_ms(), 5_000);
    assert_eq!(
        controller.store().state.lock().unwrap().toggles,
        vec![(true, "power_button".to_string())]
    );

    let mut dispenser = MockDispenser::new();
    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 1, .. }
    ));
}

#[test]
fn failed_toggle_keeps_current_flag() {
    let (controller, _) = standard();
    controller.store().fail_next(1);
    assert!(controller.on_power_toggle_pressed().is_err());
    assert!(controller.is_enabled());
}

#[test]
fn failed_toggle_command_is_reported_not_dropped() {
    let (controller, _) = standard();
    controller.store().fail_next(1);
    controller.handle_command(ControllerCommand::TogglePower);
    assert!(controller.is_enabled());
    assert_eq!(
        controller
            .sink()
            .count(|n| matches!(n, Notice::StoreUnavailable(_))),
        1
    );
    assert!(controller.store().state.lock().unwrap().toggles.is_empty());
}

// ── Transport failures ────────────────────────────────────────

#[test]
fn transport_failure_skips_cycle_and_recovers() {
    let (controller, _) = standard();
    let mut dispenser = MockDispenser::new();

    controller.store().fail_next(2);
    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::Unavailable);
    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::Unavailable);
    assert!(dispenser.calls.is_empty());
    assert_eq!(
        controller
            .sink()
            .count(|n| matches!(n, Notice::StoreUnavailable(_))),
        1,
        "unreachable store is announced once per outage"
    );

    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 1, dispensed: true }
    ));
    assert_eq!(dispenser.calls.len(), 1);
}

#[test]
fn failed_taken_report_is_retried_until_recorded() {
    let (controller, clock) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    controller.store().fail_records(2);
    clock.advance_secs(10);
    assert!(matches!(
        controller.confirm(1),
        ConfirmOutcome::Confirmed { recorded: false, .. }
    ));
    assert_eq!(controller.book_counts().unrecorded, 1);

    // First retry waits 5s, the second 10s.
    assert_eq!(controller.sweep().recorded, 0);
    assert_eq!(controller.store().record_attempts(), 1);
    clock.advance_secs(5);
    assert_eq!(controller.sweep().recorded, 0);
    assert_eq!(controller.store().record_attempts(), 2);
    clock.advance_secs(9);
    assert_eq!(controller.sweep().recorded, 0);
    assert_eq!(controller.store().record_attempts(), 2);
    clock.advance_secs(1);
    assert_eq!(controller.sweep().recorded, 1);
    assert_eq!(controller.sweep().recorded, 0);

    assert_eq!(controller.store().record_attempts(), 3);
    let records = controller.store().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].2, monday_morning() + chrono::Duration::seconds(10));
    assert_eq!(controller.book_counts().unrecorded, 0);
}

#[test]
fn rejected_taken_report_is_not_retried() {
    let (controller, clock) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    controller.store().reject_records(403);
    assert!(matches!(
        controller.confirm(1),
        ConfirmOutcome::Confirmed { recorded: false, .. }
    ));
    assert_eq!(controller.book_counts().unrecorded, 0);

    for _ in 0..600 {
        clock.advance_secs(1);
        assert_eq!(controller.sweep().recorded, 0);
    }
    assert_eq!(controller.store().record_attempts(), 1);
    assert!(controller.store().records().is_empty());

    // The rejected intake still blocks a re-raise of the same schedule.
    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::NothingDue);
    assert_eq!(dispenser.calls.len(), 1);
}

#[test]
fn outage_retries_back_off_to_the_cap() {
    let (controller, clock) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    controller.store().fail_records(u32::MAX);
    controller.confirm(1);
    for _ in 0..600 {
        clock.advance_secs(1);
        controller.sweep();
    }
    // Attempts at 0, 5, 15, 35, 75, 155 and 315s; the next waits the 300s cap.
    assert_eq!(controller.store().record_attempts(), 7);
    assert_eq!(controller.book_counts().unrecorded, 1);
}

// ── Confirmation ──────────────────────────────────────────────

#[test]
fn confirmation_is_idempotent() {
    let (controller, _) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    assert!(matches!(controller.confirm(1), ConfirmOutcome::Confirmed { .. }));
    assert_eq!(controller.confirm(1), ConfirmOutcome::NoSuchAlert);
    assert_eq!(controller.confirm(99), ConfirmOutcome::NoSuchAlert);
    assert_eq!(controller.on_confirmation_pressed(), ConfirmOutcome::NoSuchAlert);
    assert_eq!(controller.store().records().len(), 1);
    assert_eq!(controller.stats().snapshot().confirmations, 1);
}

#[test]
fn confirmed_schedule_is_not_raised_again() {
    let (controller, _) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);
    controller.confirm(1);

    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::NothingDue);
    assert_eq!(dispenser.calls.len(), 1);
}

#[test]
fn one_alert_at_a_time_by_default() {
    let store = MockStore::new(vec![due(1, 1, "Aspirin"), due(2, 3, "Vitamin D")]);
    let (controller, _) = controller_with(ControllerConfig::default(), store, None);
    let mut dispenser = MockDispenser::new();

    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 1, .. }
    ));
    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::AtCapacity);

    controller.on_confirmation_pressed();
    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 2, .. }
    ));
    assert_eq!(dispenser.calls.iter().map(|c| c.0).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn button_confirms_oldest_when_several_are_open() {
    let config = ControllerConfig {
        max_concurrent_alerts: 2,
        ..ControllerConfig::default()
    };
    let store = MockStore::new(vec![due(1, 1, "Aspirin"), due(2, 3, "Vitamin D")]);
    let (controller, clock) = controller_with(config, store, None);
    let mut dispenser = MockDispenser::new();

    controller.poll_cycle(&mut dispenser);
    clock.advance_secs(5);
    controller.poll_cycle(&mut dispenser);
    assert_eq!(controller.book_counts().active, 2);

    assert!(matches!(
        controller.on_confirmation_pressed(),
        ConfirmOutcome::Confirmed { schedule_id: 1, .. }
    ));
    assert_eq!(
        controller.alert_phase(2),
        Some(AlertPhase::AwaitingConfirmation)
    );
}

// ── Reminders ─────────────────────────────────────────────────

#[test]
fn reminders_stop_at_configured_count() {
    let (controller, clock) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    let mut total = 0;
    for _ in 0..5 {
        clock.advance_secs(30);
        total += controller.sweep().reminders;
    }
    // Two repeats after the initial announcement, then the exhausted notice.
    assert_eq!(total, 3);
    let sink = controller.sink();
    assert_eq!(sink.count(|n| matches!(n, Notice::Reminder { .. })), 2);
    assert_eq!(sink.count(|n| matches!(n, Notice::RemindersExhausted { .. })), 1);
    assert!(sink.all().contains(&Notice::Reminder {
        medicine_name: "Aspirin".into(),
        compartment: 1,
        attempt: 3,
        of: 3,
    }));
}

// ── Escalation policy ─────────────────────────────────────────

#[test]
fn profile_delay_sets_escalation_deadline() {
    let store = MockStore::new(vec![due(1, 1, "Aspirin")]);
    store.state.lock().unwrap().profile = Some(NotificationProfile {
        notification_delay_minutes: 1,
        ..NotificationProfile::fallback(1)
    });
    let (controller, clock) = controller_with(ControllerConfig::default(), store, Some(RecordingSender::new()));
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    clock.advance_secs(59);
    assert_eq!(controller.sweep().escalations, 0);
    clock.advance_secs(1);
    assert_eq!(controller.sweep().delivered, 1);
}

#[test]
fn missing_profile_falls_back_to_default_delay() {
    let store = MockStore::new(vec![due(1, 1, "Aspirin")]);
    store.state.lock().unwrap().profile = None;
    let (controller, clock) = controller_with(ControllerConfig::default(), store, Some(RecordingSender::new()));
    let mut dispenser = MockDispenser::new();
    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { dispensed: true, .. }
    ));

    clock.advance_secs(899);
    assert_eq!(controller.sweep().escalations, 0);
    clock.advance_secs(1);
    assert_eq!(controller.sweep().escalations, 1);
}

#[test]
fn failed_delivery_is_not_retried() {
    let (controller, clock) = controller_with(
        ControllerConfig::default(),
        MockStore::new(vec![due(1, 1, "Aspirin")]),
        Some(RecordingSender::failing()),
    );
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    clock.advance_secs(900);
    let report = controller.sweep();
    assert_eq!((report.escalations, report.delivered), (1, 0));
    clock.advance_secs(60);
    assert_eq!(controller.sweep().escalations, 0);
    assert_eq!(
        controller
            .sink()
            .count(|n| matches!(n, Notice::CaregiverNotifyFailed { .. })),
        1
    );
}

#[test]
fn missing_notifier_is_reported_once() {
    let (controller, clock) = controller_with(
        ControllerConfig::default(),
        MockStore::new(vec![due(1, 1, "Aspirin")]),
        None,
    );
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    clock.advance_secs(900);
    assert_eq!(controller.sweep().escalations, 1);
    clock.advance_secs(1);
    assert_eq!(controller.sweep().escalations, 0);
    assert_eq!(
        controller
            .sink()
            .count(|n| matches!(n, Notice::NotifierUnavailable { .. })),
        1
    );
    assert_eq!(controller.alert_phase(1), Some(AlertPhase::Escalated));
}

#[test]
fn unconfirmed_alert_expires_after_retention() {
    let (controller, clock) = standard();
    let mut dispenser = MockDispenser::new();
    controller.poll_cycle(&mut dispenser);

    clock.advance(Duration::from_secs(7_200));
    let report = controller.sweep();
    assert_eq!(report.expired, 1);
    assert_eq!(controller.alert_phase(1), None);
    assert!(!controller.has_pending(1));
    assert!(controller.store().records().is_empty());
    assert_eq!(controller.sink().count(|n| matches!(n, Notice::AlertExpired { .. })), 1);
}

// ── In-memory store end to end ────────────────────────────────

const FIXTURE: &str = r#"{
    "system_enabled": true,
    "profiles": [{"user_id": 1, "full_name": "Ana"}],
    "medicines": [
        {"id": 5, "name": "Aspirin", "compartment_number": 2, "dosage": "2 tablets",
         "quantity": 6, "min_quantity": 2}
    ],
    "schedules": [
        {"id": 9, "user_id": 1, "medicine_id": 5, "time": "08:00", "days_of_week": ["monday"]}
    ]
}"#;

#[test]
fn memory_store_drives_a_full_cycle() {
    let clock = ManualClock::starting_at(monday_morning());
    let store = MemoryScheduleStore::from_json(FIXTURE, clock.clone(), Duration::from_secs(120)).unwrap();
    let controller = AlertController::new(
        ControllerConfig::default(),
        store,
        Some(RecordingSender::new()),
        clock.clone(),
        RecordingSink::default(),
    );
    controller.start();
    let mut dispenser = MockDispenser::new();

    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 9, dispensed: true }
    ));
    assert_eq!(dispenser.calls[0].0, 2);
    assert_eq!(controller.store().medicine(5).unwrap().quantity, 4);

    clock.advance_secs(20);
    assert!(matches!(
        controller.confirm(9),
        ConfirmOutcome::Confirmed { recorded: true, .. }
    ));
    assert_eq!(controller.store().history().len(), 1);
    assert!(controller.store().due_schedules(1).unwrap().is_empty());
    assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::NothingDue);
}
