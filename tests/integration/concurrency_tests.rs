//! The controller shared between an input thread and the control thread,
//! as `main` runs it.  The store is slowed down so one thread's report is
//! still in flight while the other sweeps and polls.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use pillbox::adapters::time::ManualClock;
use pillbox::app::ports::Clock;
use pillbox::app::service::{AlertController, ConfirmOutcome, PollOutcome};
use pillbox::config::ControllerConfig;

use crate::mock_ports::{MockDispenser, MockStore, RecordingSender, RecordingSink, due, monday_morning};

type SharedController = Arc<AlertController<MockStore, RecordingSender, ManualClock, RecordingSink>>;

fn shared_raised() -> (SharedController, ManualClock) {
    let clock = ManualClock::starting_at(monday_morning());
    let controller = Arc::new(AlertController::new(
        ControllerConfig::default(),
        MockStore::new(vec![due(1, 1, "Aspirin")]),
        Some(RecordingSender::new()),
        clock.clone(),
        RecordingSink::default(),
    ));
    controller.start();
    let mut dispenser = MockDispenser::new();
    assert!(matches!(
        controller.poll_cycle(&mut dispenser),
        PollOutcome::Raised { schedule_id: 1, .. }
    ));
    (controller, clock)
}

fn sent(controller: &SharedController) -> usize {
    controller.notifier().map_or(0, RecordingSender::count)
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn sweep_never_resends_a_report_in_flight() {
    let (controller, clock) = shared_raised();
    controller.store().slow_records(Duration::from_millis(300));

    let input = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.confirm(1))
    };
    wait_until("the taken report to start", || controller.store().record_attempts() == 1);

    let mut dispenser = MockDispenser::new();
    let mut elapsed = 0;
    while !input.is_finished() {
        if elapsed < 1_000 {
            clock.advance_secs(50);
            elapsed += 50;
        }
        controller.sweep();
        assert_eq!(controller.poll_cycle(&mut dispenser), PollOutcome::NothingDue);
        thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(
        input.join().unwrap(),
        ConfirmOutcome::Confirmed { recorded: true, .. }
    ));
    controller.sweep();

    assert_eq!(controller.store().record_attempts(), 1);
    assert_eq!(controller.store().records().len(), 1);
    assert_eq!(sent(&controller), 0);
    assert!(dispenser.calls.is_empty());
    assert_eq!(controller.book_counts().unrecorded, 0);
}

#[test]
fn failed_button_report_is_retried_once_by_the_sweep() {
    let (controller, clock) = shared_raised();
    controller.store().fail_records(1);
    controller.store().slow_records(Duration::from_millis(100));

    let input = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.on_confirmation_pressed())
    };
    wait_until("the first taken report", || controller.store().record_attempts() >= 1);

    while controller.store().records().is_empty() {
        assert!(clock.monotonic() < Duration::from_secs(600), "retry never happened");
        clock.advance_secs(1);
        controller.sweep();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(
        input.join().unwrap(),
        ConfirmOutcome::Confirmed { recorded: false, .. }
    ));

    assert_eq!(controller.store().record_attempts(), 2);
    assert_eq!(controller.store().records().len(), 1);
    assert_eq!(controller.book_counts().unrecorded, 0);
    assert_eq!(sent(&controller), 0);
}

#[test]
fn racing_confirmations_confirm_once() {
    let (controller, _) = shared_raised();
    let start = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let controller = Arc::clone(&controller);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                if i == 0 {
                    controller.confirm(1)
                } else {
                    controller.on_confirmation_pressed()
                }
            })
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let confirmed = outcomes
        .iter()
        .filter(|o| matches!(o, ConfirmOutcome::Confirmed { .. }))
        .count();
    assert_eq!(confirmed, 1);
    assert_eq!(controller.store().records().len(), 1);
    assert!(!controller.has_pending(1));
}
