//! PillBox controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HttpScheduleStore  MemoryScheduleStore  HttpNotifier          │
//! │  (ScheduleStore)    (ScheduleStore)      (NotificationSender)  │
//! │  LogNoticeSink      SystemClock          FileConfigAdapter     │
//! │  (NoticeSink)       (Clock)              (ConfigPort)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          AlertController (pure logic, Arc-shared)      │    │
//! │  │  Poller · AlertBook · Escalation gate                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Control thread: Scheduler → poll / sweep / telemetry + servo  │
//! │  Input thread:   INPUT_CHANNEL → debounce → confirm / power    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pillbox::adapters::config_file::FileConfigAdapter;
use pillbox::adapters::http_store::{HttpNotifier, HttpScheduleStore};
use pillbox::adapters::log_sink::{LogNoticeSink, LogNotifier};
use pillbox::adapters::memory_store::MemoryScheduleStore;
use pillbox::adapters::sim_hw::{SimulatedPwm, StdDelay};
use pillbox::adapters::stdin_input::StdinInput;
use pillbox::adapters::time::SystemClock;
use pillbox::app::commands::ControllerCommand;
use pillbox::app::ports::{Clock, ConfigPort, NotificationSender, ScheduleStore, SchedulerDelegate, TaskKind};
use pillbox::app::service::{AlertController, SweepReport};
use pillbox::config::ControllerConfig;
use pillbox::diagnostics;
use pillbox::drivers::button::Debouncer;
use pillbox::drivers::dispenser::CompartmentActuator;
use pillbox::events::{Button, wait_input};
use pillbox::pins;
use pillbox::scheduler::Scheduler;

const CONFIG_ENV: &str = "PILLBOX_CONFIG";
const API_KEY_ENV: &str = "PILLBOX_API_KEY";
const DEFAULT_CONFIG_PATH: &str = "pillbox.json";

type HostActuator = CompartmentActuator<SimulatedPwm, StdDelay, SystemClock>;
type Controller<S, N> = AlertController<S, N, SystemClock, LogNoticeSink>;

// ── Scheduler delegate ────────────────────────────────────────
//
// The scheduler only knows task kinds; this delegate owns the actuator
// and turns each due task into a controller call on the control thread.

struct ControlDelegate<'a, S, N> {
    controller: &'a Controller<S, N>,
    actuator: &'a mut HostActuator,
    clock: SystemClock,
}

impl<S: ScheduleStore, N: NotificationSender> SchedulerDelegate for ControlDelegate<'_, S, N> {
    fn on_task_due(&mut self, task: TaskKind) {
        match task {
            TaskKind::PollSchedules => {
                let outcome = self.controller.poll_cycle(&mut *self.actuator);
                debug!("poll: {:?}", outcome);
            }
            TaskKind::SweepPending => {
                let report = self.controller.sweep();
                if report != SweepReport::default() {
                    debug!("sweep: {:?}", report);
                }
            }
            TaskKind::Telemetry => {
                let ops = self.actuator.safety().operations_in_window(self.clock.monotonic());
                self.controller.telemetry(Some(ops)).log();
            }
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    diagnostics::install_panic_handler();

    info!("PillBox v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = FileConfigAdapter::new(&config_path)
        .load()
        .with_context(|| format!("loading {config_path}"))?;
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        config.api_key = key;
    }

    for &compartment in &config.servo.compartments {
        match pins::servo_gpio(compartment) {
            Some(gpio) => info!("compartment {compartment} → servo on GPIO{gpio}"),
            None => warn!("compartment {compartment} has no servo pin on this board"),
        }
    }
    info!(
        "buttons: confirm GPIO{}, power GPIO{}",
        pins::CONFIRM_BUTTON_GPIO,
        pins::POWER_BUTTON_GPIO
    );

    let clock = SystemClock::new();
    match config.simulation_fixture.clone() {
        Some(fixture) => {
            info!("store: in-memory fixture {fixture}");
            let store = MemoryScheduleStore::from_file(Path::new(&fixture), clock.clone(), config.due_tolerance())
                .with_context(|| format!("loading fixture {fixture}"))?;
            run(config, store, Some(LogNotifier), clock)
        }
        None => {
            info!("store: {}", config.server_url);
            let store = HttpScheduleStore::new(&config).context("building schedule store client")?;
            let notifier = HttpNotifier::new(&config).context("building notifier client")?;
            run(config, store, Some(notifier), clock)
        }
    }
}

fn run<S, N>(config: ControllerConfig, store: S, notifier: Option<N>, clock: SystemClock) -> Result<()>
where
    S: ScheduleStore + 'static,
    N: NotificationSender + 'static,
{
    // ── Actuators ─────────────────────────────────────────────
    let channels = config.servo.compartments.iter().map(|_| SimulatedPwm::new());
    let mut actuator = CompartmentActuator::new(&config.servo, channels, StdDelay, clock.clone())
        .context("building compartment actuator")?;
    if let Err(e) = actuator.home_all() {
        warn!("homing failed: {}", e);
    }

    // ── Controller ────────────────────────────────────────────
    let controller = Arc::new(AlertController::new(
        config.clone(),
        store,
        notifier,
        clock.clone(),
        LogNoticeSink::new(),
    ));
    controller.start();

    // ── Input thread ──────────────────────────────────────────
    let input_controller = Arc::clone(&controller);
    let mut confirm = Debouncer::new(config.confirm_debounce_ms);
    let mut power = Debouncer::new(config.power_debounce_ms);
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            loop {
                let event = wait_input();
                let accepted = match event.button {
                    Button::Confirm => confirm.accept(event.at_ms),
                    Button::Power => power.accept(event.at_ms),
                };
                if accepted {
                    input_controller.handle_command(ControllerCommand::from(event));
                } else {
                    debug!("input: {:?} bounced", event.button);
                }
            }
        })
        .context("spawning input thread")?;
    StdinInput::spawn(clock.clone()).context("spawning stdin reader")?;

    // ── Control loop ──────────────────────────────────────────
    let mut scheduler = Scheduler::new();
    scheduler.add(TaskKind::PollSchedules, controller.poll_interval_ms(), true);
    scheduler.add(TaskKind::SweepPending, config.sweep_interval_ms, false);
    scheduler.add(TaskKind::Telemetry, config.telemetry_interval_secs.saturating_mul(1000), false);

    let tick = Duration::from_millis(config.tick_ms as u64);
    let mut delegate = ControlDelegate {
        controller: &controller,
        actuator: &mut actuator,
        clock: clock.clone(),
    };
    let mut last = clock.monotonic();
    info!("control loop running ({} ms tick)", config.tick_ms);
    loop {
        let now = clock.monotonic();
        let delta = now.saturating_sub(last).as_millis() as u32;
        last = now;

        scheduler.tick(delta, &mut delegate);
        scheduler.set_interval(TaskKind::PollSchedules, delegate.controller.poll_interval_ms());

        thread::sleep(tick);
    }
}
