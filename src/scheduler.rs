//! Periodic task scheduler.
//!
//! Drives the control thread's periodic work.  The scheduler notifies a
//! [`SchedulerDelegate`] when a task falls due; the main loop implements
//! the delegate and forwards to the alert controller.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Periodic tasks                        │
//! │                                                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//! │  │ PollSchedules│   │ SweepPending │   │  Telemetry   │      │
//! │  │  5s / 30s    │   │     1s       │   │     60s      │      │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘      │
//! │         │                  │                  │              │
//! │         ▼                  ▼                  ▼              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                  SchedulerDelegate                     │  │
//! │  │        (main loop calls into AlertController)          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time is fed in as elapsed milliseconds per tick, so the scheduler never
//! reads a clock itself and can be driven deterministically in tests.

use crate::app::ports::{SchedulerDelegate, TaskKind};
use log::info;

/// Maximum number of periodic tasks (stack-allocated).
const MAX_TASKS: usize = 4;

#[derive(Debug, Clone)]
struct TaskEntry {
    kind: TaskKind,
    interval_ms: u32,
    elapsed_ms: u64,
    enabled: bool,
}

/// The scheduler engine.
pub struct Scheduler {
    tasks: heapless::Vec<TaskEntry, MAX_TASKS>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: heapless::Vec::new(),
        }
    }

    /// Register a task.  With `fire_immediately` the first tick runs it.
    /// Returns `false` if all slots are taken.
    pub fn add(&mut self, kind: TaskKind, interval_ms: u32, fire_immediately: bool) -> bool {
        let entry = TaskEntry {
            kind,
            interval_ms: interval_ms.max(1),
            elapsed_ms: if fire_immediately { interval_ms as u64 } else { 0 },
            enabled: true,
        };
        if self.tasks.push(entry).is_err() {
            return false;
        }
        info!("Scheduler: added {:?} every {}ms", kind, interval_ms);
        true
    }

    /// Change a task's period.  Progress towards the next fire is kept, so
    /// shortening the period can make the task fire on the next tick.
    pub fn set_interval(&mut self, kind: TaskKind, interval_ms: u32) {
        for task in self.tasks.iter_mut().filter(|t| t.kind == kind) {
            if task.interval_ms != interval_ms {
                info!(
                    "Scheduler: {:?} interval {}ms -> {}ms",
                    kind, task.interval_ms, interval_ms
                );
                task.interval_ms = interval_ms.max(1);
            }
        }
    }

    pub fn set_enabled(&mut self, kind: TaskKind, enabled: bool) {
        for task in self.tasks.iter_mut().filter(|t| t.kind == kind) {
            task.enabled = enabled;
        }
    }

    /// Advance every task by `delta_ms` and fire those that are due, in
    /// registration order.  A task fires at most once per tick.
    pub fn tick(&mut self, delta_ms: u32, delegate: &mut dyn SchedulerDelegate) {
        for task in self.tasks.iter_mut() {
            if !task.enabled {
                continue;
            }
            task.elapsed_ms += delta_ms as u64;
            if task.elapsed_ms >= task.interval_ms as u64 {
                task.elapsed_ms = 0;
                delegate.on_task_due(task.kind);
            }
        }
    }

    pub fn interval_ms(&self, kind: TaskKind) -> Option<u32> {
        self.tasks
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.interval_ms)
    }

    /// Number of enabled tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.enabled).count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
