//! Edge debouncer for the confirmation and power buttons.
//!
//! ## Hardware
//!
//! Active-low momentary switches with pull-ups.  Each falling edge is
//! timestamped by the input source and delivered through
//! [`INPUT_CHANNEL`](crate::events::INPUT_CHANNEL); the input thread runs
//! every edge through its button's `Debouncer` before acting on it.
//!
//! | Button  | Window  | Action                       |
//! |---------|---------|------------------------------|
//! | Confirm | 300 ms  | confirm the oldest alert     |
//! | Power   | 2000 ms | toggle the system-enabled flag |
//!
//! The first edge is accepted immediately; later edges are accepted only
//! once `window_ms` has passed since the last *accepted* edge, so a
//! bouncing contact or a held-down switch cannot re-trigger.

#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u32,
    last_accepted_ms: Option<u64>,
}

impl Debouncer {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_accepted_ms: None,
        }
    }

    /// Returns `true` if the edge at `now_ms` should be acted on.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        match self.last_accepted_ms {
            Some(last) if now_ms.saturating_sub(last) < self.window_ms as u64 => false,
            _ => {
                self.last_accepted_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }
}
