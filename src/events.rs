//! Button edge channel.
//!
//! Edges are produced by the input source (GPIO edge callback on hardware,
//! [`StdinInput`](crate::adapters::stdin_input::StdinInput) on the host) and
//! consumed by the input thread, which debounces them and calls into the
//! alert controller.
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ GPIO edge   │────▶│               │     │              │
//! │ stdin sim   │────▶│ INPUT_CHANNEL │────▶│ Input thread │
//! │ tests       │────▶│  (bounded)    │     │  (consumer)  │
//! └─────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! The channel is a static `embassy-sync` MPMC channel so producers need no
//! handle.  When it is full the edge is dropped: a user pressing faster than
//! the input thread drains is bouncing anyway.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Channel depth for button edges.
const INPUT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Confirm,
    Power,
}

/// One falling edge, timestamped in monotonic milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub button: Button,
    pub at_ms: u64,
}

/// Input edge channel: input sources → input thread.
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, InputEvent, INPUT_DEPTH> =
    Channel::new();

/// Push an edge.  Returns `false` if the channel is full (edge dropped).
pub fn push_input(event: InputEvent) -> bool {
    INPUT_CHANNEL.try_send(event).is_ok()
}

/// Pop the next edge without waiting.
pub fn try_next_input() -> Option<InputEvent> {
    INPUT_CHANNEL.try_receive().ok()
}

/// Block the calling thread until an edge arrives.
pub fn wait_input() -> InputEvent {
    futures_lite::future::block_on(INPUT_CHANNEL.receive())
}
