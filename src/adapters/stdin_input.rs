//! Keyboard stand-in for the two push buttons.
//!
//! Reads lines from stdin on its own thread and pushes an [`InputEvent`]
//! per recognised line.  Debouncing still happens downstream, so typing
//! `c` twice in quick succession behaves like a bouncing contact.
//!
//! | Line              | Button            |
//! |-------------------|-------------------|
//! | `c`, `confirm`    | [`Button::Confirm`] |
//! | `p`, `power`      | [`Button::Power`]   |

use std::io::BufRead;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::app::ports::Clock;
use crate::events::{Button, InputEvent, push_input};

pub fn parse_line(line: &str) -> Option<Button> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "confirm" => Some(Button::Confirm),
        "p" | "power" => Some(Button::Power),
        _ => None,
    }
}

pub struct StdinInput;

impl StdinInput {
    /// Spawn the reader thread.  It exits when stdin closes.
    pub fn spawn<C: Clock + 'static>(clock: C) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("stdin-input".into())
            .spawn(move || {
                info!("INPUT: stdin ready (c = confirm, p = power)");
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let Some(button) = parse_line(&line) else {
                        if !line.trim().is_empty() {
                            warn!("INPUT: unknown command '{}'", line.trim());
                        }
                        continue;
                    };
                    let at_ms = clock.monotonic().as_millis() as u64;
                    if !push_input(InputEvent { button, at_ms }) {
                        warn!("INPUT: channel full, {:?} dropped", button);
                    }
                }
                info!("INPUT: stdin closed");
            })
    }
}
