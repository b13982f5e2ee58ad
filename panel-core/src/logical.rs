//! Runtime logical buttons and the behavior translator.
//!
//! Every non-encoder [`LogicalInput`](crate::config::LogicalInput) gets one
//! [`RuntimeButton`]: the per-entry state machine translating a physical
//! pressed level into HID sink writes. Several logical buttons may share one
//! physical position; each runs independently.

use crate::config::{Behavior, LogicalInput};
use crate::hal::ButtonSink;

/// Fixed momentary pulse width in milliseconds.
pub const MOMENTARY_PULSE_MS: u32 = 50;

/// Map a 1-based configured button id to a zero-based sink index.
///
/// Id 0 (unassigned) also lands on index 0 — a long-standing quirk of the
/// configuration format, not an error.
#[inline]
#[must_use]
pub(crate) fn button_index(id: u8) -> u8 {
    id.saturating_sub(1)
}

/// Per-entry runtime state for `Normal` and `Momentary` behaviors.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeButton {
    button: u8,
    behavior: Behavior,
    reverse: bool,
    last_state: bool,
    pulse_start_ms: u32,
    pulse_active: bool,
}

impl RuntimeButton {
    #[must_use]
    pub fn new(input: &LogicalInput) -> Self {
        Self {
            button: input.button,
            behavior: input.behavior,
            reverse: input.reverse,
            last_state: false,
            pulse_start_ms: 0,
            pulse_active: false,
        }
    }

    /// Seed the edge detector from the boot-time physical state, so a switch
    /// already held at power-on does not fire a momentary pulse.
    pub fn seed(&mut self, physical_pressed: bool) {
        self.last_state = physical_pressed ^ self.reverse;
        self.pulse_active = false;
    }

    /// Run one translation step against the current physical level.
    pub fn process<S: ButtonSink>(&mut self, now_ms: u32, physical_pressed: bool, sink: &mut S) {
        let effective = physical_pressed ^ self.reverse;
        let index = button_index(self.button);
        match self.behavior {
            Behavior::Normal => sink.set_button(index, effective),
            Behavior::Momentary => {
                if !self.last_state && effective && !self.pulse_active {
                    sink.set_button(index, true);
                    self.pulse_start_ms = now_ms;
                    self.pulse_active = true;
                }
                if self.pulse_active
                    && now_ms.wrapping_sub(self.pulse_start_ms) >= MOMENTARY_PULSE_MS
                {
                    sink.set_button(index, false);
                    self.pulse_active = false;
                }
            }
            // Encoder phases only exist to be paired; they never drive output.
            Behavior::EncoderA | Behavior::EncoderB => {}
        }
        self.last_state = effective;
    }
}
