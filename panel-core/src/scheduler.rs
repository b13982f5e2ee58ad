//! Rate-limited encoder pulse scheduler.
//!
//! Decoder steps can arrive far faster than a USB host can observe distinct
//! button clicks. Each encoder owns one [`PulseChannel`] buffering pending
//! steps per direction and draining them as fixed-width, non-overlapping
//! press/release pairs: 40 ms pressed, 40 ms gap before the same direction
//! may fire again. A direction switch fires immediately once the previous
//! press has been released, and the previously served direction is continued
//! while it still has pending steps, so neither direction starves.
//!
//! Pending counters clamp at [`MAX_PENDING_STEPS`]; steps beyond the cap are
//! dropped rather than queued indefinitely — a lossy backpressure policy
//! bounding worst-case latency under fast spinning, not an error.

use heapless::Vec;

use crate::config::MAX_ENCODERS;
use crate::hal::ButtonSink;
use crate::logical::button_index;

/// How long each scheduled press is asserted, microseconds.
pub const PRESS_DURATION_US: u32 = 40_000;
/// Minimum gap after a press before the same direction fires again.
pub const PRESS_INTERVAL_US: u32 = 40_000;
/// Pending-step clamp per direction.
pub const MAX_PENDING_STEPS: u8 = 50;

/// Rotation direction of a buffered step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepDirection {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug)]
struct PulseChannel {
    cw_button: u8,
    ccw_button: u8,
    pending_cw: u8,
    pending_ccw: u8,
    /// Direction of the last press; kept across releases for the
    /// continuity/fairness decision.
    direction: Option<StepDirection>,
    /// Start of the last press; `None` until the first press ever.
    last_press_us: Option<u32>,
    asserted: bool,
}

impl PulseChannel {
    const fn new(cw_button: u8, ccw_button: u8) -> Self {
        Self {
            cw_button,
            ccw_button,
            pending_cw: 0,
            pending_ccw: 0,
            direction: None,
            last_press_us: None,
            asserted: false,
        }
    }

    fn button_for(&self, direction: StepDirection) -> u8 {
        match direction {
            StepDirection::Clockwise => self.cw_button,
            StepDirection::CounterClockwise => self.ccw_button,
        }
    }

    /// Button currently on the wire (meaningful while `asserted`).
    fn active_button(&self) -> u8 {
        self.button_for(self.direction.unwrap_or(StepDirection::Clockwise))
    }
}

/// Scheduler over all encoder pulse channels.
pub struct PulseScheduler {
    channels: Vec<PulseChannel, MAX_ENCODERS>,
}

impl PulseScheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Register a channel for one encoder; returns its handle, or `None`
    /// once the pool is exhausted (excess encoders are truncated).
    pub fn add_channel(&mut self, cw_button: u8, ccw_button: u8) -> Option<usize> {
        let handle = self.channels.len();
        self.channels
            .push(PulseChannel::new(cw_button, ccw_button))
            .ok()?;
        Some(handle)
    }

    /// Buffer decoder steps, clamped at [`MAX_PENDING_STEPS`].
    pub fn add_steps(&mut self, channel: usize, direction: StepDirection, steps: u8) {
        let Some(ch) = self.channels.get_mut(channel) else {
            return;
        };
        let pending = match direction {
            StepDirection::Clockwise => &mut ch.pending_cw,
            StepDirection::CounterClockwise => &mut ch.pending_ccw,
        };
        *pending = pending.saturating_add(steps).min(MAX_PENDING_STEPS);
    }

    /// Pending steps for one direction (diagnostics and tests).
    #[must_use]
    pub fn pending(&self, channel: usize, direction: StepDirection) -> u8 {
        self.channels.get(channel).map_or(0, |ch| match direction {
            StepDirection::Clockwise => ch.pending_cw,
            StepDirection::CounterClockwise => ch.pending_ccw,
        })
    }

    /// Run one scheduling step for every channel.
    pub fn service<S: ButtonSink>(&mut self, now_us: u32, sink: &mut S) {
        for ch in &mut self.channels {
            // Normal release once the press has been on the wire long enough.
            if ch.asserted {
                if let Some(start) = ch.last_press_us {
                    if now_us.wrapping_sub(start) >= PRESS_DURATION_US {
                        sink.set_button(button_index(ch.active_button()), false);
                        ch.asserted = false;
                    }
                }
            }

            // Fire the next pending step when idle and the cadence allows.
            if !ch.asserted && (ch.pending_cw > 0 || ch.pending_ccw > 0) {
                let next = match ch.direction {
                    Some(StepDirection::Clockwise) if ch.pending_cw > 0 => {
                        StepDirection::Clockwise
                    }
                    Some(StepDirection::CounterClockwise) if ch.pending_ccw > 0 => {
                        StepDirection::CounterClockwise
                    }
                    _ if ch.pending_cw > 0 => StepDirection::Clockwise,
                    _ => StepDirection::CounterClockwise,
                };
                let ready = match ch.last_press_us {
                    // First press ever.
                    None => true,
                    // A direction change may fire as soon as the line is free.
                    Some(_) if ch.direction != Some(next) => true,
                    // Repeating a direction waits out the full cadence cycle.
                    Some(start) => {
                        now_us.wrapping_sub(start) >= PRESS_DURATION_US + PRESS_INTERVAL_US
                    }
                };
                if ready {
                    sink.set_button(button_index(ch.button_for(next)), true);
                    ch.asserted = true;
                    ch.last_press_us = Some(now_us);
                    ch.direction = Some(next);
                    match next {
                        StepDirection::Clockwise => ch.pending_cw -= 1,
                        StepDirection::CounterClockwise => ch.pending_ccw -= 1,
                    }
                }
            }

            // Safety net: a press that survived two full durations lost its
            // release tick somewhere; force it off.
            if ch.asserted {
                if let Some(start) = ch.last_press_us {
                    if now_us.wrapping_sub(start) >= PRESS_DURATION_US * 2 {
                        sink.set_button(button_index(ch.active_button()), false);
                        ch.asserted = false;
                    }
                }
            }
        }
    }

    /// Number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for PulseScheduler {
    fn default() -> Self {
        Self::new()
    }
}
