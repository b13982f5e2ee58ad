//! Quadrature decoding for rotary encoders.
//!
//! Two decoder variants share the combined-phase-code idea:
//!
//! - [`QuadratureDecoder`]: table-driven full decoder accumulating signed
//!   quarter-steps and externalizing whole detents at the configured latch
//!   code(s). Trusting only a specific phase combination makes it tolerant of
//!   noisy wiring — jitter between detents cancels before it is ever visible.
//! - [`EdgeDecoder`]: a deliberately narrower variant recognizing only the
//!   two detent-exit transitions. Used for shift-register-sourced phases,
//!   which are sampled too coarsely for the full state machine to be
//!   trustworthy.
//!
//! Decoders must be ticked often enough not to miss two consecutive raw
//! transitions; the engine tick-multiplies them per cycle to compensate.

use crate::config::LatchMode;

/// Direction contribution per raw transition, indexed by
/// `new_code | (old_code << 2)` with code = `phase_a | (phase_b << 1)`.
///
/// Signs are oriented so the canonical clockwise detent sequence
/// 0 → 1 → 3 → 2 → 0 accumulates positive quarter-steps; entries for
/// impossible double transitions are zero.
const DIR_TABLE: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0,
];

#[inline]
fn phase_code(phase_a: bool, phase_b: bool) -> u8 {
    phase_a as u8 | (phase_b as u8) << 1
}

/// Table-driven quadrature decoder with detent latching.
#[derive(Clone, Copy, Debug)]
pub struct QuadratureDecoder {
    latch: LatchMode,
    old_code: u8,
    /// Quarter-step accumulator, re-anchored at every latch.
    position: i32,
    /// Externally visible detent position.
    external: i32,
}

impl QuadratureDecoder {
    /// Create a decoder seeded with the current phase levels.
    #[must_use]
    pub fn new(latch: LatchMode, phase_a: bool, phase_b: bool) -> Self {
        Self {
            latch,
            old_code: phase_code(phase_a, phase_b),
            position: 0,
            external: 0,
        }
    }

    /// Feed one sample of both phases.
    pub fn tick(&mut self, phase_a: bool, phase_b: bool) {
        let code = phase_code(phase_a, phase_b);
        if code == self.old_code {
            return;
        }
        self.position += DIR_TABLE[(code | self.old_code << 2) as usize] as i32;
        self.old_code = code;

        match self.latch {
            LatchMode::Four3 => {
                if code == 3 {
                    self.latch_external(4);
                }
            }
            LatchMode::Four0 => {
                if code == 0 {
                    self.latch_external(4);
                }
            }
            LatchMode::Two03 => {
                if code == 0 || code == 3 {
                    self.latch_external(2);
                }
            }
        }
    }

    /// Latched detent position. Monotonic per rotation direction; only moves
    /// when the latch code is reached.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.external
    }

    /// Externalize the accumulated quarter-steps, rounded to the nearest
    /// whole detent, then re-anchor the accumulator so sub-detent jitter
    /// around the latch code cancels instead of drifting.
    fn latch_external(&mut self, scale: i32) {
        let delta = self.position - self.external * scale;
        let half = scale / 2;
        let bias = if delta >= 0 { half } else { -half };
        self.external += (delta + bias) / scale;
        self.position = self.external * scale;
    }
}

/// Minimal two-transition decoder for coarsely sampled phase pairs.
///
/// Only the detent-exit transitions are recognized, with the code read as
/// `(phase_a << 1) | phase_b`: `0b11 → 0b01` counts one step clockwise,
/// `0b11 → 0b10` one step counter-clockwise. Everything else — including the
/// return path into the detent — is ignored.
#[derive(Clone, Copy, Debug)]
pub struct EdgeDecoder {
    last_code: u8,
}

impl EdgeDecoder {
    #[must_use]
    pub fn new(phase_a: bool, phase_b: bool) -> Self {
        Self {
            last_code: (phase_a as u8) << 1 | phase_b as u8,
        }
    }

    /// Feed one sample; returns +1 (clockwise), −1 (counter-clockwise) or 0.
    pub fn tick(&mut self, phase_a: bool, phase_b: bool) -> i8 {
        let code = (phase_a as u8) << 1 | phase_b as u8;
        let step = match (self.last_code, code) {
            (0b11, 0b01) => 1,
            (0b11, 0b10) => -1,
            _ => 0,
        };
        self.last_code = code;
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a sequence of phase codes (in `a | b<<1` form).
    fn feed(decoder: &mut QuadratureDecoder, codes: &[u8]) {
        for &code in codes {
            decoder.tick(code & 1 == 1, code & 2 == 2);
        }
    }

    #[test]
    fn test_one_clockwise_detent_four3() {
        let mut d = QuadratureDecoder::new(LatchMode::Four3, false, false);
        feed(&mut d, &[1, 3, 2, 0]);
        assert_eq!(d.position(), 1);
    }

    #[test]
    fn test_one_counterclockwise_detent_four3() {
        let mut d = QuadratureDecoder::new(LatchMode::Four3, false, false);
        feed(&mut d, &[2, 3, 1, 0]);
        assert_eq!(d.position(), -1);
    }

    #[test]
    fn test_stall_before_latch_is_invisible() {
        let mut d = QuadratureDecoder::new(LatchMode::Four3, false, false);
        feed(&mut d, &[1, 1, 1, 0]);
        assert_eq!(d.position(), 0);
    }

    #[test]
    fn test_continuous_rotation_counts_every_detent() {
        let mut d = QuadratureDecoder::new(LatchMode::Four3, true, true);
        for _ in 0..5 {
            feed(&mut d, &[2, 0, 1, 3]);
        }
        assert_eq!(d.position(), 5);
        for _ in 0..3 {
            feed(&mut d, &[1, 0, 2, 3]);
        }
        assert_eq!(d.position(), 2);
    }

    #[test]
    fn test_jitter_at_detent_is_stable() {
        let mut d = QuadratureDecoder::new(LatchMode::Four3, true, true);
        feed(&mut d, &[2, 0, 1, 3]);
        assert_eq!(d.position(), 1);
        // Rock in and out of the detent without crossing it.
        for _ in 0..10 {
            feed(&mut d, &[2, 3]);
            feed(&mut d, &[1, 3]);
        }
        assert_eq!(d.position(), 1);
    }

    #[test]
    fn test_four0_latches_at_zero() {
        let mut d = QuadratureDecoder::new(LatchMode::Four0, false, false);
        // Full detent cycle ending back at code 0, where FOUR0 latches.
        feed(&mut d, &[1, 3, 2, 0]);
        assert_eq!(d.position(), 1);
        feed(&mut d, &[2, 3, 1, 0]);
        assert_eq!(d.position(), 0);
    }

    #[test]
    fn test_two03_yields_two_steps_per_cycle() {
        let mut d = QuadratureDecoder::new(LatchMode::Two03, false, false);
        feed(&mut d, &[1, 3]);
        assert_eq!(d.position(), 1);
        feed(&mut d, &[2, 0]);
        assert_eq!(d.position(), 2);
    }

    #[test]
    fn test_edge_decoder_recognizes_detent_exits_only() {
        // Codes here are (a << 1) | b.
        let mut d = EdgeDecoder::new(true, true);
        assert_eq!(d.tick(false, true), 1); // 11 -> 01: clockwise
        assert_eq!(d.tick(false, false), 0);
        assert_eq!(d.tick(true, true), 0); // re-entering the detent: ignored

        assert_eq!(d.tick(true, false), -1); // 11 -> 10: counter-clockwise
        assert_eq!(d.tick(true, true), 0);

        // Transitions not starting at the detent are ignored.
        let mut d = EdgeDecoder::new(false, false);
        assert_eq!(d.tick(false, true), 0);
        assert_eq!(d.tick(true, true), 0);
    }
}
