//! Encoder pairing and per-tick decoding.
//!
//! An encoder is declared in the configuration as an `EncoderA` entry
//! immediately followed by its `EncoderB` partner. The pairing pass below
//! validates that adjacency once at load time; anything else — an `A` with no
//! immediate `B`, an orphan `B` — is a configuration error and produces no
//! encoder. Phases resolve to one of three sample sources: a direct pin (read
//! live), a matrix row pin (read from the scanner's raw snapshot), or a
//! shift-register bit (read from the shared byte buffer, inverted for the
//! active-low chain).

use heapless::Vec;

use crate::config::{Behavior, LogicalInput, PinMapEntry, PinRole, Source, MAX_ENCODERS};
use crate::hal::PinIo;
use crate::matrix::RowLevels;
use crate::quadrature::{EdgeDecoder, QuadratureDecoder};
use crate::scheduler::{PulseScheduler, StepDirection};

/// Full decoders are ticked several times per engine cycle, re-sampling the
/// phases each time, to catch transitions faster than the cycle rate.
const CATCH_UP_TICKS: u8 = 3;

/// Where an encoder phase is sampled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PhaseSource {
    /// Live digital read of a direct pin.
    Pin(u8),
    /// Matrix row pin, sampled from the raw row-level snapshot.
    MatrixRow(u8),
    /// Bit of the shift-register buffer.
    ShiftBit { register: u8, bit: u8 },
}

fn read_phase<P: PinIo>(
    source: PhaseSource,
    pins: &mut P,
    rows: &RowLevels,
    shift: &[u8],
) -> bool {
    match source {
        PhaseSource::Pin(pin) => pins.read(pin),
        PhaseSource::MatrixRow(pin) => rows.level(pin),
        PhaseSource::ShiftBit { register, bit } => {
            // Active-low chain: a closed switch reads 0 on the wire and
            // presents 1 to the decoder.
            match shift.get(register as usize) {
                Some(byte) => (byte >> bit) & 1 == 0,
                None => true,
            }
        }
    }
}

pub(crate) enum Decoder {
    Latched(QuadratureDecoder),
    Edge(EdgeDecoder),
}

pub(crate) struct Encoder {
    phase_a: PhaseSource,
    phase_b: PhaseSource,
    decoder: Decoder,
    /// Scheduler channel created in lock-step with this encoder.
    channel: usize,
    last_position: i32,
}

impl Encoder {
    /// Sample phases, advance the decoder and buffer any new steps.
    pub(crate) fn update<P: PinIo>(
        &mut self,
        pins: &mut P,
        rows: &RowLevels,
        shift: &[u8],
        scheduler: &mut PulseScheduler,
    ) {
        match &mut self.decoder {
            Decoder::Latched(decoder) => {
                for _ in 0..CATCH_UP_TICKS {
                    let a = read_phase(self.phase_a, pins, rows, shift);
                    let b = read_phase(self.phase_b, pins, rows, shift);
                    decoder.tick(a, b);
                }
                let position = decoder.position();
                let delta = position - self.last_position;
                if delta != 0 {
                    let direction = if delta > 0 {
                        StepDirection::Clockwise
                    } else {
                        StepDirection::CounterClockwise
                    };
                    let steps = delta.unsigned_abs().min(u8::MAX as u32) as u8;
                    scheduler.add_steps(self.channel, direction, steps);
                    self.last_position = position;
                }
            }
            Decoder::Edge(decoder) => {
                let a = read_phase(self.phase_a, pins, rows, shift);
                let b = read_phase(self.phase_b, pins, rows, shift);
                match decoder.tick(a, b) {
                    1 => scheduler.add_steps(self.channel, StepDirection::Clockwise, 1),
                    -1 => scheduler.add_steps(self.channel, StepDirection::CounterClockwise, 1),
                    _ => {}
                }
            }
        }
    }
}

/// Resolve a phase entry to its sample source. Matrix phases map to the
/// row's pin from the hardware pin map (rows are assigned in map order).
fn resolve_phase(input: &LogicalInput, pin_map: &[PinMapEntry]) -> Option<PhaseSource> {
    match input.source {
        Source::Pin { pin } => Some(PhaseSource::Pin(pin)),
        Source::Matrix { row, .. } => {
            let pin = pin_map
                .iter()
                .filter(|entry| entry.role == PinRole::Row)
                .nth(row as usize)?
                .pin;
            Some(PhaseSource::MatrixRow(pin))
        }
        Source::ShiftRegister { register, bit } => {
            (bit < 8).then_some(PhaseSource::ShiftBit { register, bit })
        }
    }
}

/// Load-time pairing pass over the configuration list.
///
/// Returns the encoder pool and the number of phase entries that did not
/// form a valid pair (skipped, never an error). Each encoder's scheduler
/// channel is registered here so the two pools stay index-aligned.
pub(crate) fn pair_encoders<P: PinIo>(
    inputs: &[LogicalInput],
    pin_map: &[PinMapEntry],
    scheduler: &mut PulseScheduler,
    pins: &mut P,
    rows: &RowLevels,
    shift: &[u8],
) -> (Vec<Encoder, MAX_ENCODERS>, usize) {
    let mut encoders: Vec<Encoder, MAX_ENCODERS> = Vec::new();
    let mut skipped = 0usize;

    let mut i = 0;
    while i < inputs.len() {
        let entry = &inputs[i];
        match entry.behavior {
            Behavior::EncoderA => {
                let partner = inputs.get(i + 1);
                let paired = partner.filter(|p| p.behavior == Behavior::EncoderB);
                if let Some(partner) = paired {
                    if let Some(encoder) =
                        build_encoder(entry, partner, pin_map, scheduler, pins, rows, shift)
                    {
                        if encoders.push(encoder).is_err() {
                            // Pool exhausted; excess encoders are truncated.
                            skipped += 2;
                        }
                    } else {
                        skipped += 2;
                    }
                    i += 2;
                    continue;
                }
                // EncoderA with no immediately-following EncoderB.
                skipped += 1;
            }
            // An EncoderB only counts as part of a pair when consumed above.
            Behavior::EncoderB => skipped += 1,
            Behavior::Normal | Behavior::Momentary => {}
        }
        i += 1;
    }

    (encoders, skipped)
}

fn build_encoder<P: PinIo>(
    phase_a: &LogicalInput,
    phase_b: &LogicalInput,
    pin_map: &[PinMapEntry],
    scheduler: &mut PulseScheduler,
    pins: &mut P,
    rows: &RowLevels,
    shift: &[u8],
) -> Option<Encoder> {
    let source_a = resolve_phase(phase_a, pin_map)?;
    let source_b = resolve_phase(phase_b, pin_map)?;

    // Direct-pin phases idle on the internal pull-up like any switch.
    for source in [source_a, source_b] {
        if let PhaseSource::Pin(pin) = source {
            pins.set_input_pullup(pin);
        }
    }

    let channel = scheduler.add_channel(phase_a.button, phase_b.button)?;

    let a = read_phase(source_a, pins, rows, shift);
    let b = read_phase(source_b, pins, rows, shift);
    let both_shift = matches!(source_a, PhaseSource::ShiftBit { .. })
        && matches!(source_b, PhaseSource::ShiftBit { .. });
    let decoder = if both_shift {
        // Shift-sourced phases are sampled once per buffer refresh — too
        // coarse for the full state machine; use the edge filter.
        Decoder::Edge(EdgeDecoder::new(a, b))
    } else {
        Decoder::Latched(QuadratureDecoder::new(phase_a.latch, a, b))
    };

    Some(Encoder {
        phase_a: source_a,
        phase_b: source_b,
        decoder,
        channel,
        last_position: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatchMode;
    use crate::sim::SimBus;

    const PIN_MAP: &[PinMapEntry] = &[
        PinMapEntry::new(2, PinRole::Row),
        PinMapEntry::new(3, PinRole::Row),
        PinMapEntry::new(6, PinRole::Column),
    ];

    fn pair(inputs: &[LogicalInput]) -> (Vec<Encoder, MAX_ENCODERS>, usize, PulseScheduler) {
        let mut bus = SimBus::new();
        let mut scheduler = PulseScheduler::new();
        let rows = RowLevels::all_high();
        let shift = [0xFFu8; 1];
        let (encoders, skipped) =
            pair_encoders(inputs, PIN_MAP, &mut scheduler, &mut bus, &rows, &shift);
        (encoders, skipped, scheduler)
    }

    #[test]
    fn test_adjacent_pair_builds_one_encoder() {
        let inputs = [
            LogicalInput::pin(4, 10, Behavior::EncoderA),
            LogicalInput::pin(5, 11, Behavior::EncoderB),
        ];
        let (encoders, skipped, scheduler) = pair(&inputs);
        assert_eq!(encoders.len(), 1);
        assert_eq!(skipped, 0);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_non_adjacent_phases_are_skipped() {
        let inputs = [
            LogicalInput::pin(4, 10, Behavior::EncoderA),
            LogicalInput::pin(8, 1, Behavior::Normal),
            LogicalInput::pin(5, 11, Behavior::EncoderB),
        ];
        let (encoders, skipped, _) = pair(&inputs);
        assert_eq!(encoders.len(), 0);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_orphan_phase_b_is_skipped() {
        let inputs = [
            LogicalInput::pin(5, 11, Behavior::EncoderB),
            LogicalInput::pin(8, 1, Behavior::Normal),
        ];
        let (encoders, skipped, _) = pair(&inputs);
        assert_eq!(encoders.len(), 0);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_matrix_phase_resolves_to_row_pin() {
        let inputs = [
            LogicalInput::matrix(0, 0, 10, Behavior::EncoderA),
            LogicalInput::matrix(1, 0, 11, Behavior::EncoderB),
        ];
        let (encoders, skipped, _) = pair(&inputs);
        assert_eq!(skipped, 0);
        assert_eq!(encoders[0].phase_a, PhaseSource::MatrixRow(2));
        assert_eq!(encoders[0].phase_b, PhaseSource::MatrixRow(3));
    }

    #[test]
    fn test_matrix_phase_without_row_pin_is_skipped() {
        let inputs = [
            LogicalInput::matrix(5, 0, 10, Behavior::EncoderA),
            LogicalInput::matrix(1, 0, 11, Behavior::EncoderB),
        ];
        let (encoders, skipped, _) = pair(&inputs);
        assert_eq!(encoders.len(), 0);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_shift_pair_uses_edge_decoder() {
        let inputs = [
            LogicalInput::shift_register(0, 1, 10, Behavior::EncoderA),
            LogicalInput::shift_register(0, 2, 11, Behavior::EncoderB),
        ];
        let (encoders, _, _) = pair(&inputs);
        assert!(matches!(encoders[0].decoder, Decoder::Edge(_)));

        let inputs = [
            LogicalInput::pin(4, 10, Behavior::EncoderA).with_latch(LatchMode::Two03),
            LogicalInput::shift_register(0, 2, 11, Behavior::EncoderB),
        ];
        let (encoders, _, _) = pair(&inputs);
        assert!(matches!(encoders[0].decoder, Decoder::Latched(_)));
    }

    #[test]
    fn test_direct_pin_rotation_reaches_scheduler() {
        let inputs = [
            LogicalInput::pin(4, 10, Behavior::EncoderA),
            LogicalInput::pin(5, 11, Behavior::EncoderB),
        ];
        let mut bus = SimBus::new();
        let mut scheduler = PulseScheduler::new();
        let rows = RowLevels::all_high();
        let shift = [0xFFu8; 0];
        // Pins idle high (detent at code 3).
        let (mut encoders, _) =
            pair_encoders(&inputs, PIN_MAP, &mut scheduler, &mut bus, &rows, &shift);
        let enc = &mut encoders[0];

        // One clockwise detent: 3 -> 2 -> 0 -> 1 -> 3 on (a, b).
        for (a, b) in [(false, true), (false, false), (true, false), (true, true)] {
            bus.set_level(4, a);
            bus.set_level(5, b);
            enc.update(&mut bus, &rows, &shift, &mut scheduler);
        }
        assert_eq!(scheduler.pending(0, StepDirection::Clockwise), 1);
        assert_eq!(scheduler.pending(0, StepDirection::CounterClockwise), 0);
    }
}
