//! The input orchestrator: owns every component and the per-tick ordering.
//!
//! Construction order matters because later stages read state the earlier
//! ones populate: the matrix must exist (and have run a seeding scan) before
//! matrix-hosted encoder phases can be resolved and seeded, and the
//! shift-register buffer must be primed before shift-hosted phases are
//! seeded. The same holds within every tick — see [`PanelEngine::tick`].

use heapless::Vec;

use crate::config::{
    PanelConfig, PinRole, Source, MAX_BUTTON_PIN_GROUPS, MAX_LOGICAL_PER_MATRIX_POS,
    MAX_LOGICAL_PER_PIN, MAX_LOGICAL_PER_SHIFT_BIT, MAX_MATRIX_CELLS, MAX_MATRIX_COLS,
    MAX_MATRIX_ROWS, MAX_SHIFTREG_GROUPS, MAX_SHIFT_REGISTERS,
};
use crate::debounce::{Debounce, DEBOUNCE_MS};
use crate::encoder::{pair_encoders, Encoder};
use crate::hal::{ButtonSink, Clock, PinIo};
use crate::logical::RuntimeButton;
use crate::matrix::{MatrixScanner, RowLevels};
use crate::scheduler::PulseScheduler;
use crate::shiftreg::{ShiftRegisterChain, ShiftRegisterManager};

/// What a (re)initialization actually built, for one-shot boot logging.
/// Skipped entries are configuration malformedness absorbed per policy —
/// unpaired encoder phases, out-of-range positions, pool overflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitSummary {
    pub direct_buttons: u8,
    pub matrix_buttons: u8,
    pub shift_buttons: u8,
    pub matrix_rows: u8,
    pub matrix_cols: u8,
    pub encoders: u8,
    pub shift_registers: u8,
    pub skipped: u8,
}

/// All logical buttons sharing one direct pin.
struct PinGroup {
    pin: u8,
    debounce: Debounce,
    buttons: Vec<RuntimeButton, MAX_LOGICAL_PER_PIN>,
}

/// All logical buttons sharing one matrix cell.
struct CellBinding {
    row: u8,
    col: u8,
    buttons: Vec<RuntimeButton, MAX_LOGICAL_PER_MATRIX_POS>,
}

/// All logical buttons sharing one shift-register bit.
struct ShiftBitGroup {
    register: u8,
    bit: u8,
    buttons: Vec<RuntimeButton, MAX_LOGICAL_PER_SHIFT_BIT>,
}

/// The digital input engine.
///
/// Built once from the static configuration; reconfiguration is a full
/// re-initialize. [`tick`](Self::tick) is the single per-cycle entry point.
pub struct PanelEngine {
    pin_groups: Vec<PinGroup, MAX_BUTTON_PIN_GROUPS>,
    matrix: Option<MatrixScanner>,
    cell_bindings: Vec<CellBinding, MAX_MATRIX_CELLS>,
    shift_groups: Vec<ShiftBitGroup, MAX_SHIFTREG_GROUPS>,
    shift: Option<ShiftRegisterManager>,
    shift_buffer: [u8; MAX_SHIFT_REGISTERS],
    row_levels: RowLevels,
    encoders: Vec<Encoder, { crate::config::MAX_ENCODERS }>,
    scheduler: PulseScheduler,
    summary: InitSummary,
}

impl PanelEngine {
    /// Build the engine: configure pins, seed every state machine from the
    /// current hardware state, and pair the encoders.
    pub fn new<P: PinIo, C: Clock>(config: &PanelConfig, pins: &mut P, clock: &C) -> Self {
        let now_ms = clock.now_ms();
        let mut summary = InitSummary::default();
        let mut skipped = 0usize;

        let matrix = build_matrix(config, pins, now_ms);
        let cell_bindings = build_cell_bindings(config, matrix.as_ref(), &mut skipped);
        let pin_groups = build_pin_groups(config, pins, now_ms, &mut skipped);

        // All open (active low) until the first chain read.
        let mut shift_buffer = [0xFFu8; MAX_SHIFT_REGISTERS];
        let shift = build_shift(config, pins, &mut shift_buffer, now_ms);
        let shift_groups = build_shift_groups(config, &mut skipped);

        let mut row_levels = RowLevels::all_high();
        if let Some(matrix) = &matrix {
            matrix.publish_row_levels(&mut row_levels);
        }

        let mut scheduler = PulseScheduler::new();
        let (encoders, pair_skipped) = pair_encoders(
            config.inputs,
            config.pin_map,
            &mut scheduler,
            pins,
            &row_levels,
            &shift_buffer,
        );
        skipped += pair_skipped;

        summary.direct_buttons = pin_groups.iter().map(|g| g.buttons.len() as u8).sum();
        summary.matrix_buttons = cell_bindings.iter().map(|b| b.buttons.len() as u8).sum();
        summary.shift_buttons = shift_groups.iter().map(|g| g.buttons.len() as u8).sum();
        summary.matrix_rows = matrix.as_ref().map_or(0, |m| m.rows() as u8);
        summary.matrix_cols = matrix.as_ref().map_or(0, |m| m.cols() as u8);
        summary.encoders = encoders.len() as u8;
        summary.shift_registers = shift.as_ref().map_or(0, |s| s.chain().len() as u8);
        summary.skipped = skipped.min(u8::MAX as usize) as u8;

        Self {
            pin_groups,
            matrix,
            cell_bindings,
            shift_groups,
            shift,
            shift_buffer,
            row_levels,
            encoders,
            scheduler,
            summary,
        }
    }

    /// Run one orchestrator cycle.
    ///
    /// Fixed sequence, never reordered: refresh the shift-register buffer,
    /// update the debounced buttons (direct pins, matrix, shift-register
    /// bits), publish the raw matrix row snapshot, then decode the encoders
    /// and service their pulse channels. Consumers always read buffers
    /// written earlier in the same cycle.
    pub fn tick<P: PinIo, C: Clock, S: ButtonSink>(
        &mut self,
        pins: &mut P,
        clock: &C,
        sink: &mut S,
    ) {
        let now_ms = clock.now_ms();

        if let Some(shift) = &mut self.shift {
            shift.update(pins, &mut self.shift_buffer, now_ms);
        }

        for group in &mut self.pin_groups {
            let raw_pressed = !pins.read(group.pin);
            let pressed = group.debounce.update(raw_pressed, now_ms);
            for button in &mut group.buttons {
                button.process(now_ms, pressed, sink);
            }
        }

        if let Some(matrix) = &mut self.matrix {
            matrix.scan(pins, now_ms);
            for binding in &mut self.cell_bindings {
                let pressed = matrix.pressed(binding.row, binding.col);
                for button in &mut binding.buttons {
                    button.process(now_ms, pressed, sink);
                }
            }
        }

        for group in &mut self.shift_groups {
            // 74HC165 is active low; no debounce on this source.
            let pressed = self
                .shift_buffer
                .get(group.register as usize)
                .is_some_and(|byte| byte & (1 << group.bit) == 0);
            for button in &mut group.buttons {
                button.process(now_ms, pressed, sink);
            }
        }

        if let Some(matrix) = &self.matrix {
            matrix.publish_row_levels(&mut self.row_levels);
        }

        for encoder in &mut self.encoders {
            encoder.update(pins, &self.row_levels, &self.shift_buffer, &mut self.scheduler);
        }
        self.scheduler.service(clock.now_us(), sink);
    }

    /// What initialization built; log it once at boot.
    #[must_use]
    pub fn summary(&self) -> &InitSummary {
        &self.summary
    }
}

/// Pins claimed by a direct-pin encoder phase never join the matrix.
fn is_direct_phase_pin(config: &PanelConfig, pin: u8) -> bool {
    config.inputs.iter().any(|input| {
        input.is_encoder_phase() && matches!(input.source, Source::Pin { pin: p } if p == pin)
    })
}

fn build_matrix<P: PinIo>(
    config: &PanelConfig,
    pins: &mut P,
    now_ms: u32,
) -> Option<MatrixScanner> {
    let mut max_row = None;
    let mut max_col = None;
    for input in config.inputs {
        if let Source::Matrix { row, col } = input.source {
            max_row = Some(max_row.map_or(row, |r: u8| r.max(row)));
            max_col = Some(max_col.map_or(col, |c: u8| c.max(col)));
        }
    }
    let rows = (max_row? as usize + 1).min(MAX_MATRIX_ROWS);
    let cols = (max_col? as usize + 1).min(MAX_MATRIX_COLS);

    let mut row_pins: Vec<u8, MAX_MATRIX_ROWS> = Vec::new();
    let mut col_pins: Vec<u8, MAX_MATRIX_COLS> = Vec::new();
    for entry in config.pin_map {
        if is_direct_phase_pin(config, entry.pin) {
            continue;
        }
        match entry.role {
            PinRole::Row if row_pins.len() < rows => {
                let _ = row_pins.push(entry.pin);
            }
            PinRole::Column if col_pins.len() < cols => {
                let _ = col_pins.push(entry.pin);
            }
            _ => {}
        }
    }
    if row_pins.is_empty() || col_pins.is_empty() {
        return None;
    }

    let mut matrix = MatrixScanner::new(row_pins, col_pins, now_ms);
    matrix.configure_pins(pins);
    // Seeding scan: capture the boot-time raw state before any consumer runs.
    matrix.scan(pins, now_ms);
    Some(matrix)
}

fn build_cell_bindings(
    config: &PanelConfig,
    matrix: Option<&MatrixScanner>,
    skipped: &mut usize,
) -> Vec<CellBinding, MAX_MATRIX_CELLS> {
    let mut bindings: Vec<CellBinding, MAX_MATRIX_CELLS> = Vec::new();
    let Some(matrix) = matrix else {
        return bindings;
    };

    for input in config.inputs {
        let Source::Matrix { row, col } = input.source else {
            continue;
        };
        // Phase entries are handled by the pairing pass, not the translator.
        if input.is_encoder_phase() {
            continue;
        }
        if (row as usize) >= matrix.rows() || (col as usize) >= matrix.cols() {
            *skipped += 1;
            continue;
        }

        let index = match bindings.iter().position(|b| b.row == row && b.col == col) {
            Some(index) => index,
            None => {
                if bindings
                    .push(CellBinding {
                        row,
                        col,
                        buttons: Vec::new(),
                    })
                    .is_err()
                {
                    *skipped += 1;
                    continue;
                }
                bindings.len() - 1
            }
        };
        let binding = &mut bindings[index];
        let mut button = RuntimeButton::new(input);
        button.seed(matrix.raw_pressed(row, col));
        if binding.buttons.push(button).is_err() {
            *skipped += 1;
        }
    }
    bindings
}

fn build_pin_groups<P: PinIo>(
    config: &PanelConfig,
    pins: &mut P,
    now_ms: u32,
    skipped: &mut usize,
) -> Vec<PinGroup, MAX_BUTTON_PIN_GROUPS> {
    let mut groups: Vec<PinGroup, MAX_BUTTON_PIN_GROUPS> = Vec::new();

    for input in config.inputs {
        let Source::Pin { pin } = input.source else {
            continue;
        };
        if input.is_encoder_phase() {
            continue;
        }

        let index = match groups.iter().position(|g| g.pin == pin) {
            Some(index) => index,
            None => {
                pins.set_input_pullup(pin);
                let pressed = !pins.read(pin);
                if groups
                    .push(PinGroup {
                        pin,
                        debounce: Debounce::new(pressed, DEBOUNCE_MS, now_ms),
                        buttons: Vec::new(),
                    })
                    .is_err()
                {
                    *skipped += 1;
                    continue;
                }
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        let pressed = group.debounce.state();
        let mut button = RuntimeButton::new(input);
        button.seed(pressed);
        if group.buttons.push(button).is_err() {
            *skipped += 1;
        }
    }
    groups
}

fn build_shift<P: PinIo>(
    config: &PanelConfig,
    pins: &mut P,
    buffer: &mut [u8],
    now_ms: u32,
) -> Option<ShiftRegisterManager> {
    let uses_chain = config
        .inputs
        .iter()
        .any(|input| matches!(input.source, Source::ShiftRegister { .. }));
    if !uses_chain || config.shift_registers == 0 {
        return None;
    }

    let mut load = None;
    let mut clock = None;
    let mut data = None;
    for entry in config.pin_map {
        match entry.role {
            PinRole::ShiftLoad => load = Some(entry.pin),
            PinRole::ShiftClock => clock = Some(entry.pin),
            PinRole::ShiftData => data = Some(entry.pin),
            _ => {}
        }
    }

    let count = (config.shift_registers as usize).min(MAX_SHIFT_REGISTERS) as u8;
    let chain = ShiftRegisterChain::new(load?, clock?, data?, count);
    let mut manager = ShiftRegisterManager::new(chain);
    manager.begin(pins, buffer, now_ms);
    Some(manager)
}

fn build_shift_groups(
    config: &PanelConfig,
    skipped: &mut usize,
) -> Vec<ShiftBitGroup, MAX_SHIFTREG_GROUPS> {
    let mut groups: Vec<ShiftBitGroup, MAX_SHIFTREG_GROUPS> = Vec::new();

    for input in config.inputs {
        let Source::ShiftRegister { register, bit } = input.source else {
            continue;
        };
        if input.is_encoder_phase() {
            continue;
        }
        if register as usize >= MAX_SHIFT_REGISTERS || bit >= 8 {
            *skipped += 1;
            continue;
        }

        let index = match groups
            .iter()
            .position(|g| g.register == register && g.bit == bit)
        {
            Some(index) => index,
            None => {
                if groups
                    .push(ShiftBitGroup {
                        register,
                        bit,
                        buttons: Vec::new(),
                    })
                    .is_err()
                {
                    *skipped += 1;
                    continue;
                }
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        // Shift-register buttons seed released; the first primed read
        // supplies the real state within a tick.
        if group.buttons.push(RuntimeButton::new(input)).is_err() {
            *skipped += 1;
        }
    }
    groups
}
