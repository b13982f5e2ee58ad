//! Host-side simulation of the panel hardware, for unit tests only.
//!
//! [`SimBus`] models the electrical behavior the engine drives through
//! [`PinIo`]: plain pull-up inputs, a row/column switch matrix that responds
//! to column scanning, and a behavioral 74HC165 chain that latches and shifts
//! like the real part. [`SimClock`] is advanced manually; [`RecordingSink`]
//! records observable button transitions with timestamps.

extern crate std;

use core::cell::Cell;
use std::vec::Vec;

use crate::config::MAX_PINS;
use crate::hal::{ButtonSink, Clock, PinIo};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PinMode {
    InputPullup,
    Output,
}

struct SimMatrix {
    row_pins: Vec<u8>,
    col_pins: Vec<u8>,
    closed: [[bool; 8]; 8],
}

struct SimShiftChain {
    load_pin: u8,
    clock_pin: u8,
    data_pin: u8,
    inputs: Vec<u8>,
    latched: Vec<u8>,
    bit_index: usize,
}

/// Scriptable pin bus implementing [`PinIo`].
pub struct SimBus {
    modes: [PinMode; MAX_PINS],
    out_levels: [bool; MAX_PINS],
    in_levels: [bool; MAX_PINS],
    matrix: Option<SimMatrix>,
    shift: Option<SimShiftChain>,
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            modes: [PinMode::InputPullup; MAX_PINS],
            out_levels: [true; MAX_PINS],
            in_levels: [true; MAX_PINS],
            matrix: None,
            shift: None,
        }
    }

    /// A bus with a switch matrix wired between the given row and column
    /// pins. All switches start open.
    pub fn with_matrix(row_pins: &[u8], col_pins: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.matrix = Some(SimMatrix {
            row_pins: row_pins.to_vec(),
            col_pins: col_pins.to_vec(),
            closed: [[false; 8]; 8],
        });
        bus
    }

    /// A bus with a 74HC165 chain on the given pins. `inputs` is one byte
    /// per register; bit = 1 means the switch is open (pull-up idle).
    pub fn with_shift_chain(load_pin: u8, clock_pin: u8, data_pin: u8, inputs: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.shift = Some(SimShiftChain {
            load_pin,
            clock_pin,
            data_pin,
            inputs: inputs.to_vec(),
            latched: inputs.to_vec(),
            bit_index: 0,
        });
        bus
    }

    /// Close or open a matrix switch.
    pub fn close_switch(&mut self, row: usize, col: usize, closed: bool) {
        let matrix = self.matrix.as_mut().expect("no matrix wired");
        matrix.closed[row][col] = closed;
    }

    /// Drive the level seen on a plain input pin (`false` = pressed for
    /// active-low switches).
    pub fn set_level(&mut self, pin: u8, high: bool) {
        self.in_levels[pin as usize] = high;
    }

    /// Replace the parallel inputs of the shift chain; takes effect at the
    /// next load pulse.
    pub fn set_shift_inputs(&mut self, inputs: &[u8]) {
        let shift = self.shift.as_mut().expect("no shift chain wired");
        shift.inputs = inputs.to_vec();
    }

    pub fn matrix_row_pins(&self) -> &[u8] {
        &self.matrix.as_ref().expect("no matrix wired").row_pins
    }

    pub fn matrix_col_pins(&self) -> &[u8] {
        &self.matrix.as_ref().expect("no matrix wired").col_pins
    }

    pub fn is_input_pullup(&self, pin: u8) -> bool {
        self.modes
            .get(pin as usize)
            .is_some_and(|&m| m == PinMode::InputPullup)
    }

    /// Electrical level of a matrix row pin given the currently driven
    /// columns: low iff a closed switch connects it to a column being driven
    /// low right now.
    fn matrix_row_level(&self, row_index: usize) -> bool {
        let matrix = self.matrix.as_ref().unwrap();
        for (ci, &col_pin) in matrix.col_pins.iter().enumerate() {
            let driven_low = self.modes[col_pin as usize] == PinMode::Output
                && !self.out_levels[col_pin as usize];
            if driven_low && matrix.closed[row_index][ci] {
                return false;
            }
        }
        true
    }
}

impl PinIo for SimBus {
    fn set_input_pullup(&mut self, pin: u8) {
        if let Some(mode) = self.modes.get_mut(pin as usize) {
            *mode = PinMode::InputPullup;
        }
    }

    fn set_output(&mut self, pin: u8) {
        if let Some(mode) = self.modes.get_mut(pin as usize) {
            *mode = PinMode::Output;
        }
    }

    fn read(&mut self, pin: u8) -> bool {
        if let Some(shift) = &self.shift {
            if pin == shift.data_pin {
                let byte = shift.bit_index / 8;
                let bit = shift.bit_index % 8;
                return match shift.latched.get(byte) {
                    Some(value) => (value >> bit) & 1 == 1,
                    None => true,
                };
            }
        }
        if let Some(matrix) = &self.matrix {
            if let Some(row_index) = matrix.row_pins.iter().position(|&p| p == pin) {
                return self.matrix_row_level(row_index);
            }
        }
        self.in_levels.get(pin as usize).copied().unwrap_or(true)
    }

    fn write(&mut self, pin: u8, high: bool) {
        let previous = self
            .out_levels
            .get(pin as usize)
            .copied()
            .unwrap_or(true);
        if let Some(level) = self.out_levels.get_mut(pin as usize) {
            *level = high;
        }

        if let Some(shift) = &mut self.shift {
            // Falling load edge latches the parallel inputs and rewinds the
            // serial stream; rising clock edge shifts to the next bit.
            if pin == shift.load_pin && previous && !high {
                shift.latched = shift.inputs.clone();
                shift.bit_index = 0;
            }
            if pin == shift.clock_pin && !previous && high {
                shift.bit_index += 1;
            }
        }
    }

    fn delay_us(&mut self, _us: u32) {
        // Settle delays are irrelevant to the simulation.
    }
}

/// Manually advanced monotonic clock.
pub struct SimClock {
    us: Cell<u32>,
}

impl SimClock {
    pub fn new() -> Self {
        Self { us: Cell::new(0) }
    }

    pub fn advance_ms(&self, ms: u32) {
        self.us.set(self.us.get().wrapping_add(ms * 1_000));
    }

    pub fn advance_us(&self, us: u32) {
        self.us.set(self.us.get().wrapping_add(us));
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u32 {
        self.us.get() / 1_000
    }

    fn now_us(&self) -> u32 {
        self.us.get()
    }
}

/// Records observable button transitions (state changes, not raw writes,
/// since `Normal` behavior rewrites its state every tick by design).
pub struct RecordingSink {
    state: [bool; 64],
    press_times: Vec<Vec<u64>>,
    release_times: Vec<Vec<u64>>,
    now_us: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            state: [false; 64],
            press_times: std::iter::repeat_with(Vec::new).take(64).collect(),
            release_times: std::iter::repeat_with(Vec::new).take(64).collect(),
            now_us: 0,
        }
    }

    /// Stamp subsequent transitions with this time.
    pub fn set_time(&mut self, now_us: u64) {
        self.now_us = now_us;
    }

    pub fn pressed(&self, index: u8) -> bool {
        self.state[index as usize]
    }

    /// Number of observed false→true transitions.
    pub fn presses(&self, index: u8) -> usize {
        self.press_times[index as usize].len()
    }

    /// Number of observed true→false transitions.
    pub fn releases(&self, index: u8) -> usize {
        self.release_times[index as usize].len()
    }

    pub fn press_times(&self, index: u8) -> Vec<u64> {
        self.press_times[index as usize].clone()
    }

    pub fn release_times(&self, index: u8) -> Vec<u64> {
        self.release_times[index as usize].clone()
    }
}

impl ButtonSink for RecordingSink {
    fn set_button(&mut self, index: u8, pressed: bool) {
        let slot = index as usize;
        if slot >= self.state.len() || self.state[slot] == pressed {
            return;
        }
        self.state[slot] = pressed;
        if pressed {
            self.press_times[slot].push(self.now_us);
        } else {
            self.release_times[slot].push(self.now_us);
        }
    }
}
