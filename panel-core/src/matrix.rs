//! Row/column key matrix scanner.
//!
//! # Theory of operation
//!
//! Every row and column line idles as an input with the internal pull-up
//! enabled. To scan, each column in turn is driven low while all other
//! columns float high-impedance; after a short settle delay every row pin is
//! read. A row reads low only for intersections closed on the currently
//! active column, so an R×C matrix needs R+C pins instead of R×C. All lines
//! are restored to pull-up inputs after the pass.
//!
//! Each cell is debounced independently (see [`Debounce`]) and reports a
//! discriminated [`KeyState`] plus a changed-this-scan flag. Because encoder
//! phase wires may physically be matrix row pins, the scanner also publishes
//! a non-debounced row-pin level snapshot derived from the same pass; the
//! quadrature decoders sample that snapshot instead of touching the pins.

use heapless::Vec;

use crate::config::{MAX_MATRIX_CELLS, MAX_MATRIX_COLS, MAX_MATRIX_ROWS, MAX_PINS};
use crate::debounce::{Debounce, DEBOUNCE_MS};
use crate::hal::PinIo;

/// Settle delay after driving a column, in microseconds.
pub const SETTLE_US: u32 = 10;

/// Debounced state of one matrix cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    Idle,
    Pressed,
    Held,
    Released,
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    debounce: Debounce,
    /// Instantaneous level from the last pass, ignoring debounce.
    raw_pressed: bool,
    state: KeyState,
    changed: bool,
}

/// Instantaneous matrix row-pin levels, indexed by pin id. `true` is high
/// (pull-up idle); unknown pins read high.
#[derive(Clone, Copy, Debug)]
pub struct RowLevels {
    levels: [bool; MAX_PINS],
}

impl RowLevels {
    #[must_use]
    pub const fn all_high() -> Self {
        Self {
            levels: [true; MAX_PINS],
        }
    }

    /// Level of the given pin; pins outside the tracked range read high.
    #[inline]
    #[must_use]
    pub fn level(&self, pin: u8) -> bool {
        self.levels.get(pin as usize).copied().unwrap_or(true)
    }

    fn set_low(&mut self, pin: u8) {
        if let Some(level) = self.levels.get_mut(pin as usize) {
            *level = false;
        }
    }
}

/// Scanner for one row/column matrix.
pub struct MatrixScanner {
    row_pins: Vec<u8, MAX_MATRIX_ROWS>,
    col_pins: Vec<u8, MAX_MATRIX_COLS>,
    cells: [Cell; MAX_MATRIX_CELLS],
    debounce_ms: u32,
}

impl MatrixScanner {
    /// Build a scanner over the given row and column pins. Cells start
    /// released with the debounce timer seeded at `now_ms`.
    #[must_use]
    pub fn new(row_pins: Vec<u8, MAX_MATRIX_ROWS>, col_pins: Vec<u8, MAX_MATRIX_COLS>, now_ms: u32) -> Self {
        Self {
            row_pins,
            col_pins,
            cells: [Cell {
                debounce: Debounce::new(false, DEBOUNCE_MS, now_ms),
                raw_pressed: false,
                state: KeyState::Idle,
                changed: false,
            }; MAX_MATRIX_CELLS],
            debounce_ms: DEBOUNCE_MS,
        }
    }

    /// Override the per-matrix debounce window.
    pub fn set_debounce_ms(&mut self, window_ms: u32, now_ms: u32) {
        self.debounce_ms = window_ms;
        for cell in &mut self.cells {
            cell.debounce = Debounce::new(cell.debounce.state(), window_ms, now_ms);
        }
    }

    pub fn rows(&self) -> usize {
        self.row_pins.len()
    }

    pub fn cols(&self) -> usize {
        self.col_pins.len()
    }

    /// Pin id of the given row, if configured. Used to resolve matrix-hosted
    /// encoder phases.
    #[must_use]
    pub fn row_pin(&self, row: u8) -> Option<u8> {
        self.row_pins.get(row as usize).copied()
    }

    /// Put every matrix line into its pull-up idle state.
    pub fn configure_pins<P: PinIo>(&self, pins: &mut P) {
        for &pin in self.row_pins.iter().chain(self.col_pins.iter()) {
            pins.set_input_pullup(pin);
        }
    }

    /// Run one full column-at-a-time pass.
    pub fn scan<P: PinIo>(&mut self, pins: &mut P, now_ms: u32) {
        let cols = self.col_pins.len();
        for cell in &mut self.cells {
            cell.changed = false;
        }

        for (ci, &col) in self.col_pins.iter().enumerate() {
            pins.set_output(col);
            pins.write(col, false);
            for &other in self.col_pins.iter().filter(|&&p| p != col) {
                pins.set_input_pullup(other);
            }
            pins.delay_us(SETTLE_US);

            for (ri, &row) in self.row_pins.iter().enumerate() {
                let pressed = !pins.read(row);
                let cell = &mut self.cells[ri * cols + ci];
                cell.raw_pressed = pressed;
                let before = cell.debounce.state();
                let accepted = cell.debounce.update(pressed, now_ms);
                cell.changed = accepted != before;
                cell.state = match (cell.changed, accepted) {
                    (true, true) => KeyState::Pressed,
                    (true, false) => KeyState::Released,
                    (false, true) => KeyState::Held,
                    (false, false) => KeyState::Idle,
                };
            }
        }

        // Leave the matrix in its idle state between passes.
        for &pin in self.row_pins.iter().chain(self.col_pins.iter()) {
            pins.set_input_pullup(pin);
        }
    }

    /// Debounced state of one cell; out-of-range cells are idle.
    #[must_use]
    pub fn state(&self, row: u8, col: u8) -> KeyState {
        self.cell(row, col).map_or(KeyState::Idle, |c| c.state)
    }

    /// Whether the cell changed state during the last pass.
    #[must_use]
    pub fn changed(&self, row: u8, col: u8) -> bool {
        self.cell(row, col).is_some_and(|c| c.changed)
    }

    /// Debounced pressed-ness, for the behavior translator.
    #[must_use]
    pub fn pressed(&self, row: u8, col: u8) -> bool {
        matches!(self.state(row, col), KeyState::Pressed | KeyState::Held)
    }

    /// Instantaneous pressed-ness from the last pass, ignoring debounce.
    #[must_use]
    pub fn raw_pressed(&self, row: u8, col: u8) -> bool {
        self.cell(row, col).is_some_and(|c| c.raw_pressed)
    }

    /// Publish the non-debounced row-pin levels of the last pass: a row pin
    /// reads low iff any of its intersections saw a raw press.
    pub fn publish_row_levels(&self, levels: &mut RowLevels) {
        *levels = RowLevels::all_high();
        let cols = self.col_pins.len();
        for (ri, &pin) in self.row_pins.iter().enumerate() {
            let row_low = (0..cols).any(|ci| self.cells[ri * cols + ci].raw_pressed);
            if row_low {
                levels.set_low(pin);
            }
        }
    }

    fn cell(&self, row: u8, col: u8) -> Option<&Cell> {
        let (row, col) = (row as usize, col as usize);
        if row < self.row_pins.len() && col < self.col_pins.len() {
            self.cells.get(row * self.col_pins.len() + col)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;

    fn scanner(bus: &SimBus, now_ms: u32) -> MatrixScanner {
        let rows = Vec::from_slice(bus.matrix_row_pins()).unwrap();
        let cols = Vec::from_slice(bus.matrix_col_pins()).unwrap();
        MatrixScanner::new(rows, cols, now_ms)
    }

    #[test]
    fn test_debounce_idempotence() {
        let mut bus = SimBus::with_matrix(&[2, 3], &[6, 7]);
        let mut m = scanner(&bus, 0);
        m.configure_pins(&mut bus);

        bus.close_switch(0, 0, true);
        let mut edges = 0;
        // 40 scans at 1 ms spacing with a 20 ms window: exactly one accepted
        // pressed edge.
        for t in 1..=40 {
            m.scan(&mut bus, t);
            if m.changed(0, 0) && m.state(0, 0) == KeyState::Pressed {
                edges += 1;
            }
        }
        assert_eq!(edges, 1);
        assert_eq!(m.state(0, 0), KeyState::Held);
    }

    #[test]
    fn test_cell_lifecycle() {
        let mut bus = SimBus::with_matrix(&[2, 3], &[6, 7]);
        let mut m = scanner(&bus, 0);

        bus.close_switch(1, 1, true);
        m.scan(&mut bus, 25);
        assert_eq!(m.state(1, 1), KeyState::Pressed);
        assert!(m.changed(1, 1));

        m.scan(&mut bus, 26);
        assert_eq!(m.state(1, 1), KeyState::Held);
        assert!(!m.changed(1, 1));

        bus.close_switch(1, 1, false);
        m.scan(&mut bus, 50);
        assert_eq!(m.state(1, 1), KeyState::Released);
        assert!(m.changed(1, 1));

        m.scan(&mut bus, 51);
        assert_eq!(m.state(1, 1), KeyState::Idle);

        // Unrelated cells never left idle.
        assert_eq!(m.state(0, 0), KeyState::Idle);
    }

    #[test]
    fn test_chatter_does_not_retrigger() {
        let mut bus = SimBus::with_matrix(&[2], &[6]);
        let mut m = scanner(&bus, 0);

        bus.close_switch(0, 0, true);
        m.scan(&mut bus, 30);
        assert_eq!(m.state(0, 0), KeyState::Pressed);

        // Contact bounce within the window is invisible.
        bus.close_switch(0, 0, false);
        m.scan(&mut bus, 35);
        assert_eq!(m.state(0, 0), KeyState::Held);
        bus.close_switch(0, 0, true);
        m.scan(&mut bus, 40);
        assert_eq!(m.state(0, 0), KeyState::Held);
    }

    #[test]
    fn test_row_level_snapshot_ignores_debounce() {
        let mut bus = SimBus::with_matrix(&[2, 3], &[6]);
        let mut m = scanner(&bus, 0);
        let mut levels = RowLevels::all_high();

        // Fresh press: not yet debounced-accepted, but the raw snapshot must
        // already show the row low.
        bus.close_switch(1, 0, true);
        m.scan(&mut bus, 1);
        assert_eq!(m.state(1, 0), KeyState::Idle);
        m.publish_row_levels(&mut levels);
        assert!(levels.level(2));
        assert!(!levels.level(3));
        // Unmapped pins read pull-up idle.
        assert!(levels.level(31));
    }

    #[test]
    fn test_lines_restored_after_scan() {
        let mut bus = SimBus::with_matrix(&[2, 3], &[6, 7]);
        let mut m = scanner(&bus, 0);
        m.scan(&mut bus, 1);
        for pin in [2u8, 3, 6, 7] {
            assert!(bus.is_input_pullup(pin), "pin {pin} not restored");
        }
    }
}
