//! User-editable panel wiring and logical input tables.
//!
//! Edit these tables to match the physical panel, the same way the wiring
//! itself is fixed at build time. Only used pins need to be listed; matrix
//! rows and columns are numbered in declaration order.

use panel_core::{Behavior, LatchMode, LogicalInput, PanelConfig, PinMapEntry, PinRole};

/// Number of daisy-chained 74HC165 registers populated on the board.
pub const SHIFT_REGISTER_COUNT: u8 = 1;

/// Hardware pin map.
pub static PIN_MAP: &[PinMapEntry] = &[
    PinMapEntry::new(2, PinRole::Row),
    PinMapEntry::new(3, PinRole::Row),
    PinMapEntry::new(4, PinRole::Row),
    PinMapEntry::new(5, PinRole::Row),
    PinMapEntry::new(6, PinRole::Column),
    PinMapEntry::new(7, PinRole::Column),
    PinMapEntry::new(18, PinRole::ShiftData), // 74HC165 serial out (QH)
    PinMapEntry::new(19, PinRole::ShiftLoad), // 74HC165 parallel load (PL)
    PinMapEntry::new(20, PinRole::ShiftClock), // 74HC165 clock (CP)
    PinMapEntry::new(10, PinRole::Button),
    PinMapEntry::new(11, PinRole::Button),
    PinMapEntry::new(12, PinRole::Button),
    PinMapEntry::new(13, PinRole::Button),
];

/// Logical inputs, in configuration order. An encoder is an `EncoderA` entry
/// immediately followed by its `EncoderB` partner; phase A's button id fires
/// on clockwise steps, phase B's on counter-clockwise.
pub static LOGICAL_INPUTS: &[LogicalInput] = &[
    // Matrix buttons (row, col, button id, behavior)
    LogicalInput::matrix(0, 0, 1, Behavior::Normal),
    LogicalInput::matrix(1, 0, 2, Behavior::Normal),
    LogicalInput::matrix(2, 0, 3, Behavior::Momentary),
    LogicalInput::matrix(3, 0, 4, Behavior::Momentary),
    // Encoder on matrix rows 0/1 of column 1
    LogicalInput::matrix(0, 1, 5, Behavior::EncoderA),
    LogicalInput::matrix(1, 1, 6, Behavior::EncoderB),
    // Direct-pin buttons
    LogicalInput::pin(10, 7, Behavior::Normal),
    LogicalInput::pin(11, 8, Behavior::Normal).reversed(),
    // Direct-pin encoder
    LogicalInput::pin(12, 9, Behavior::EncoderA).with_latch(LatchMode::Four3),
    LogicalInput::pin(13, 10, Behavior::EncoderB),
    // Shift register inputs (register, bit, button id, behavior)
    LogicalInput::shift_register(0, 0, 11, Behavior::Normal),
    LogicalInput::shift_register(0, 1, 12, Behavior::EncoderA).with_latch(LatchMode::Two03),
    LogicalInput::shift_register(0, 2, 13, Behavior::EncoderB),
    LogicalInput::shift_register(0, 3, 14, Behavior::Normal),
    LogicalInput::shift_register(0, 4, 15, Behavior::Momentary),
];

/// The complete startup configuration.
#[must_use]
pub fn config() -> PanelConfig<'static> {
    PanelConfig {
        pin_map: PIN_MAP,
        inputs: LOGICAL_INPUTS,
        shift_registers: SHIFT_REGISTER_COUNT,
    }
}
