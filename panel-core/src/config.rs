//! Logical input configuration: one uniform description for every physical
//! control, regardless of how it is wired.
//!
//! A panel is described by two ordered tables supplied at startup: a pin map
//! assigning roles to the microcontroller pins actually used, and a list of
//! [`LogicalInput`] entries mapping physical positions to HID buttons. An
//! encoder is declared as an [`Behavior::EncoderA`] entry immediately
//! followed by its [`Behavior::EncoderB`] partner; the phases may live on any
//! source kind, including a shift-register bit.

/// Maximum distinct direct pins carrying logical buttons.
pub const MAX_BUTTON_PIN_GROUPS: usize = 32;
/// Maximum logical buttons sharing one direct pin.
pub const MAX_LOGICAL_PER_PIN: usize = 4;
/// Maximum distinct shift-register bit positions carrying logical buttons.
pub const MAX_SHIFTREG_GROUPS: usize = 32;
/// Maximum logical buttons sharing one shift-register bit.
pub const MAX_LOGICAL_PER_SHIFT_BIT: usize = 4;
/// Matrix dimension limits.
pub const MAX_MATRIX_ROWS: usize = 8;
pub const MAX_MATRIX_COLS: usize = 8;
pub const MAX_MATRIX_CELLS: usize = MAX_MATRIX_ROWS * MAX_MATRIX_COLS;
/// Maximum logical buttons sharing one matrix cell.
pub const MAX_LOGICAL_PER_MATRIX_POS: usize = 4;
/// Maximum rotary encoders.
pub const MAX_ENCODERS: usize = 8;
/// Maximum daisy-chained 74HC165 registers.
pub const MAX_SHIFT_REGISTERS: usize = 4;
/// Highest pin id the engine will touch; reads beyond this report pull-up idle.
pub const MAX_PINS: usize = 32;

/// Where a logical input is physically wired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// A switch wired directly to a GPIO pin (active low, internal pull-up).
    Pin { pin: u8 },
    /// An intersection of the row/column key matrix.
    Matrix { row: u8, col: u8 },
    /// One bit of the 74HC165 shift-register chain.
    ShiftRegister { register: u8, bit: u8 },
}

/// How a logical input drives its HID button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Behavior {
    /// Output mirrors the effective pressed state every tick.
    Normal,
    /// One fixed-width pulse per effective rising edge, however long the
    /// physical press lasts.
    Momentary,
    /// First phase of an encoder pair; never drives output directly.
    EncoderA,
    /// Second phase of an encoder pair; never drives output directly.
    EncoderB,
}

/// Which phase-code transitions externalize an encoder detent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchMode {
    /// Four transitions per detent, latched at phase code 3 (both lines
    /// high). The default for pull-up wiring where the encoder rests open.
    Four3,
    /// Mirror of [`LatchMode::Four3`] for reversed wiring: latched at code 0.
    Four0,
    /// Two detents per electrical cycle, latched at codes 0 and 3. For
    /// encoders with weak mechanical detent definition.
    Two03,
}

/// One logical input entry of the startup configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalInput {
    pub source: Source,
    /// Target HID button id, 1-based. 0 means unassigned and maps to output
    /// index 0 — a long-standing quirk, kept.
    pub button: u8,
    pub behavior: Behavior,
    /// Invert the effective pressed state (for normally-closed switches).
    pub reverse: bool,
    /// Detent latch policy; only meaningful on [`Behavior::EncoderA`] entries.
    pub latch: LatchMode,
}

impl LogicalInput {
    /// A logical input on a direct GPIO pin.
    #[must_use]
    pub const fn pin(pin: u8, button: u8, behavior: Behavior) -> Self {
        Self {
            source: Source::Pin { pin },
            button,
            behavior,
            reverse: false,
            latch: LatchMode::Four3,
        }
    }

    /// A logical input on a matrix intersection.
    #[must_use]
    pub const fn matrix(row: u8, col: u8, button: u8, behavior: Behavior) -> Self {
        Self {
            source: Source::Matrix { row, col },
            button,
            behavior,
            reverse: false,
            latch: LatchMode::Four3,
        }
    }

    /// A logical input on a shift-register bit.
    #[must_use]
    pub const fn shift_register(register: u8, bit: u8, button: u8, behavior: Behavior) -> Self {
        Self {
            source: Source::ShiftRegister { register, bit },
            button,
            behavior,
            reverse: false,
            latch: LatchMode::Four3,
        }
    }

    /// Invert the effective pressed state.
    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Select the detent latch mode (encoder phase A entries only).
    #[must_use]
    pub const fn with_latch(mut self, latch: LatchMode) -> Self {
        self.latch = latch;
        self
    }

    /// True for the two encoder-phase behaviors.
    #[must_use]
    pub const fn is_encoder_phase(&self) -> bool {
        matches!(self.behavior, Behavior::EncoderA | Behavior::EncoderB)
    }
}

/// Role of one entry in the static hardware pin map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRole {
    /// Matrix row sense line (input, pull-up).
    Row,
    /// Matrix column drive line (pulled low one at a time during a scan).
    Column,
    /// 74HC165 parallel-load strobe.
    ShiftLoad,
    /// 74HC165 clock.
    ShiftClock,
    /// 74HC165 serial data out.
    ShiftData,
    /// Plain direct-button pin.
    Button,
}

/// One `(pin, role)` pair of the hardware pin map. Matrix rows and columns
/// are assigned in declaration order: the first [`PinRole::Row`] entry is
/// matrix row 0, and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMapEntry {
    pub pin: u8,
    pub role: PinRole,
}

impl PinMapEntry {
    #[must_use]
    pub const fn new(pin: u8, role: PinRole) -> Self {
        Self { pin, role }
    }
}

/// Complete startup configuration handed to the engine.
///
/// Reconfiguration is a full re-initialize: build a new
/// [`PanelEngine`](crate::engine::PanelEngine) from a new `PanelConfig`.
#[derive(Clone, Copy, Debug)]
pub struct PanelConfig<'a> {
    pub pin_map: &'a [PinMapEntry],
    pub inputs: &'a [LogicalInput],
    /// Number of daisy-chained shift registers actually populated.
    pub shift_registers: u8,
}
