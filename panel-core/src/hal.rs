//! Hardware seam traits consumed by the engine.
//!
//! Everything the engine needs from the outside world fits in three traits:
//! pin access, a monotonic clock, and the HID button sink. Implementations
//! exist for the RP2040 (in the firmware crate) and for the host simulator
//! used by the unit tests.

/// Monotonic clock with millisecond and microsecond resolution.
///
/// Both counters are expected to wrap; all consumers compare elapsed time
/// with `wrapping_sub`, so a wrap mid-interval is harmless. The microsecond
/// counter is only used by the pulse scheduler for sub-millisecond cadence.
pub trait Clock {
    fn now_ms(&self) -> u32;
    fn now_us(&self) -> u32;
}

/// Digital pin primitives.
///
/// Pins are addressed by small integer ids straight out of the configuration
/// tables. Implementations must treat an out-of-range pin as a no-op for
/// configuration and writes, and report pull-up idle (high) for reads —
/// bounds violations are absorbed, never surfaced.
pub trait PinIo {
    /// Configure the pin as an input with the internal pull-up enabled.
    fn set_input_pullup(&mut self, pin: u8);
    /// Configure the pin as a push-pull output.
    fn set_output(&mut self, pin: u8);
    /// Read the digital level; `true` is high.
    fn read(&mut self, pin: u8) -> bool;
    /// Drive the digital level; `true` is high.
    fn write(&mut self, pin: u8, high: bool);
    /// Short busy-wait for signal settling and protocol timing. Never a
    /// suspension point.
    fn delay_us(&mut self, us: u32);
}

/// Logical HID button sink.
///
/// Indices are zero-based; the engine converts its 1-based configured button
/// ids before calling. Writes are idempotent: setting an index to its current
/// state is harmless and may happen every tick.
pub trait ButtonSink {
    fn set_button(&mut self, index: u8, pressed: bool);
}
