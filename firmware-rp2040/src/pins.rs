//! RP2040 implementations of the engine's seam traits.
//!
//! [`RpPinBank`] owns every user GPIO as an [`Flex`] pin, indexed by the bare
//! GPIO number the configuration tables use. [`UptimeClock`] adapts
//! [`embassy_time::Instant`] to the engine's wrap-tolerant counters.

use embassy_rp::gpio::{AnyPin, Flex, Level, Pull};
use embassy_rp::Peri;
use embassy_time::{Delay, Instant};
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use panel_core::{Clock, PinIo};

/// User GPIOs on the RP2040 (GPIO0..GPIO29).
pub const GPIO_COUNT: usize = 30;

/// All user GPIOs as dynamically reconfigurable pins.
///
/// Out-of-range pin ids are absorbed: configuration and writes become
/// no-ops, reads report the pull-up idle level.
pub struct RpPinBank {
    pins: Vec<Flex<'static>, GPIO_COUNT>,
}

impl RpPinBank {
    /// Take ownership of the whole GPIO bank. Every pin starts as an input
    /// with the pull-up enabled — the idle state for panel wiring.
    #[must_use]
    pub fn new(pins: [Peri<'static, AnyPin>; GPIO_COUNT]) -> Self {
        let mut bank: Vec<Flex<'static>, GPIO_COUNT> = Vec::new();
        for pin in pins {
            let mut flex = Flex::new(pin);
            flex.set_as_input();
            flex.set_pull(Pull::Up);
            // Infallible: the Vec is sized for exactly one bank.
            let _ = bank.push(flex);
        }
        Self { pins: bank }
    }
}

impl PinIo for RpPinBank {
    fn set_input_pullup(&mut self, pin: u8) {
        if let Some(flex) = self.pins.get_mut(pin as usize) {
            flex.set_as_input();
            flex.set_pull(Pull::Up);
        }
    }

    fn set_output(&mut self, pin: u8) {
        if let Some(flex) = self.pins.get_mut(pin as usize) {
            flex.set_as_output();
        }
    }

    fn read(&mut self, pin: u8) -> bool {
        self.pins
            .get_mut(pin as usize)
            .map_or(true, |flex| flex.is_high())
    }

    fn write(&mut self, pin: u8, high: bool) {
        if let Some(flex) = self.pins.get_mut(pin as usize) {
            flex.set_level(if high { Level::High } else { Level::Low });
        }
    }

    fn delay_us(&mut self, us: u32) {
        Delay.delay_us(us);
    }
}

/// Monotonic uptime clock. The u32 truncation wraps; the engine compares
/// elapsed time with wrapping subtraction throughout.
#[derive(Clone, Copy, Default)]
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }

    fn now_us(&self) -> u32 {
        Instant::now().as_micros() as u32
    }
}
