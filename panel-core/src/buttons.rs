//! Panel button state as a bitfield, and the default [`ButtonSink`] impl.

use crate::hal::ButtonSink;

/// Number of HID buttons the panel exposes.
pub const BUTTON_COUNT: u8 = 32;

/// Button state for the whole panel, one bit per HID button.
///
/// This is the engine-facing side of the USB report: the engine mutates it
/// through [`ButtonSink`], the firmware serializes it into the 4-byte HID
/// report. Out-of-range indices are ignored.
///
/// # Example
///
/// ```
/// use panel_core::PanelButtons;
///
/// let mut buttons = PanelButtons::none();
/// buttons.set(3, true);
/// assert!(buttons.pressed(3));
/// assert_eq!(buttons.raw(), 0b1000);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelButtons(pub u32);

impl PanelButtons {
    /// No buttons pressed.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// Check whether the given button index is pressed.
    #[inline]
    #[must_use]
    pub const fn pressed(self, index: u8) -> bool {
        index < BUTTON_COUNT && (self.0 >> index) & 1 == 1
    }

    /// Set or clear one button. Indices past the panel size are ignored.
    #[inline]
    pub fn set(&mut self, index: u8, pressed: bool) {
        if index >= BUTTON_COUNT {
            return;
        }
        if pressed {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }

    /// Get the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Release every button.
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl ButtonSink for PanelButtons {
    #[inline]
    fn set_button(&mut self, index: u8, pressed: bool) {
        self.set(index, pressed);
    }
}
