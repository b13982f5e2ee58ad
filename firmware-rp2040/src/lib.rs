//! USB HID flight panel firmware for RP2040.
//!
//! This crate is the hardware half of the panel: it implements the engine's
//! seam traits over Embassy and exposes the panel as a 32-button USB HID
//! device.
//!
//! # Architecture
//!
//! The firmware runs three Embassy tasks:
//!
//! - **USB Task**: runs the USB device stack
//! - **Scan Task**: owns the [`PanelEngine`] and the GPIO bank, ticks the
//!   engine every millisecond, and signals the resulting report when it
//!   changes
//! - **Output Task**: waits for report signals and writes USB HID reports
//!
//! Communication between tasks uses Embassy's
//! [`Signal`](embassy_sync::signal::Signal) with "latest value wins"
//! semantics: the USB output always reflects the most recent panel state.
//! The engine itself is single-threaded by design — the scan task is the one
//! thread of control, so the engine's write-before-read buffer ordering
//! holds by construction.
//!
//! # Configuration
//!
//! The pin map and logical input tables live in [`panel_config`] and are
//! edited at compile time, the way the panel hardware itself is wired at
//! soldering time.
//!
//! # Features
//!
//! - **`dev-panic`** (default): `panic-probe` prints panics via RTT
//! - **`prod-panic`**: `panic-reset` silently resets

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Enable only one of `dev-panic` and `prod-panic`");

// Re-export core types for convenience
pub use panel_core::{
    Behavior, ButtonSink, Clock, InitSummary, LatchMode, LogicalInput, PanelButtons, PanelConfig,
    PanelEngine, PinIo, PinMapEntry, PinRole, Source,
};

pub mod panel_config;
pub mod pins;
pub mod usb_output;

pub use pins::{RpPinBank, UptimeClock, GPIO_COUNT};
pub use usb_output::{configure_usb_hid, OutputError, PanelReport, PanelRequestHandler, UsbHidOutput};
