//! Platform-agnostic digital input engine for a flight panel button box.
//!
//! This crate turns a mixed set of physical controls — direct switches,
//! key-matrix positions, 74HC165 shift-register bits and quadrature rotary
//! encoders — into calls against a logical HID button sink. It contains no
//! platform code: all hardware access goes through the three traits in
//! [`hal`], so the same engine runs on an RP2040 and on the host under
//! `cargo test`.
//!
//! # Overview
//!
//! - [`config`]: the logical input description ([`LogicalInput`], [`Source`],
//!   [`Behavior`]) and the static pin map ([`PinMapEntry`])
//! - [`hal`]: the seam traits ([`PinIo`], [`Clock`], [`ButtonSink`])
//! - [`matrix`]: row/column scanner with per-cell debouncing
//! - [`shiftreg`]: 74HC165 chain driver and read cadence
//! - [`quadrature`]: latched quadrature decoder and the edge-filter variant
//! - [`scheduler`]: rate-limited encoder pulse scheduler
//! - [`engine`]: the orchestrator ([`PanelEngine`]) tying it all together
//! - [`buttons`]: a 32-button bitfield sink ([`PanelButtons`])
//!
//! # Execution model
//!
//! Single-threaded cooperative polling. [`PanelEngine::tick`] is called once
//! per cycle (1 ms on the target) and runs a fixed sequence: refresh the
//! shift-register buffer, update debounced buttons, publish the raw matrix
//! row snapshot, then decode encoders and service their pulse channels. All
//! timing is elapsed-time comparison on monotonic millisecond/microsecond
//! counters with wrapping subtraction; nothing blocks beyond short settle
//! busy-waits.
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations; fixed
//! pools are `heapless::Vec`s sized at the documented limits.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod buttons;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod hal;
pub mod logical;
pub mod matrix;
pub mod quadrature;
pub mod scheduler;
pub mod shiftreg;

mod encoder;

#[cfg(test)]
pub(crate) mod sim;

// Re-export main types at crate root
pub use buttons::PanelButtons;
pub use config::{Behavior, LatchMode, LogicalInput, PanelConfig, PinMapEntry, PinRole, Source};
pub use engine::{InitSummary, PanelEngine};
pub use hal::{ButtonSink, Clock, PinIo};
pub use matrix::KeyState;
pub use scheduler::StepDirection;
