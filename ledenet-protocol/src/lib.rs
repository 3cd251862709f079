//! # ledenet-protocol
//!
//! Wire protocol for Magic Home / LEDENET networked LED controllers.
//!
//! This crate provides:
//! - Pure byte codecs (percent/speed/brightness conversions, checksums)
//! - Command encoding for both known firmware dialects
//! - Positional decoding of state response frames
//! - The 14-byte timer slot codec and its 6-slot batch layout
//! - Preset and built-in effect code tables
//!
//! Everything here is transport-free; the TCP session lives in
//! `ledenet-client`.

pub mod codec;
pub mod command;
pub mod error;
pub mod pattern;
pub mod state;
pub mod timer;
pub mod variant;

pub use command::{ChannelWrite, Transition};
pub use error::ProtocolError;
pub use pattern::{BuiltInEffect, PresetPattern};
pub use state::{DeviceMode, DeviceState};
pub use timer::{RepeatMask, TimerAction, TimerSlot};
pub use variant::{Capabilities, ProtocolVariant};

/// Default TCP command port.
pub const DEFAULT_PORT: u16 = 5577;

/// State response length for the standard dialect.
pub const STATE_RESPONSE_LEN_STANDARD: usize = 14;

/// State response length for the original (legacy) dialect.
pub const STATE_RESPONSE_LEN_LEGACY: usize = 11;

/// Serialized size of one timer slot.
pub const TIMER_SLOT_LEN: usize = 14;

/// Number of timer slots always transmitted as a batch.
pub const TIMER_SLOT_COUNT: usize = 6;

/// Timer query response length (2 header bytes + 6 slots + 2 trailer bytes).
pub const TIMER_BLOCK_LEN: usize = 88;

/// Clock query response length.
pub const CLOCK_RESPONSE_LEN: usize = 12;
