//! Device state response decoding.
//!
//! State frames are positional with no schema or version field:
//!
//! ```text
//! standard (14 bytes):
//! pos  0    1    2    3    4    5    6    7    8    9    10   11   12   13
//!     0x81 type pwr  pat  ?    dly  r    g    b    ww   ?    cw   mask csum
//!
//! legacy (11 bytes):
//!     0x66 type pwr  pat  ?    dly  r    g    b    ww   csum(unchecked)
//! ```
//!
//! Byte 1 is the controller sub-type and selects capability flags; byte
//! 2 is 0x23 (on) or 0x24 (off); byte 3 is the pattern code from which
//! the mode is derived.

use crate::codec;
use crate::error::ProtocolError;
use crate::pattern::{BuiltInEffect, PresetPattern};
use crate::variant::{Capabilities, ProtocolVariant};
use std::fmt;

/// Power byte value for "on".
pub const POWER_ON: u8 = 0x23;
/// Power byte value for "off".
pub const POWER_OFF: u8 = 0x24;

/// The operating mode derived from the pattern code and capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Color,
    WarmWhite,
    Preset,
    Custom,
    Sunrise,
    Sunset,
    /// Mode resolution is best-effort; callers must tolerate this.
    Unknown,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceMode::Color => "color",
            DeviceMode::WarmWhite => "warm white",
            DeviceMode::Preset => "preset",
            DeviceMode::Custom => "custom",
            DeviceMode::Sunrise => "sunrise",
            DeviceMode::Sunset => "sunset",
            DeviceMode::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A fully decoded state snapshot.
///
/// Constructed only from a length-correct (and, for checksummed
/// variants, checksum-correct) response; a partial response never
/// produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    /// The raw response bytes the snapshot was decoded from.
    pub raw: Vec<u8>,
    /// Controller sub-type byte.
    pub subtype: u8,
    pub power_on: bool,
    pub mode: DeviceMode,
    pub pattern_code: u8,
    /// Effect delay byte (1 fastest, 31 slowest).
    pub delay: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub warm_white: u8,
    /// Cold-white level; only meaningful on dual-white devices.
    pub cold_white: u8,
    /// Capabilities derived from the sub-type byte.
    pub capabilities: Capabilities,
}

impl DeviceState {
    /// Decodes a state response for the given dialect.
    ///
    /// Fails on short input, and on checksum mismatch for variants
    /// that enable checksums. Legacy responses are never
    /// checksum-verified.
    pub fn decode(raw: &[u8], variant: ProtocolVariant) -> Result<Self, ProtocolError> {
        let expected = variant.state_response_len();
        if raw.len() < expected {
            return Err(ProtocolError::ShortResponse {
                expected,
                got: raw.len(),
            });
        }
        let raw = &raw[..expected];

        if variant.uses_checksum() {
            let actual = raw[expected - 1];
            let computed = codec::checksum(&raw[..expected - 1]);
            if computed != actual {
                return Err(ProtocolError::ChecksumMismatch {
                    expected: computed,
                    actual,
                });
            }
        }

        let subtype = raw[1];
        let capabilities = Capabilities::from_subtype(subtype);
        let pattern_code = raw[3];
        let warm_white = raw[9];
        let cold_white = if capabilities.dual_white && raw.len() > 11 {
            raw[11]
        } else {
            0
        };

        Ok(Self {
            raw: raw.to_vec(),
            subtype,
            power_on: raw[2] == POWER_ON,
            mode: determine_mode(capabilities, warm_white, pattern_code),
            pattern_code,
            delay: raw[5],
            red: raw[6],
            green: raw[7],
            blue: raw[8],
            warm_white,
            cold_white,
            capabilities,
        })
    }

    /// Sub-type 0x01 devices answer the standard query but speak the
    /// legacy dialect; the session downgrades on seeing this.
    pub fn refined_variant(&self) -> Option<ProtocolVariant> {
        (self.subtype == 0x01).then_some(ProtocolVariant::LegacyOriginal)
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }

    /// Current brightness 0-255: the warm-white level in warm-white
    /// mode, otherwise the HSV value of the color channels.
    pub fn brightness(&self) -> u8 {
        if self.mode == DeviceMode::WarmWhite {
            self.warm_white
        } else {
            codec::brightness_of(self.rgb())
        }
    }

    /// Effect speed 0-100 derived from the delay byte.
    pub fn speed(&self) -> u8 {
        codec::delay_to_speed(self.delay)
    }
}

/// Derives the mode with fixed precedence: explicit color codes first,
/// then custom, then the preset range, then built-in effects.
fn determine_mode(caps: Capabilities, ww_level: u8, pattern_code: u8) -> DeviceMode {
    match pattern_code {
        0x61 | 0x62 => {
            if caps.rgbw_capable {
                DeviceMode::Color
            } else if ww_level != 0 {
                DeviceMode::WarmWhite
            } else {
                DeviceMode::Color
            }
        }
        0x60 => DeviceMode::Custom,
        0x41 | 0x00 => DeviceMode::Color,
        code if PresetPattern::is_valid(code) => DeviceMode::Preset,
        code => match BuiltInEffect::from_code(code) {
            Some(BuiltInEffect::Sunrise) => DeviceMode::Sunrise,
            Some(BuiltInEffect::Sunset) => DeviceMode::Sunset,
            None => DeviceMode::Unknown,
        },
    }
}
