//! Command encoding.
//!
//! Every builder returns the complete on-wire byte sequence for one
//! command, with the trailing additive checksum appended iff the
//! active variant enables checksums. Validation happens here, before
//! any transport is touched, so caller mistakes surface immediately
//! and are never retried.

use crate::codec;
use crate::error::ProtocolError;
use crate::pattern::PresetPattern;
use crate::timer::TimerSlot;
use crate::variant::{Capabilities, ProtocolVariant};
use crate::{CLOCK_RESPONSE_LEN, TIMER_SLOT_COUNT};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Maximum number of colors in a custom pattern.
pub const CUSTOM_PATTERN_MAX_COLORS: usize = 16;

/// Filler tuple for unused custom pattern slots.
const CUSTOM_PATTERN_SENTINEL: [u8; 4] = [0x00, 0x01, 0x02, 0x03];

/// Appends the checksum iff the variant uses one.
fn frame(variant: ProtocolVariant, msg: Vec<u8>) -> Vec<u8> {
    if variant.uses_checksum() {
        codec::with_checksum(msg)
    } else {
        msg
    }
}

/// The power on/off command for the given dialect.
pub fn power(variant: ProtocolVariant, on: bool) -> Vec<u8> {
    let msg = match (variant, on) {
        (ProtocolVariant::LegacyOriginal, true) => vec![0xcc, 0x23, 0x33],
        (ProtocolVariant::LegacyOriginal, false) => vec![0xcc, 0x24, 0x33],
        (ProtocolVariant::Standard, true) => vec![0x71, 0x23, 0x0f],
        (ProtocolVariant::Standard, false) => vec![0x71, 0x24, 0x0f],
    };
    frame(variant, msg)
}

/// A requested channel write.
///
/// `None` channels are left at zero on the wire and excluded from the
/// write mask, so the device keeps their current values where it can.
#[derive(Debug, Clone, Copy)]
pub struct ChannelWrite {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
    pub warm_white: Option<u8>,
    pub cold_white: Option<u8>,
    /// Persist across power cycles; volatile writes use a different opcode.
    pub persist: bool,
    /// Optional brightness override: the RGB triple supplies hue and
    /// saturation, this replaces the HSV value magnitude.
    pub brightness: Option<u8>,
}

impl Default for ChannelWrite {
    fn default() -> Self {
        Self {
            red: None,
            green: None,
            blue: None,
            warm_white: None,
            cold_white: None,
            persist: true,
            brightness: None,
        }
    }
}

impl ChannelWrite {
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
            ..Self::default()
        }
    }

    pub fn warm_white(level: u8) -> Self {
        Self {
            warm_white: Some(level),
            ..Self::default()
        }
    }

    pub fn cold_white(level: u8) -> Self {
        Self {
            cold_white: Some(level),
            ..Self::default()
        }
    }

    pub fn whites(warm: u8, cold: u8) -> Self {
        Self {
            warm_white: Some(warm),
            cold_white: Some(cold),
            ..Self::default()
        }
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    fn has_color(&self) -> bool {
        self.red.is_some() || self.green.is_some() || self.blue.is_some()
    }

    fn has_white(&self) -> bool {
        self.warm_white.is_some() || self.cold_white.is_some()
    }
}

/// Encodes a color/white channel write.
///
/// Layout by dialect:
///
/// ```text
/// legacy:   56 r g b aa                      (no checksum)
/// standard: 31/41 r g b ww [cw] mask 0f csum
/// ```
///
/// The write mask selects color channels (0xf0 masks whites out),
/// white channels (0x0f masks colors out), or both (0x00). Devices
/// that cannot address the two independently always write both.
pub fn set_channels(
    variant: ProtocolVariant,
    caps: Capabilities,
    write: &ChannelWrite,
) -> Result<Vec<u8>, ProtocolError> {
    if write.has_color() && write.has_white() && !caps.rgbw_capable {
        return Err(ProtocolError::RgbwNotSupported);
    }

    let (mut red, mut green, mut blue) = (
        write.red.unwrap_or(0),
        write.green.unwrap_or(0),
        write.blue.unwrap_or(0),
    );
    if let Some(value) = write.brightness {
        (red, green, blue) = codec::scale_brightness((red, green, blue), value);
    }

    if variant == ProtocolVariant::LegacyOriginal {
        return Ok(vec![0x56, red, green, blue, 0xaa]);
    }

    let mut msg = vec![if write.persist { 0x31 } else { 0x41 }];
    msg.push(red);
    msg.push(green);
    msg.push(blue);
    msg.push(write.warm_white.unwrap_or(0));

    if caps.dual_white {
        // a single requested white level drives both outputs
        msg.push(write.cold_white.or(write.warm_white).unwrap_or(0));
    }

    let mut write_mask = 0x00;
    if !caps.rgbw_protocol {
        if !write.has_white() {
            write_mask |= 0xf0;
        } else if !write.has_color() {
            write_mask |= 0x0f;
        }
    }
    msg.push(write_mask);
    msg.push(0x0f);

    Ok(codec::with_checksum(msg))
}

/// Encodes a preset pattern command; the code must be in the known
/// preset range.
pub fn preset_pattern(
    variant: ProtocolVariant,
    code: u8,
    speed: u8,
) -> Result<Vec<u8>, ProtocolError> {
    if !PresetPattern::is_valid(code) {
        return Err(ProtocolError::InvalidPresetCode(code));
    }
    let msg = vec![0x61, code, codec::speed_to_delay(speed), 0x0f];
    Ok(frame(variant, msg))
}

/// Transition style between custom pattern colors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transition {
    #[default]
    Gradual,
    Jump,
    Strobe,
}

impl Transition {
    fn byte(&self) -> u8 {
        match self {
            Transition::Gradual => 0x3a,
            Transition::Jump => 0x3b,
            Transition::Strobe => 0x3c,
        }
    }

    /// Parses a transition name; unrecognized strings fall back to
    /// gradual.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "jump" => Transition::Jump,
            "strobe" => Transition::Strobe,
            _ => Transition::Gradual,
        }
    }
}

impl std::str::FromStr for Transition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Transition::parse(s))
    }
}

/// Encodes a custom pattern of 1-16 RGB colors.
///
/// An empty list is rejected; overflow is truncated. The first color
/// carries the 0x51 lead byte, the rest zero; unused slots are padded
/// with a fixed sentinel tuple.
pub fn custom_pattern(
    variant: ProtocolVariant,
    colors: &[(u8, u8, u8)],
    speed: u8,
    transition: Transition,
) -> Result<Vec<u8>, ProtocolError> {
    if colors.is_empty() {
        return Err(ProtocolError::EmptyColorList);
    }
    let colors = &colors[..colors.len().min(CUSTOM_PATTERN_MAX_COLORS)];

    let mut msg = Vec::with_capacity(CUSTOM_PATTERN_MAX_COLORS * 4 + 6);
    for (i, &(r, g, b)) in colors.iter().enumerate() {
        let lead = if i == 0 { 0x51 } else { 0x00 };
        msg.extend_from_slice(&[lead, r, g, b]);
    }
    for _ in colors.len()..CUSTOM_PATTERN_MAX_COLORS {
        msg.extend_from_slice(&CUSTOM_PATTERN_SENTINEL);
    }

    msg.push(0x00);
    msg.push(codec::speed_to_delay(speed));
    msg.push(transition.byte());
    msg.push(0xff);
    msg.push(0x0f);

    Ok(frame(variant, msg))
}

/// The timer batch query.
pub fn query_timers(variant: ProtocolVariant) -> Vec<u8> {
    frame(variant, vec![0x22, 0x2a, 0x2b, 0x0f])
}

/// Encodes the full six-slot timer write (1 header + 6x14 + 2 trailer
/// bytes before the checksum).
pub fn set_timers(variant: ProtocolVariant, slots: &[TimerSlot; TIMER_SLOT_COUNT]) -> Vec<u8> {
    let mut msg = vec![0x21];
    for slot in slots {
        msg.extend_from_slice(&slot.to_bytes());
    }
    msg.extend_from_slice(&[0x00, 0xf0]);
    frame(variant, msg)
}

/// The clock query.
pub fn query_clock(variant: ProtocolVariant) -> Vec<u8> {
    frame(variant, vec![0x11, 0x1a, 0x1b, 0x0f])
}

/// Encodes the clock set command carrying the given timestamp.
pub fn set_clock(variant: ProtocolVariant, now: NaiveDateTime) -> Vec<u8> {
    let msg = vec![
        0x10,
        0x14,
        (now.year() - 2000).clamp(0, 255) as u8,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
        now.weekday().number_from_monday() as u8,
        0x00,
        0x0f,
    ];
    frame(variant, msg)
}

/// Decodes a clock query response.
///
/// Bytes that do not form a valid calendar date are a decode error,
/// never a panic.
pub fn decode_clock(raw: &[u8]) -> Result<NaiveDateTime, ProtocolError> {
    if raw.len() < CLOCK_RESPONSE_LEN {
        return Err(ProtocolError::ShortResponse {
            expected: CLOCK_RESPONSE_LEN,
            got: raw.len(),
        });
    }
    let year = u16::from(raw[3]) + 2000;
    let (month, day) = (raw[4], raw[5]);
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|d| {
            d.and_hms_opt(u32::from(raw[6]), u32::from(raw[7]), u32::from(raw[8]))
        })
        .ok_or(ProtocolError::InvalidDate { year, month, day })
}
