//! Timer slot codec.
//!
//! Controllers store exactly six schedule slots, always read and
//! written as one batch. Each slot serializes to 14 bytes:
//!
//! ```text
//! pos  0: 0xf0 active / 0x0f inactive
//!      1: year - 2000 when scheduled once, else 0
//!      2: month               4: hour
//!      3: day of month        5: minute
//!      6: 0
//!      7: repeat mask, Mo=0x02 .. Su=0x80
//!      8: pattern code (0x61 solid color/warm white)
//!   9-11: action payload (rgb, or delay, or duration + brightness)
//!     12: warm white level
//!     13: 0xf0 turn on / 0x0f turn off
//! ```
//!
//! Bytes 9-11 carry different meanings per pattern code, so the action
//! is modeled as a tagged variant rather than overlapping fields.

use crate::codec;
use crate::error::ProtocolError;
use crate::pattern::{BuiltInEffect, PresetPattern};
use crate::{TIMER_BLOCK_LEN, TIMER_SLOT_COUNT, TIMER_SLOT_LEN};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Day-of-week repeat bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeatMask(u8);

impl RepeatMask {
    pub const MONDAY: RepeatMask = RepeatMask(0x02);
    pub const TUESDAY: RepeatMask = RepeatMask(0x04);
    pub const WEDNESDAY: RepeatMask = RepeatMask(0x08);
    pub const THURSDAY: RepeatMask = RepeatMask(0x10);
    pub const FRIDAY: RepeatMask = RepeatMask(0x20);
    pub const SATURDAY: RepeatMask = RepeatMask(0x40);
    pub const SUNDAY: RepeatMask = RepeatMask(0x80);
    pub const WEEKDAYS: RepeatMask = RepeatMask(0x02 | 0x04 | 0x08 | 0x10 | 0x20);
    pub const WEEKEND: RepeatMask = RepeatMask(0x40 | 0x80);
    pub const EVERYDAY: RepeatMask = RepeatMask(0xfe);

    pub fn none() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, day: RepeatMask) -> bool {
        self.0 & day.0 != 0
    }
}

impl std::ops::BitOr for RepeatMask {
    type Output = RepeatMask;
    fn bitor(self, rhs: RepeatMask) -> RepeatMask {
        RepeatMask(self.0 | rhs.0)
    }
}

impl fmt::Display for RepeatMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DAYS: [(RepeatMask, &str); 7] = [
            (RepeatMask::MONDAY, "Mo"),
            (RepeatMask::TUESDAY, "Tu"),
            (RepeatMask::WEDNESDAY, "We"),
            (RepeatMask::THURSDAY, "Th"),
            (RepeatMask::FRIDAY, "Fr"),
            (RepeatMask::SATURDAY, "Sa"),
            (RepeatMask::SUNDAY, "Su"),
        ];
        for (day, name) in DAYS {
            if self.contains(day) {
                write!(f, "{name}")?;
            } else {
                write!(f, "--")?;
            }
        }
        Ok(())
    }
}

/// What the timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Turn the device off.
    Off,
    /// Turn on without changing the current mode.
    Default,
    /// Turn on to a solid color.
    Color { red: u8, green: u8, blue: u8 },
    /// Turn on to warm white at the given level (nonzero byte).
    WarmWhite { level: u8 },
    /// Turn on to a preset pattern.
    Preset { code: u8, delay: u8 },
    /// Run a built-in sunrise/sunset ramp over `duration` minutes.
    Effect {
        kind: BuiltInEffect,
        duration: u8,
        brightness_start: u8,
        brightness_end: u8,
    },
}

/// One of the six schedule slots.
///
/// The concrete date and the repeat mask are mutually exclusive:
/// setting one clears the other, so both can never be nonzero at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    active: bool,
    year: u16,
    month: u8,
    day: u8,
    repeat: RepeatMask,
    hour: u8,
    minute: u8,
    action: TimerAction,
}

impl TimerSlot {
    /// A fresh slot: one hour from `now`, inactive, turn-off action.
    pub fn new(now: NaiveDateTime) -> Self {
        let when = now + Duration::hours(1);
        let mut slot = Self::inactive();
        slot.set_time(when.hour() as u8, when.minute() as u8);
        slot.set_date(when.year() as u16, when.month() as u8, when.day() as u8);
        slot
    }

    /// The canonical inactive representative every inactive slot
    /// decodes to.
    pub fn inactive() -> Self {
        Self {
            active: false,
            year: 2000,
            month: 0,
            day: 0,
            repeat: RepeatMask::none(),
            hour: 0,
            minute: 0,
            action: TimerAction::Off,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn action(&self) -> TimerAction {
        self.action
    }

    pub fn set_action(&mut self, action: TimerAction) {
        self.action = action;
    }

    pub fn time(&self) -> (u8, u8) {
        (self.hour, self.minute)
    }

    pub fn set_time(&mut self, hour: u8, minute: u8) {
        self.hour = hour;
        self.minute = minute;
    }

    /// The concrete date, when scheduled once.
    pub fn date(&self) -> Option<(u16, u8, u8)> {
        (self.month != 0 && self.day != 0).then_some((self.year, self.month, self.day))
    }

    /// Schedules the slot for a concrete date, clearing the repeat mask.
    pub fn set_date(&mut self, year: u16, month: u8, day: u8) {
        self.year = year;
        self.month = month;
        self.day = day;
        self.repeat = RepeatMask::none();
    }

    pub fn repeat(&self) -> RepeatMask {
        self.repeat
    }

    /// Schedules the slot on a weekly repeat, clearing the date.
    pub fn set_repeat(&mut self, repeat: RepeatMask) {
        self.year = 2000;
        self.month = 0;
        self.day = 0;
        self.repeat = repeat;
    }

    /// A one-shot slot whose date-time lies strictly in the past is
    /// expired; a repeating slot never is.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        if !self.repeat.is_empty() {
            return false;
        }
        let Some((year, month, day)) = self.date() else {
            return false;
        };
        match NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .and_then(|d| d.and_hms_opt(u32::from(self.hour), u32::from(self.minute), 0))
        {
            Some(when) => when < now,
            None => false,
        }
    }

    /// Serializes the slot to its 14-byte wire form.
    pub fn to_bytes(&self) -> [u8; TIMER_SLOT_LEN] {
        let mut buf = [0u8; TIMER_SLOT_LEN];
        if !self.active {
            buf[0] = 0x0f;
            // everything else stays zero for an inactive slot
            return buf;
        }

        buf[0] = 0xf0;
        buf[1] = if self.year >= 2000 {
            (self.year - 2000) as u8
        } else {
            self.year as u8
        };
        buf[2] = self.month;
        buf[3] = self.day;
        buf[4] = self.hour;
        buf[5] = self.minute;
        buf[7] = self.repeat.bits();

        if self.action == TimerAction::Off {
            buf[13] = 0x0f;
            return buf;
        }
        buf[13] = 0xf0;

        match self.action {
            TimerAction::Off => unreachable!(),
            TimerAction::Default => {}
            TimerAction::Color { red, green, blue } => {
                buf[8] = 0x61;
                buf[9] = red;
                buf[10] = green;
                buf[11] = blue;
            }
            TimerAction::WarmWhite { level } => {
                buf[8] = 0x61;
                buf[12] = level;
            }
            TimerAction::Preset { code, delay } => {
                buf[8] = code;
                buf[9] = delay;
            }
            TimerAction::Effect {
                kind,
                duration,
                brightness_start,
                brightness_end,
            } => {
                buf[8] = kind.code();
                buf[9] = duration;
                buf[10] = brightness_start;
                buf[11] = brightness_end;
                buf[12] = brightness_end;
            }
        }
        buf
    }

    /// Reconstructs a slot from a 14-byte slice.
    ///
    /// Any inactive slot decodes to the canonical inactive
    /// representative, whatever its other bytes hold.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < TIMER_SLOT_LEN {
            return Err(ProtocolError::ShortResponse {
                expected: TIMER_SLOT_LEN,
                got: raw.len(),
            });
        }
        if raw[0] != 0xf0 {
            return Ok(Self::inactive());
        }

        let mut slot = Self::inactive();
        slot.active = true;
        slot.hour = raw[4];
        slot.minute = raw[5];
        if raw[7] != 0 {
            slot.set_repeat(RepeatMask::from_bits(raw[7]));
        } else {
            slot.set_date(u16::from(raw[1]) + 2000, raw[2], raw[3]);
        }

        if raw[13] != 0xf0 {
            slot.action = TimerAction::Off;
            return Ok(slot);
        }

        let pattern = raw[8];
        slot.action = match pattern {
            0x00 | 0x61 if raw[12] != 0 => TimerAction::WarmWhite { level: raw[12] },
            0x00 => TimerAction::Default,
            0x61 => TimerAction::Color {
                red: raw[9],
                green: raw[10],
                blue: raw[11],
            },
            code if PresetPattern::is_valid(code) => TimerAction::Preset {
                code,
                delay: raw[9],
            },
            code => match BuiltInEffect::from_code(code) {
                Some(kind) => TimerAction::Effect {
                    kind,
                    duration: raw[9],
                    brightness_start: raw[10],
                    brightness_end: raw[11],
                },
                // unrecognized pattern codes fall back to default-on
                None => TimerAction::Default,
            },
        };
        Ok(slot)
    }
}

impl fmt::Display for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.active {
            return write!(f, "unset");
        }
        let state = if self.action == TimerAction::Off {
            "[OFF]"
        } else {
            "[ON ]"
        };
        write!(f, "{state} {:02}:{:02}  ", self.hour, self.minute)?;
        if let Some((year, month, day)) = self.date() {
            write!(f, "once {year:04}-{month:02}-{day:02}")?;
        } else {
            write!(f, "{}", self.repeat)?;
        }
        match self.action {
            TimerAction::Off | TimerAction::Default => Ok(()),
            TimerAction::Color { red, green, blue } => {
                write!(f, "  color ({red},{green},{blue})")
            }
            TimerAction::WarmWhite { level } => {
                write!(f, "  warm white {}%", codec::byte_to_percent(level))
            }
            TimerAction::Preset { code, delay } => write!(
                f,
                "  {} (speed {}%)",
                PresetPattern::name(code).unwrap_or("preset"),
                codec::delay_to_speed(delay)
            ),
            TimerAction::Effect {
                kind,
                duration,
                brightness_start,
                brightness_end,
            } => write!(
                f,
                "  {} ({duration} min, {}% -> {}%)",
                kind.name(),
                codec::byte_to_percent(brightness_start),
                codec::byte_to_percent(brightness_end)
            ),
        }
    }
}

/// Decodes the 88-byte timer query response into its six slots.
///
/// Slots sit at offset 2 behind a 2-byte header; the 2 trailer bytes
/// are not interpreted.
pub fn decode_timer_block(raw: &[u8]) -> Result<[TimerSlot; TIMER_SLOT_COUNT], ProtocolError> {
    if raw.len() < TIMER_BLOCK_LEN {
        return Err(ProtocolError::ShortResponse {
            expected: TIMER_BLOCK_LEN,
            got: raw.len(),
        });
    }
    let mut slots = [TimerSlot::inactive(); TIMER_SLOT_COUNT];
    for (i, slot) in slots.iter_mut().enumerate() {
        let start = 2 + i * TIMER_SLOT_LEN;
        *slot = TimerSlot::from_bytes(&raw[start..start + TIMER_SLOT_LEN])?;
    }
    Ok(slots)
}

/// Prepares a caller-supplied timer list for transmission: drops
/// inactive and expired entries, keeps the first six survivors, and
/// pads the remainder with fresh inactive slots.
pub fn prepare_timer_batch(
    slots: &[TimerSlot],
    now: NaiveDateTime,
) -> [TimerSlot; TIMER_SLOT_COUNT] {
    let mut batch = [TimerSlot::new(now); TIMER_SLOT_COUNT];
    let mut n = 0;
    for slot in slots {
        if n == TIMER_SLOT_COUNT {
            break;
        }
        if slot.is_active() && !slot.is_expired(now) {
            batch[n] = *slot;
            n += 1;
        }
    }
    batch
}
