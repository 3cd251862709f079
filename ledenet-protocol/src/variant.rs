//! Protocol variant facts.
//!
//! Two mutually incompatible firmware dialects are known. The variant
//! is established once per session by probing (see the client crate)
//! and then drives response lengths, checksum use, and command
//! framing. Within the standard dialect, the state sub-type byte
//! further refines per-device capabilities.

use crate::codec;

/// A firmware command/response dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVariant {
    /// The original dialect: 11-byte state frames, no checksums.
    LegacyOriginal,
    /// The current dialect: 14-byte state frames, additive checksums.
    Standard,
}

impl ProtocolVariant {
    /// Legacy probe bytes; the detector falls back to these when the
    /// standard state query goes unanswered.
    pub const LEGACY_PROBE: [u8; 3] = [0xef, 0x01, 0x77];

    /// Expected state response length for this dialect.
    pub fn state_response_len(&self) -> usize {
        match self {
            ProtocolVariant::LegacyOriginal => crate::STATE_RESPONSE_LEN_LEGACY,
            ProtocolVariant::Standard => crate::STATE_RESPONSE_LEN_STANDARD,
        }
    }

    /// Whether commands carry a trailing additive checksum.
    pub fn uses_checksum(&self) -> bool {
        matches!(self, ProtocolVariant::Standard)
    }

    /// The framed "get state" query for this dialect.
    pub fn state_query(&self) -> Vec<u8> {
        match self {
            ProtocolVariant::LegacyOriginal => Self::LEGACY_PROBE.to_vec(),
            ProtocolVariant::Standard => codec::with_checksum(vec![0x81, 0x8a, 0x8b]),
        }
    }
}

/// Per-device capabilities, refined from the state sub-type byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Device actually supports RGBW output.
    pub rgbw_capable: bool,
    /// Device cannot address color and white channels independently;
    /// every channel write updates both regardless of the mask.
    pub rgbw_protocol: bool,
    /// 5-channel device with a separate cold-white byte in channel
    /// writes and state frames.
    pub dual_white: bool,
}

impl Capabilities {
    /// Derives capability flags from the state response sub-type byte.
    pub fn from_subtype(subtype: u8) -> Self {
        Self {
            rgbw_protocol: matches!(subtype, 0x04 | 0x33 | 0x81),
            rgbw_capable: matches!(subtype, 0x04 | 0x25 | 0x33 | 0x81 | 0x44),
            dual_white: matches!(subtype, 0x25 | 0x27 | 0x35 | 0xa1),
        }
    }
}
