//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding commands or decoding device responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("short response: expected {expected} bytes, got {got}")]
    ShortResponse { expected: usize, got: usize },

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("invalid preset pattern code: {0:#04x}")]
    InvalidPresetCode(u8),

    #[error("RGBW command sent to non-RGBW device")]
    RgbwNotSupported,

    #[error("custom pattern requires at least one color")]
    EmptyColorList,

    #[error("invalid calendar date: {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: u16, month: u8, day: u8 },
}

impl ProtocolError {
    /// Returns whether this error is a deterministic caller mistake.
    ///
    /// Validation errors are never retried; transport-shaped errors
    /// (short reads, checksum mismatches) may be.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidPresetCode(_)
                | ProtocolError::RgbwNotSupported
                | ProtocolError::EmptyColorList
        )
    }
}
