//! Client error types.

use ledenet_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by device")]
    ConnectionClosed,

    #[error("operation timed out")]
    Timeout,

    #[error("discovery failed: {0}")]
    Discovery(String),
}

impl ClientError {
    /// Returns whether this error is worth a reconnect-and-retry.
    ///
    /// Validation errors are deterministic caller mistakes and are
    /// never retried; short reads and checksum mismatches may be
    /// transient device hiccups.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::Protocol(err) => !err.is_validation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(ClientError::Io(std::io::Error::other("boom")).is_retryable());

        assert!(ClientError::Protocol(ProtocolError::ShortResponse {
            expected: 14,
            got: 2
        })
        .is_retryable());
        assert!(!ClientError::Protocol(ProtocolError::RgbwNotSupported).is_retryable());
        assert!(!ClientError::NotConnected.is_retryable());
    }
}
