//! Connection management.
//!
//! One [`Connection`] exclusively owns the TCP transport to one
//! controller. Reads are deadline-bounded: short polling slices are
//! accumulated against a single wall-clock deadline, so a response
//! trickling in byte by byte is still assembled, while total time is
//! bounded by the response timeout rather than the per-slice wait.

use crate::error::ClientError;
use bytes::BytesMut;
use ledenet_protocol::ProtocolError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default overall response timeout.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-attempt polling slice while assembling a response.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default retry budget for transient I/O failures.
pub const DEFAULT_RETRIES: u32 = 2;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Controller address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Overall deadline for assembling one response.
    pub response_timeout: Duration,
    /// Bounded wait per read attempt.
    pub poll_interval: Duration,
    /// Reconnect-and-retry budget for transient failures.
    pub retries: u32,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retries: DEFAULT_RETRIES,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// An exclusively owned transport to one controller.
pub struct Connection {
    config: ConnectionConfig,
    stream: Option<TcpStream>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the transport, replacing any existing one.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.close().await;
        tracing::debug!("connecting to {}", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(ClientError::Io)?;

        stream.set_nodelay(true).ok();
        self.stream = Some(stream);
        Ok(())
    }

    /// Closes the transport.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Writes one complete command frame.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        tracing::debug!(frame = %hex::encode(frame), "sending command");
        stream.write_all(frame).await.map_err(ClientError::Io)
    }

    /// Reads exactly `len` bytes within the response deadline.
    ///
    /// On deadline expiry the partial buffer is discarded and a short
    /// response error is returned; the caller decides whether to
    /// retry.
    pub async fn read_exact_deadline(&mut self, len: usize) -> Result<Vec<u8>, ClientError> {
        let deadline = Instant::now() + self.config.response_timeout;
        let buf = self.read_until(len, deadline).await?;
        if buf.len() < len {
            tracing::debug!(
                expected = len,
                got = buf.len(),
                "response deadline elapsed, discarding partial"
            );
            return Err(ClientError::Protocol(ProtocolError::ShortResponse {
                expected: len,
                got: buf.len(),
            }));
        }
        tracing::debug!(frame = %hex::encode(&buf), "received response");
        Ok(buf)
    }

    /// Best-effort probe read: returns whatever arrived within `wait`,
    /// possibly nothing. Used by the variant detector.
    pub async fn read_some(&mut self, max: usize, wait: Duration) -> Result<Vec<u8>, ClientError> {
        let deadline = Instant::now() + wait;
        let buf = self.read_until(max, deadline).await?;
        tracing::debug!(frame = %hex::encode(&buf), "probe read");
        Ok(buf)
    }

    /// Accumulates up to `max` bytes in polling slices until the
    /// deadline. Returns early once `max` bytes arrived.
    async fn read_until(&mut self, max: usize, deadline: Instant) -> Result<Vec<u8>, ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let mut buf = BytesMut::with_capacity(max);
        let mut chunk = vec![0u8; max];

        while buf.len() < max {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let slice = self.config.poll_interval.min(deadline - now);
            let want = max - buf.len();

            match tokio::time::timeout(slice, stream.read(&mut chunk[..want])).await {
                // slice elapsed with no data; keep polling until the deadline
                Err(_) => continue,
                Ok(Ok(0)) => return Err(ClientError::ConnectionClosed),
                Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(ClientError::Io(e)),
            }
        }
        Ok(buf.to_vec())
    }
}
