//! # ledenet-client
//!
//! Async client for Magic Home / LEDENET networked LED controllers.
//!
//! A [`Bulb`] owns one TCP connection to one controller, detects which
//! firmware dialect it speaks, and exposes the command surface (power,
//! color and white channels, preset and custom patterns, timers,
//! clock). [`discovery`] finds controllers on the local network via
//! UDP broadcast.

pub mod bulb;
pub mod connection;
pub mod discovery;
pub mod error;

pub use bulb::Bulb;
pub use connection::{Connection, ConnectionConfig};
pub use discovery::{scan, DiscoveredBulb};
pub use error::ClientError;
