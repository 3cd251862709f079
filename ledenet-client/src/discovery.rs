//! UDP discovery.
//!
//! Controllers answer an ASCII broadcast on port 48899 with a single
//! comma-separated line: `ip,hardware-id,model`. The scan rebroadcasts
//! on every idle receive slice until the deadline, deduplicating
//! answers by hardware id.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// UDP discovery port.
pub const DISCOVERY_PORT: u16 = 48899;

/// The discovery request line.
pub const DISCOVERY_REQUEST: &[u8] = b"HF-A11ASSISTHREAD";

/// Receive slice between rebroadcasts.
const RECV_SLICE: Duration = Duration::from_secs(1);

/// One discovered controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBulb {
    /// IPv4 address as reported by the controller itself.
    pub ip: String,
    /// Hardware id (MAC without separators).
    pub id: String,
    /// Model string.
    pub model: String,
}

/// Parses one response line. Lines with fewer than three fields are
/// malformed and discarded.
fn parse_response(line: &str) -> Option<DiscoveredBulb> {
    let mut fields = line.trim().split(',');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(ip), Some(id), Some(model)) if !ip.is_empty() => Some(DiscoveredBulb {
            ip: ip.to_string(),
            id: id.to_string(),
            model: model.to_string(),
        }),
        _ => {
            tracing::warn!(line, "malformed discovery response");
            None
        }
    }
}

/// Broadcasts a discovery request and collects answers until `timeout`
/// elapses.
pub async fn scan(timeout: Duration) -> Result<Vec<DiscoveredBulb>, ClientError> {
    let socket = UdpSocket::bind(("0.0.0.0", DISCOVERY_PORT)).await?;
    socket.set_broadcast(true)?;
    scan_with(&socket, ("255.255.255.255", DISCOVERY_PORT), timeout).await
}

/// Scan loop against an already-bound socket; split out so tests can
/// drive it against a loopback peer.
pub async fn scan_with(
    socket: &UdpSocket,
    target: (&str, u16),
    timeout: Duration,
) -> Result<Vec<DiscoveredBulb>, ClientError> {
    socket.send_to(DISCOVERY_REQUEST, target).await?;
    tracing::debug!(port = target.1, "discovery request broadcast");

    let deadline = Instant::now() + timeout;
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut buf = [0u8; 256];

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let slice = RECV_SLICE.min(deadline - now);

        match tokio::time::timeout(slice, socket.recv_from(&mut buf)).await {
            // idle slice: nudge controllers that missed the first request
            Err(_) => {
                socket.send_to(DISCOVERY_REQUEST, target).await?;
            }
            Ok(Ok((len, peer))) => {
                let data = &buf[..len];
                // our own broadcast echoed back
                if data == DISCOVERY_REQUEST {
                    continue;
                }
                let line = String::from_utf8_lossy(data);
                if let Some(bulb) = parse_response(&line) {
                    if seen.insert(bulb.id.clone()) {
                        tracing::debug!(ip = %bulb.ip, id = %bulb.id, %peer, "controller found");
                        found.push(bulb);
                    }
                }
            }
            Ok(Err(e)) => return Err(ClientError::Io(e)),
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let bulb = parse_response("192.168.0.54,ACCF235FFFFF,HF-LPB100-ZJ200\n").unwrap();
        assert_eq!(bulb.ip, "192.168.0.54");
        assert_eq!(bulb.id, "ACCF235FFFFF");
        assert_eq!(bulb.model, "HF-LPB100-ZJ200");
    }

    #[test]
    fn test_parse_response_rejects_short_lines() {
        assert!(parse_response("192.168.0.54,ACCF235FFFFF").is_none());
        assert!(parse_response("").is_none());
        assert!(parse_response(",,model").is_none());
    }

    #[test]
    fn test_discovered_bulb_serializes() {
        let bulb = DiscoveredBulb {
            ip: "10.0.0.7".into(),
            id: "ACCF23000001".into(),
            model: "AK001-ZJ100".into(),
        };
        let json = serde_json::to_string(&bulb).unwrap();
        assert!(json.contains("\"ip\":\"10.0.0.7\""));
        let back: DiscoveredBulb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bulb);
    }

    #[tokio::test]
    async fn test_scan_collects_and_dedupes() {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_addr = device.local_addr().unwrap();
        let scanner = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, peer) = device.recv_from(&mut buf).await.unwrap();
            for _ in 0..2 {
                device
                    .send_to(b"192.168.0.54,ACCF235FFFFF,HF-LPB100-ZJ200", peer)
                    .await
                    .unwrap();
            }
        });

        let found = scan_with(
            &scanner,
            ("127.0.0.1", device_addr.port()),
            Duration::from_millis(600),
        )
        .await
        .unwrap();

        responder.await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, "192.168.0.54");
    }
}
