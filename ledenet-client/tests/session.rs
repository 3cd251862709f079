//! End-to-end session tests against a scripted in-process device.
//!
//! The mock accepts one TCP connection per script and replays exact
//! request/response exchanges, so these tests cover dialect detection,
//! state refresh, retry-with-reconnect, and the timer read path over a
//! real socket.

use ledenet_client::{Bulb, ClientError, ConnectionConfig};
use ledenet_protocol::timer::TimerAction;
use ledenet_protocol::{DeviceMode, ProtocolError, ProtocolVariant};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Standard state query as framed on the wire.
const STD_QUERY: [u8; 4] = [0x81, 0x8a, 0x8b, 0x96];
/// Legacy detection probe.
const LEGACY_PROBE: [u8; 3] = [0xef, 0x01, 0x77];

/// 5-channel controller in color mode, powered on.
const STD_FRAME: [u8; 14] = [
    0x81, 0x25, 0x23, 0x61, 0x21, 0x06, 0x38, 0x05, 0x06, 0xf9, 0x01, 0x00, 0x0f, 0x9d,
];

/// Legacy controller running preset 0x25.
const LEGACY_FRAME: [u8; 11] = [
    0x66, 0x01, 0x23, 0x25, 0x21, 0x10, 0xff, 0x00, 0x00, 0x00, 0x99,
];

/// RGBW-protocol controller (sub-type 0x81) in color mode, powered on.
const RGBW_FRAME: [u8; 14] = [
    0x81, 0x81, 0x23, 0x61, 0x21, 0x06, 0x38, 0x05, 0x06, 0xf9, 0x01, 0x00, 0x0f, 0xf9,
];

/// Dual-white controller (sub-type 0x35) without an RGBW write path.
const DUAL_WHITE_FRAME: [u8; 14] = [
    0x81, 0x35, 0x23, 0x61, 0x21, 0x06, 0x38, 0x05, 0x06, 0xf9, 0x01, 0x00, 0x0f, 0xad,
];

/// Timer read command as framed on the wire.
const TIMERS_QUERY: [u8; 5] = [0x22, 0x2a, 0x2b, 0x0f, 0x86];

/// 88-byte timer block: one active color timer, five empty slots.
fn timer_block() -> Vec<u8> {
    let mut block = vec![0x0f, 0x22];
    block.extend_from_slice(&[
        0xf0, 26, 8, 26, 6, 30, 0x00, 0x00, 0x61, 0xff, 0x00, 0x00, 0x00, 0xf0,
    ]);
    for _ in 0..5 {
        let mut slot = [0u8; 14];
        slot[0] = 0x0f;
        block.extend_from_slice(&slot);
    }
    block.extend_from_slice(&[0x00, 0xf0]);
    assert_eq!(block.len(), 88);
    block
}

type Exchange = (Vec<u8>, Vec<u8>);

/// Spawns a scripted device. Each inner vec is one accepted
/// connection's exact sequence of (expected request, reply) pairs; an
/// empty reply means the device stays silent.
async fn spawn_device(scripts: Vec<Vec<Exchange>>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        for script in scripts {
            let (mut stream, _) = listener.accept().await.unwrap();
            for (expect, reply) in script {
                let mut buf = vec![0u8; expect.len()];
                stream.read_exact(&mut buf).await.unwrap();
                assert_eq!(buf, expect, "unexpected command bytes");
                if !reply.is_empty() {
                    stream.write_all(&reply).await.unwrap();
                }
            }
            // Hold the connection open until the client hangs up, so a
            // silent script reads as a quiet device rather than a
            // dropped one.
            let _ = stream.read(&mut [0u8; 16]).await;
        }
    });
    (addr, handle)
}

fn fast_config(addr: SocketAddr) -> ConnectionConfig {
    ConnectionConfig::new(addr)
        .with_response_timeout(Duration::from_secs(2))
        .with_poll_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn standard_session_detects_and_snapshots() {
    let (addr, device) = spawn_device(vec![vec![
        // detection consumes one full state response
        (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
        // the initial refresh queries again
        (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    bulb.connect().await.unwrap();

    assert_eq!(bulb.variant(), Some(ProtocolVariant::Standard));
    assert!(bulb.is_on());
    assert_eq!(bulb.mode(), Some(DeviceMode::Color));
    assert_eq!(bulb.rgb(), Some((0x38, 0x05, 0x06)));
    assert_eq!(bulb.warm_white(), Some(0xf9));
    assert!(bulb.capabilities().dual_white);

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn legacy_session_detected_via_fallback_probe() {
    let (addr, device) = spawn_device(vec![vec![
        // silence on the standard query pushes the detector to the probe
        (STD_QUERY.to_vec(), vec![]),
        (LEGACY_PROBE.to_vec(), LEGACY_FRAME.to_vec()),
        // legacy state refresh reuses the probe as its query
        (LEGACY_PROBE.to_vec(), LEGACY_FRAME.to_vec()),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    bulb.connect().await.unwrap();

    assert_eq!(bulb.variant(), Some(ProtocolVariant::LegacyOriginal));
    assert!(bulb.is_on());
    assert_eq!(bulb.mode(), Some(DeviceMode::Preset));
    assert_eq!(bulb.rgb(), Some((0xff, 0x00, 0x00)));

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn power_command_reaches_the_wire() {
    let (addr, device) = spawn_device(vec![vec![
        (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
        // power-on frame with its checksum
        (vec![0x71, 0x23, 0x0f, 0xa3], vec![]),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    bulb.turn_on().await.unwrap();
    assert!(bulb.is_on());

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn corrupt_response_is_retried_on_a_fresh_connection() {
    let mut corrupt = STD_FRAME.to_vec();
    corrupt[13] ^= 0xff;

    let (addr, device) = spawn_device(vec![
        vec![
            (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
            (STD_QUERY.to_vec(), corrupt),
        ],
        // the retry reconnects and gets a clean answer
        vec![(STD_QUERY.to_vec(), STD_FRAME.to_vec())],
    ])
    .await;

    let bulb = Bulb::new(fast_config(addr).with_retries(1));
    bulb.connect().await.unwrap();
    assert!(bulb.is_on());

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn unresolved_detection_surfaces_a_short_read() {
    let (addr, device) = spawn_device(vec![vec![
        (STD_QUERY.to_vec(), vec![]),
        (LEGACY_PROBE.to_vec(), vec![]),
        // detector gave up; the query goes out under assumed standard
        // framing and times out
        (STD_QUERY.to_vec(), vec![]),
    ]])
    .await;

    let bulb = Bulb::new(
        fast_config(addr)
            .with_response_timeout(Duration::from_millis(100))
            .with_retries(0),
    );
    let err = bulb.update_state().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::ShortResponse { expected: 14, got: 0 })
    ));
    // nothing was pinned; the next operation will probe again
    assert_eq!(bulb.variant(), None);

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn fresh_session_rgbw_write_reaches_rgbw_device() {
    let (addr, device) = spawn_device(vec![vec![
        // detection decodes the state frame and learns the device is RGBW
        (STD_QUERY.to_vec(), RGBW_FRAME.to_vec()),
        // the write goes through with the RGBW channel mask
        (vec![0x31, 0xff, 0x00, 0x00, 0x80, 0x00, 0x0f, 0xbf], vec![]),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    bulb.set_rgbw(255, 0, 0, 128).await.unwrap();
    assert!(bulb.capabilities().rgbw_capable);

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn rgbw_guard_rejects_once_capabilities_known() {
    let (addr, device) = spawn_device(vec![vec![
        (STD_QUERY.to_vec(), DUAL_WHITE_FRAME.to_vec()),
        (STD_QUERY.to_vec(), DUAL_WHITE_FRAME.to_vec()),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    bulb.connect().await.unwrap();
    assert!(!bulb.capabilities().rgbw_capable);

    // rejected before anything hits the wire; the script has no write
    let err = bulb.set_rgbw(255, 0, 0, 128).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::RgbwNotSupported)
    ));

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn dropped_connection_command_is_retried() {
    let (addr, device) = spawn_device(vec![
        // first connection answers detection, then goes quiet on the
        // timer read until the client's deadline lapses
        vec![
            (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
            (TIMERS_QUERY.to_vec(), vec![]),
        ],
        // the retry reconnects and reads the full block
        vec![(TIMERS_QUERY.to_vec(), timer_block())],
    ])
    .await;

    let bulb = Bulb::new(
        fast_config(addr)
            .with_response_timeout(Duration::from_millis(300))
            .with_retries(1),
    );
    let timers = bulb.timers().await.unwrap();
    assert!(timers[0].is_active());

    bulb.close().await;
    device.await.unwrap();
}

#[tokio::test]
async fn timer_block_read_and_decode() {
    let (addr, device) = spawn_device(vec![vec![
        (STD_QUERY.to_vec(), STD_FRAME.to_vec()),
        (TIMERS_QUERY.to_vec(), timer_block()),
    ]])
    .await;

    let bulb = Bulb::new(fast_config(addr));
    let timers = bulb.timers().await.unwrap();

    assert!(timers[0].is_active());
    assert_eq!(timers[0].time(), (6, 30));
    assert_eq!(timers[0].date(), Some((2026, 8, 26)));
    assert_eq!(
        timers[0].action(),
        TimerAction::Color {
            red: 0xff,
            green: 0x00,
            blue: 0x00
        }
    );
    assert!(timers[1..].iter().all(|t| !t.is_active()));

    bulb.close().await;
    device.await.unwrap();
}
