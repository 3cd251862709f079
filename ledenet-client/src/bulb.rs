//! Controller sessions.
//!
//! A [`Bulb`] is one session with one controller: an exclusively held
//! [`Connection`] plus a cached snapshot of the device's state. The
//! firmware dialect is detected lazily on the first operation that
//! needs it and then pinned for the session's lifetime.
//!
//! Commands validate their arguments against the session's known
//! capabilities before touching the transport; a fresh session defers
//! capability checks until detection has decoded a real state
//! response. Transient failures run one bounded reconnect-and-retry
//! cycle per command.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use chrono::NaiveDateTime;
use ledenet_protocol::command::{self, ChannelWrite, Transition};
use ledenet_protocol::state::DeviceMode;
use ledenet_protocol::timer::{self, TimerSlot};
use ledenet_protocol::{
    codec, Capabilities, DeviceState, PresetPattern, ProtocolError, ProtocolVariant,
    CLOCK_RESPONSE_LEN, TIMER_BLOCK_LEN, TIMER_SLOT_COUNT,
};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::sync::Mutex;

/// Window the detector waits for probe bytes.
const PROBE_WAIT: Duration = Duration::from_millis(500);

/// Window for draining best-effort acknowledgement bytes.
const ACK_WAIT: Duration = Duration::from_millis(500);

/// Session facts established by detection and state queries.
#[derive(Default)]
struct Session {
    variant: Option<ProtocolVariant>,
    capabilities: Capabilities,
    status: Option<DeviceState>,
}

/// A session with one LED controller.
///
/// Commands serialize on the connection lock, so a write-then-read
/// exchange is never interleaved with another command's bytes. The
/// state snapshot is read without taking that lock.
pub struct Bulb {
    connection: Mutex<Connection>,
    session: RwLock<Session>,
}

impl Bulb {
    /// Creates a session. No connection is opened until the first
    /// operation needs one.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            connection: Mutex::new(Connection::new(config)),
            session: RwLock::new(Session::default()),
        }
    }

    /// Opens the connection, detects the dialect, and takes an initial
    /// state snapshot.
    pub async fn connect(&self) -> Result<(), ClientError> {
        {
            let mut conn = self.connection.lock().await;
            conn.connect().await?;
            self.ensure_variant(&mut conn).await?;
        }
        self.update_state().await
    }

    /// Closes the connection. The snapshot and detected variant are
    /// kept.
    pub async fn close(&self) {
        self.connection.lock().await.close().await;
    }

    // ---- session facts -------------------------------------------------

    /// The detected dialect, if detection has run.
    pub fn variant(&self) -> Option<ProtocolVariant> {
        self.session.read().variant
    }

    pub fn capabilities(&self) -> Capabilities {
        self.session.read().capabilities
    }

    /// The last decoded state snapshot.
    pub fn state(&self) -> Option<DeviceState> {
        self.session.read().status.clone()
    }

    pub fn is_on(&self) -> bool {
        self.session
            .read()
            .status
            .as_ref()
            .is_some_and(|s| s.power_on)
    }

    pub fn mode(&self) -> Option<DeviceMode> {
        self.session.read().status.as_ref().map(|s| s.mode)
    }

    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        self.session.read().status.as_ref().map(|s| s.rgb())
    }

    pub fn rgbw(&self) -> Option<(u8, u8, u8, u8)> {
        self.session
            .read()
            .status
            .as_ref()
            .map(|s| (s.red, s.green, s.blue, s.warm_white))
    }

    pub fn warm_white(&self) -> Option<u8> {
        self.session.read().status.as_ref().map(|s| s.warm_white)
    }

    pub fn cold_white(&self) -> Option<u8> {
        self.session.read().status.as_ref().map(|s| s.cold_white)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.session.read().status.as_ref().map(|s| s.brightness())
    }

    pub fn speed(&self) -> Option<u8> {
        self.session.read().status.as_ref().map(|s| s.speed())
    }

    // ---- state refresh -------------------------------------------------

    /// Queries the device state and refreshes the snapshot.
    ///
    /// Transient failures are retried with a reconnect in between, up
    /// to the configured budget. A response that decodes to an unknown
    /// mode is re-queried once per remaining attempt and accepted as-is
    /// when the budget runs out. If every attempt fails on I/O the
    /// snapshot is marked powered off, since nothing more is known.
    pub async fn update_state(&self) -> Result<(), ClientError> {
        let mut conn = self.connection.lock().await;
        let retries = conn.config().retries;
        let mut last_err = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                tracing::debug!(attempt, "retrying state query");
                if let Err(err) = conn.connect().await {
                    tracing::debug!(error = %err, "reconnect failed");
                    last_err = Some(err);
                    continue;
                }
            }
            match self.query_state_once(&mut conn).await {
                Ok(state) => {
                    if state.mode == DeviceMode::Unknown && attempt < retries {
                        tracing::debug!(
                            pattern = state.pattern_code,
                            "unknown mode, re-querying"
                        );
                        continue;
                    }
                    let mut session = self.session.write();
                    session.capabilities = state.capabilities;
                    session.status = Some(state);
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    tracing::debug!(error = %err, "state query failed");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(status) = self.session.write().status.as_mut() {
            status.power_on = false;
        }
        Err(last_err.unwrap_or(ClientError::Timeout))
    }

    async fn query_state_once(&self, conn: &mut Connection) -> Result<DeviceState, ClientError> {
        if !conn.is_connected() {
            conn.connect().await?;
        }
        let variant = self.ensure_variant(conn).await?;
        conn.send(&variant.state_query()).await?;
        let raw = conn.read_exact_deadline(variant.state_response_len()).await?;
        let state = DeviceState::decode(&raw, variant)?;
        if let Some(refined) = state.refined_variant() {
            tracing::debug!(?refined, "downgrading dialect from state sub-type");
            self.session.write().variant = Some(refined);
        }
        Ok(state)
    }

    // ---- power ---------------------------------------------------------

    pub async fn turn_on(&self) -> Result<(), ClientError> {
        self.set_power(true).await
    }

    pub async fn turn_off(&self) -> Result<(), ClientError> {
        self.set_power(false).await
    }

    async fn set_power(&self, on: bool) -> Result<(), ClientError> {
        self.exchange(|variant, _| Ok(command::power(variant, on)), 0, false)
            .await?;
        if let Some(status) = self.session.write().status.as_mut() {
            status.power_on = on;
        }
        Ok(())
    }

    // ---- channels ------------------------------------------------------

    /// Writes color and/or white channels.
    pub async fn set_channels(&self, write: ChannelWrite) -> Result<(), ClientError> {
        // Pre-validate only once real capabilities are known; a fresh
        // session cannot tell an RGBW device apart yet and defers to
        // the post-detection encode inside the exchange.
        if let Some(caps) = self.known_capabilities() {
            command::set_channels(ProtocolVariant::Standard, caps, &write)?;
        }
        self.exchange(
            |variant, caps| command::set_channels(variant, caps, &write),
            0,
            false,
        )
        .await?;
        Ok(())
    }

    pub async fn set_rgb(&self, red: u8, green: u8, blue: u8) -> Result<(), ClientError> {
        self.set_channels(ChannelWrite::rgb(red, green, blue)).await
    }

    pub async fn set_rgbw(
        &self,
        red: u8,
        green: u8,
        blue: u8,
        warm_white: u8,
    ) -> Result<(), ClientError> {
        let mut write = ChannelWrite::rgb(red, green, blue);
        write.warm_white = Some(warm_white);
        self.set_channels(write).await
    }

    /// Sets the warm-white channel from a 0-100 percentage.
    pub async fn set_warm_white(&self, percent: u8) -> Result<(), ClientError> {
        self.set_warm_white_255(codec::percent_to_byte(percent)).await
    }

    pub async fn set_warm_white_255(&self, level: u8) -> Result<(), ClientError> {
        self.set_channels(ChannelWrite::warm_white(level)).await
    }

    pub async fn set_cold_white_255(&self, level: u8) -> Result<(), ClientError> {
        self.set_channels(ChannelWrite::cold_white(level)).await
    }

    /// Approximates a color temperature on the warm/cold white pair.
    pub async fn set_white_temperature(
        &self,
        kelvin: u16,
        brightness: u8,
    ) -> Result<(), ClientError> {
        let (warm, cold) = codec::white_temperature(kelvin, brightness);
        self.set_channels(ChannelWrite::whites(warm, cold)).await
    }

    // ---- patterns ------------------------------------------------------

    /// Starts a built-in preset pattern at the given speed (0-100).
    pub async fn set_preset_pattern(&self, code: u8, speed: u8) -> Result<(), ClientError> {
        if !PresetPattern::is_valid(code) {
            return Err(ProtocolError::InvalidPresetCode(code).into());
        }
        self.exchange(
            |variant, _| command::preset_pattern(variant, code, speed),
            0,
            false,
        )
        .await?;
        Ok(())
    }

    /// Programs a custom pattern of up to 16 colors.
    pub async fn set_custom_pattern(
        &self,
        colors: &[(u8, u8, u8)],
        speed: u8,
        transition: Transition,
    ) -> Result<(), ClientError> {
        if colors.is_empty() {
            return Err(ProtocolError::EmptyColorList.into());
        }
        self.exchange(
            |variant, _| command::custom_pattern(variant, colors, speed, transition),
            0,
            false,
        )
        .await?;
        Ok(())
    }

    // ---- timers and clock ----------------------------------------------

    /// Reads the device's six timer slots.
    pub async fn timers(&self) -> Result<[TimerSlot; TIMER_SLOT_COUNT], ClientError> {
        let raw = self
            .exchange(
                |variant, _| Ok(command::query_timers(variant)),
                TIMER_BLOCK_LEN,
                false,
            )
            .await?;
        Ok(timer::decode_timer_block(&raw)?)
    }

    /// Writes a timer batch.
    ///
    /// Inactive and already-expired slots are dropped, the first six
    /// surviving entries are written in list order, and the rest of
    /// the block is padded with fresh inactive slots. The device
    /// answers with a short acknowledgement burst which is drained
    /// best-effort.
    pub async fn set_timers(&self, slots: &[TimerSlot]) -> Result<(), ClientError> {
        let now = chrono::Local::now().naive_local();
        let batch = timer::prepare_timer_batch(slots, now);
        self.exchange(
            |variant, _| Ok(command::set_timers(variant, &batch)),
            0,
            true,
        )
        .await?;
        Ok(())
    }

    /// Reads the device's wall clock. Responses carrying an impossible
    /// calendar date yield `None`.
    pub async fn clock(&self) -> Result<Option<NaiveDateTime>, ClientError> {
        let raw = self
            .exchange(
                |variant, _| Ok(command::query_clock(variant)),
                CLOCK_RESPONSE_LEN,
                false,
            )
            .await?;
        match command::decode_clock(&raw) {
            Ok(dt) => Ok(Some(dt)),
            Err(ProtocolError::InvalidDate { year, month, day }) => {
                tracing::debug!(year, month, day, "device clock is not a valid date");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Sets the device's wall clock.
    pub async fn set_clock(&self, now: NaiveDateTime) -> Result<(), ClientError> {
        self.exchange(|variant, _| Ok(command::set_clock(variant, now)), 0, false)
            .await?;
        Ok(())
    }

    // ---- transport and detection ---------------------------------------

    /// Capabilities decoded from a real state response, or `None` on a
    /// fresh session that has never heard from the device.
    fn known_capabilities(&self) -> Option<Capabilities> {
        let session = self.session.read();
        session.status.as_ref().map(|_| session.capabilities)
    }

    /// Runs one command exchange with a bounded reconnect-and-retry
    /// loop around it.
    ///
    /// `build` encodes the command against the detected dialect and the
    /// session's capabilities; validation failures it reports are not
    /// retryable and surface immediately. `response_len` bytes are read
    /// back when nonzero; `drain_ack` drains a short best-effort
    /// acknowledgement instead.
    async fn exchange<F>(
        &self,
        build: F,
        response_len: usize,
        drain_ack: bool,
    ) -> Result<Vec<u8>, ClientError>
    where
        F: Fn(ProtocolVariant, Capabilities) -> Result<Vec<u8>, ProtocolError>,
    {
        let mut conn = self.connection.lock().await;
        let retries = conn.config().retries;
        let mut last_err = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                tracing::debug!(attempt, "retrying command");
            }
            if attempt > 0 || !conn.is_connected() {
                if let Err(err) = conn.connect().await {
                    tracing::debug!(error = %err, "reconnect failed");
                    last_err = Some(err);
                    continue;
                }
            }
            match self
                .exchange_once(&mut conn, &build, response_len, drain_ack)
                .await
            {
                Ok(raw) => return Ok(raw),
                Err(err) if err.is_retryable() => {
                    tracing::debug!(error = %err, "command exchange failed");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or(ClientError::Timeout))
    }

    async fn exchange_once<F>(
        &self,
        conn: &mut Connection,
        build: &F,
        response_len: usize,
        drain_ack: bool,
    ) -> Result<Vec<u8>, ClientError>
    where
        F: Fn(ProtocolVariant, Capabilities) -> Result<Vec<u8>, ProtocolError>,
    {
        let variant = self.ensure_variant(conn).await?;
        let caps = self.session.read().capabilities;
        let msg = build(variant, caps)?;
        conn.send(&msg).await?;
        if drain_ack {
            if let Err(err) = conn.read_some(4, ACK_WAIT).await {
                tracing::debug!(error = %err, "write ack not drained");
            }
        }
        if response_len == 0 {
            return Ok(Vec::new());
        }
        conn.read_exact_deadline(response_len).await
    }

    /// Returns the session's dialect, running detection first if
    /// needed.
    async fn ensure_variant(&self, conn: &mut Connection) -> Result<ProtocolVariant, ClientError> {
        if let Some(variant) = self.session.read().variant {
            return Ok(variant);
        }
        self.detect_variant(conn).await
    }

    /// Probes which dialect the device speaks.
    ///
    /// The standard state query is sent first; any reply at all means
    /// the standard dialect. Silence is followed by the legacy probe,
    /// whose reply carries 0x01 in its second byte on legacy firmware.
    /// If both probes go unanswered after the retry budget, standard
    /// framing is assumed for this call but nothing is pinned, so the
    /// resulting short-read error surfaces to the caller and the next
    /// operation probes again.
    async fn detect_variant(&self, conn: &mut Connection) -> Result<ProtocolVariant, ClientError> {
        let retries = conn.config().retries;
        for attempt in 0..=retries {
            if attempt > 0 {
                tracing::debug!(attempt, "retrying variant detection");
                conn.connect().await?;
            }

            conn.send(&ProtocolVariant::Standard.state_query()).await?;
            let probe = conn.read_some(2, PROBE_WAIT).await?;
            if probe.len() == 2 {
                return self.finish_detection(conn, ProtocolVariant::Standard, probe).await;
            }

            conn.send(&ProtocolVariant::LEGACY_PROBE).await?;
            let probe = conn.read_some(2, PROBE_WAIT).await?;
            if probe.len() == 2 && probe[1] == 0x01 {
                return self
                    .finish_detection(conn, ProtocolVariant::LegacyOriginal, probe)
                    .await;
            }
        }

        tracing::warn!("variant detection failed, assuming standard framing");
        Ok(ProtocolVariant::Standard)
    }

    /// Drains the rest of the state response the probe bit into and
    /// pins the detected variant.
    async fn finish_detection(
        &self,
        conn: &mut Connection,
        variant: ProtocolVariant,
        probe: Vec<u8>,
    ) -> Result<ProtocolVariant, ClientError> {
        let rest = conn
            .read_exact_deadline(variant.state_response_len() - probe.len())
            .await?;
        let mut raw = probe;
        raw.extend_from_slice(&rest);

        let mut variant = variant;
        let mut session = self.session.write();
        match DeviceState::decode(&raw, variant) {
            Ok(state) => {
                if let Some(refined) = state.refined_variant() {
                    variant = refined;
                }
                session.capabilities = state.capabilities;
                session.status = Some(state);
            }
            Err(err) => {
                tracing::debug!(error = %err, "discarding undecodable probe response");
            }
        }
        session.variant = Some(variant);
        tracing::debug!(?variant, "dialect detected");
        Ok(variant)
    }
}
