//! # Device Agent
//!
//! The [`Agent`] owns the link driver, the broker session, the handler
//! tables and all connection state. One instance per device; the host
//! configures it, calls [`Agent::begin`] once, then invokes [`Agent::run`]
//! frequently and regularly from its main loop.
//!
//! Each `run` tick gives connected-path work absolute priority: inbound
//! servicing first, then the heartbeat check. Disconnection detection and
//! reconnect pacing are only evaluated when not connected, so the common
//! path stays cheap.

use core::fmt::Write;

use embassy_futures::yield_now;
use embassy_time::{Duration, Instant};
use heapless::String;

use crate::config::{
    AgentConfig, DEFAULT_PORT_TLS, DEFAULT_SERVER, JSON_BUF_LEN, MAX_TOKEN_LEN, MAX_VIRTUAL_PINS,
    TransportKind,
};
use crate::error::AgentError;
use crate::pin::PinValue;
use crate::registry::{AutoRegistrations, EventHandler, HandlerRegistry, RawHandler, WriteHandler};
use crate::router;
use crate::topic::{self, Category};
use crate::traits::{BrokerSession, LinkCredentials, LinkDriver, QoS, SessionParams};

/// Retained status payload published on connect and as the broker will.
pub const STATUS_ONLINE: &[u8] = br#"{"status":"online"}"#;
/// Retained status payload published on teardown and via the will.
pub const STATUS_OFFLINE: &[u8] = br#"{"status":"offline"}"#;

const CLIENT_ID_LEN: usize = MAX_TOKEN_LEN + 8;

/// Lifecycle states of the device connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// Not yet started.
    Idle,
    /// Waiting for the link to come up inside `begin`.
    ConnectingLink,
    /// Broker handshake in flight.
    ConnectingBroker,
    /// Session open, commands flowing.
    Connected,
    /// Session lost; the reconnection loop owns recovery.
    Disconnected,
    /// A connect attempt failed; see the last-error slot.
    Error,
}

/// The device agent.
///
/// Generic over the link driver `L` and broker session `S`; the `'h`
/// lifetime covers the host-owned handler callbacks.
pub struct Agent<'h, L, S> {
    link: L,
    session: S,
    config: AgentConfig,
    registry: HandlerRegistry<'h>,
    state: ConnectionState,
    last_error: Option<AgentError>,
    heap_probe: Option<&'h dyn Fn() -> u32>,
    started_at: Instant,
    last_heartbeat: Instant,
    last_reconnect_attempt: Instant,
}

impl<'h, L, S> Agent<'h, L, S>
where
    L: LinkDriver,
    S: BrokerSession,
{
    /// Creates an idle agent with default settings.
    pub fn new(link: L, session: S) -> Self {
        let now = Instant::now();
        Self {
            link,
            session,
            config: AgentConfig::default(),
            registry: HandlerRegistry::new(),
            state: ConnectionState::Idle,
            last_error: None,
            heap_probe: None,
            started_at: now,
            last_heartbeat: now,
            last_reconnect_attempt: now,
        }
    }

    // --- Configuration ---

    /// Sets the auth token, targeting the default broker endpoint.
    pub fn config(&mut self, auth_token: &str) {
        self.config_with_server(auth_token, DEFAULT_SERVER, DEFAULT_PORT_TLS);
    }

    /// Sets the auth token and broker endpoint. The port selects the
    /// transport by convention; the token doubles as the device identity.
    pub fn config_with_server(&mut self, auth_token: &str, server: &str, port: u16) {
        set_bounded(&mut self.config.auth_token, auth_token);
        set_bounded(&mut self.config.server, server);
        self.config.port = port;
        self.config.transport = TransportKind::from_port(port);
        debug!("config: server={} port={}", self.config.server.as_str(), port);
    }

    /// Replaces the whole settings block. Call before connecting or while
    /// disconnected.
    pub fn apply_config(&mut self, config: AgentConfig) {
        self.config = config;
    }

    pub fn set_transport(&mut self, kind: TransportKind) {
        self.config.transport = kind;
    }

    pub fn set_auto_reconnect(&mut self, enable: bool) {
        self.config.auto_reconnect = enable;
    }

    pub fn set_reconnect_interval(&mut self, interval: Duration) {
        self.config.reconnect_interval = interval;
    }

    pub fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.config.heartbeat_interval = interval;
    }

    /// Sets the QoS level for data writes, clamped to levels 0 and 1.
    pub fn set_data_qos(&mut self, level: u8) {
        self.config.data_qos = QoS::clamp_level(level);
    }

    pub fn set_data_retain(&mut self, retain: bool) {
        self.config.data_retain = retain;
    }

    /// Installs the free-memory probe reported in the liveness payload.
    /// Without one, heap is reported as 0.
    pub fn set_heap_probe(&mut self, probe: &'h dyn Fn() -> u32) {
        self.heap_probe = Some(probe);
    }

    // --- Handler registration ---

    /// Registers a write handler for a virtual pin. When the table is full
    /// the call is a no-op and the registry-full error is recorded.
    pub fn on_virtual_write(&mut self, pin: u8, handler: WriteHandler<'h>) {
        if self.registry.register_write(pin, handler).is_err() {
            warn!("write-handler table full");
            self.set_error(AgentError::RegistryFull);
        }
    }

    /// Installs the host-built load-time registrations. Consulted only
    /// after the manual table misses.
    pub fn install_auto_handlers(&mut self, auto: AutoRegistrations<'h>) {
        self.registry.install_auto(auto);
    }

    /// Sets the connect hook. Re-registration overwrites.
    pub fn on_connect(&mut self, handler: EventHandler<'h>) {
        self.registry.set_connect(handler);
    }

    /// Sets the disconnect hook. Re-registration overwrites.
    pub fn on_disconnect(&mut self, handler: EventHandler<'h>) {
        self.registry.set_disconnect(handler);
    }

    /// Sets the raw-message observer, invoked for every inbound pair
    /// before command classification.
    pub fn on_message(&mut self, handler: RawHandler<'h>) {
        self.registry.set_raw(handler);
    }

    // --- State queries ---

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The most recently recorded failure, if any.
    pub fn last_error(&self) -> Option<AgentError> {
        self.last_error
    }

    pub fn connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.session.is_open()
    }

    /// The device identity: the configured auth token.
    pub fn device_id(&self) -> &str {
        self.config.auth_token.as_str()
    }

    /// Seconds since the last successful connect (or since creation).
    pub fn uptime_secs(&self) -> u32 {
        (Instant::now() - self.started_at).as_secs() as u32
    }

    /// Link signal strength in dBm.
    pub fn rssi(&mut self) -> i16 {
        self.link.rssi()
    }

    /// Diagnostic code from the broker session's most recent failure.
    pub fn session_error_code(&self) -> i32 {
        self.session.last_error_code()
    }

    // --- Connection lifecycle ---

    /// Brings the link up and connects to the broker.
    ///
    /// Busy-waits on the link up to the configured link timeout, yielding
    /// cooperatively on every polling iteration so other device work is
    /// not starved.
    pub async fn begin(&mut self, credentials: &LinkCredentials<'_>) -> Result<(), AgentError> {
        info!("vwire-agent {} starting", crate::VERSION);
        self.state = ConnectionState::ConnectingLink;
        self.link.establish(credentials);

        let deadline = Instant::now() + self.config.link_timeout;
        while !self.link.is_up() {
            if Instant::now() >= deadline {
                warn!("link establishment timed out");
                self.set_error(AgentError::LinkFailure);
                self.state = ConnectionState::Error;
                return Err(AgentError::LinkFailure);
            }
            yield_now().await;
        }
        debug!("link up");

        self.connect_broker().await
    }

    /// Connects to the broker over an already established link.
    pub async fn begin_linked(&mut self) -> Result<(), AgentError> {
        if !self.link.is_up() {
            self.set_error(AgentError::LinkFailure);
            self.state = ConnectionState::Error;
            return Err(AgentError::LinkFailure);
        }
        self.connect_broker().await
    }

    async fn connect_broker(&mut self) -> Result<(), AgentError> {
        if self.config.auth_token.is_empty() {
            warn!("no auth token configured");
            self.set_error(AgentError::NoCredential);
            self.state = ConnectionState::Error;
            return Err(AgentError::NoCredential);
        }

        self.state = ConnectionState::ConnectingBroker;

        let mut client_id: String<CLIENT_ID_LEN> = String::new();
        let _ = write!(client_id, "vwire-{}", self.config.auth_token);
        let status_topic = topic::device_topic(self.config.auth_token.as_str(), Category::Status);
        let params = SessionParams {
            client_id: client_id.as_str(),
            username: self.config.auth_token.as_str(),
            password: self.config.auth_token.as_str(),
            will_topic: status_topic.as_str(),
            will_payload: STATUS_OFFLINE,
            will_retain: true,
        };

        debug!("broker connect as {}", params.client_id);
        if self.session.connect(&params).await.is_err() {
            let kind = match self.config.transport {
                TransportKind::Tls => AgentError::SecureTransportFailure,
                TransportKind::Tcp => AgentError::BrokerFailure,
            };
            warn!("broker handshake failed");
            self.set_error(kind);
            self.state = ConnectionState::Error;
            return Err(kind);
        }

        self.state = ConnectionState::Connected;

        let _ = self
            .session
            .publish(status_topic.as_str(), STATUS_ONLINE, QoS::AtMostOnce, true)
            .await;

        let pattern = topic::command_pattern(self.config.auth_token.as_str());
        if self
            .session
            .subscribe(pattern.as_str(), self.config.data_qos)
            .await
            .is_err()
        {
            warn!("command subscription failed");
        }

        info!("connected");
        let now = Instant::now();
        self.started_at = now;
        self.last_heartbeat = now;
        self.last_reconnect_attempt = now;
        self.registry.fire_connect();
        Ok(())
    }

    /// One driver tick.
    ///
    /// Connected: service at most one inbound message, then the heartbeat.
    /// Otherwise: detect the drop once, fire disconnect hooks, and pace
    /// reconnection attempts while the link is up.
    pub async fn run(&mut self) {
        if self.state == ConnectionState::Connected && self.session.is_open() && self.link.is_up()
        {
            self.service_inbound().await;
            if Instant::now() - self.last_heartbeat >= self.config.heartbeat_interval {
                self.last_heartbeat = Instant::now();
                self.send_heartbeat().await;
            }
            return;
        }

        if self.state == ConnectionState::Connected {
            info!("connection lost");
            self.state = ConnectionState::Disconnected;
            self.registry.fire_disconnect();
        }

        if !matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Error
        ) {
            return;
        }
        if !self.config.auto_reconnect || !self.link.is_up() {
            return;
        }

        let now = Instant::now();
        if now - self.last_reconnect_attempt >= self.config.reconnect_interval {
            self.last_reconnect_attempt = now;
            let _ = self.connect_broker().await;
        }
    }

    /// Tears the session down, flipping the retained status to offline
    /// first. Lands in `Disconnected` from any starting state.
    pub async fn disconnect(&mut self) {
        if self.session.is_open() {
            let status_topic =
                topic::device_topic(self.config.auth_token.as_str(), Category::Status);
            let _ = self
                .session
                .publish(status_topic.as_str(), STATUS_OFFLINE, QoS::AtMostOnce, true)
                .await;
            self.session.close().await;
            info!("disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    async fn service_inbound(&mut self) {
        match self.session.poll().await {
            Ok(Some(message)) => {
                debug!("inbound on {}", message.topic);
                router::route(&mut self.registry, message.topic, message.payload);
            }
            Ok(None) => {}
            Err(_) => warn!("inbound servicing failed"),
        }
    }

    async fn send_heartbeat(&mut self) {
        let uptime = (Instant::now() - self.started_at).as_secs() as u32;
        let heap = self.heap_probe.map(|probe| probe()).unwrap_or(0);
        let rssi = self.link.rssi();

        let mut payload: String<JSON_BUF_LEN> = String::new();
        let _ = write!(
            payload,
            "{{\"uptime\":{},\"heap\":{},\"rssi\":{}}}",
            uptime, heap, rssi
        );

        let heartbeat_topic =
            topic::device_topic(self.config.auth_token.as_str(), Category::Heartbeat);
        if self
            .session
            .publish(
                heartbeat_topic.as_str(),
                payload.as_bytes(),
                QoS::AtMostOnce,
                false,
            )
            .await
            .is_err()
        {
            warn!("heartbeat publish failed");
        }
    }

    // --- Virtual pin operations ---

    /// Publishes a value to a virtual pin with the configured QoS and
    /// retain flag. Silent no-op (with a recorded error) while
    /// disconnected or for a pin outside the addressable range.
    pub async fn virtual_write<V: Into<PinValue>>(&mut self, pin: u8, value: V) {
        let value = value.into();
        self.publish_pin(pin, &value).await;
    }

    /// Publishes a comma-joined integer array to a virtual pin.
    pub async fn virtual_write_ints(&mut self, pin: u8, values: &[i32]) {
        let value = PinValue::from_int_slice(values);
        self.publish_pin(pin, &value).await;
    }

    /// Publishes a comma-joined float array (two decimals per element).
    pub async fn virtual_write_floats(&mut self, pin: u8, values: &[f32]) {
        let value = PinValue::from_float_slice(values);
        self.publish_pin(pin, &value).await;
    }

    async fn publish_pin(&mut self, pin: u8, value: &PinValue) {
        if !self.ready_for(Some(pin)) {
            return;
        }
        let pin_topic = topic::pin_topic(self.config.auth_token.as_str(), Category::Pin, pin);
        debug!("write V{} = {}", pin, value.as_str());
        self.publish_out(
            pin_topic.as_str(),
            value.as_bytes(),
            self.config.data_qos,
            self.config.data_retain,
        )
        .await;
    }

    /// Asks the server to resend the last-known value for one pin.
    pub async fn sync_virtual(&mut self, pin: u8) {
        if !self.ready_for(Some(pin)) {
            return;
        }
        let sync_topic = topic::pin_topic(self.config.auth_token.as_str(), Category::Sync, pin);
        self.publish_out(sync_topic.as_str(), b"", QoS::AtMostOnce, false)
            .await;
    }

    /// Asks the server to resend the last-known values for every pin.
    pub async fn sync_all(&mut self) {
        if !self.ready_for(None) {
            return;
        }
        let sync_topic = topic::device_topic(self.config.auth_token.as_str(), Category::Sync);
        self.publish_out(sync_topic.as_str(), b"all", QoS::AtMostOnce, false)
            .await;
    }

    /// Asks the server to resend the listed pins, in order.
    pub async fn sync_pins(&mut self, pins: &[u8]) {
        for pin in pins {
            self.sync_virtual(*pin).await;
        }
    }

    // --- Notifications ---

    /// Sends a push notification through the server.
    pub async fn notify(&mut self, message: &str) {
        if !self.ready_for(None) {
            return;
        }
        let notify_topic = topic::device_topic(self.config.auth_token.as_str(), Category::Notify);
        self.publish_out(notify_topic.as_str(), message.as_bytes(), QoS::AtMostOnce, false)
            .await;
    }

    /// Sends an email request through the server. An overlong
    /// subject/body pair is truncated to the JSON buffer bound and the
    /// buffer-full error recorded.
    pub async fn email(&mut self, subject: &str, body: &str) {
        if !self.ready_for(None) {
            return;
        }
        let mut payload: String<JSON_BUF_LEN> = String::new();
        if write!(
            payload,
            "{{\"subject\":\"{}\",\"body\":\"{}\"}}",
            subject, body
        )
        .is_err()
        {
            self.set_error(AgentError::BufferFull);
        }
        let email_topic = topic::device_topic(self.config.auth_token.as_str(), Category::Email);
        self.publish_out(email_topic.as_str(), payload.as_bytes(), QoS::AtMostOnce, false)
            .await;
    }

    /// Appends a line to the server-side device log.
    pub async fn log_event(&mut self, message: &str) {
        if !self.ready_for(None) {
            return;
        }
        let log_topic = topic::device_topic(self.config.auth_token.as_str(), Category::Log);
        self.publish_out(log_topic.as_str(), message.as_bytes(), QoS::AtMostOnce, false)
            .await;
    }

    // --- Internals ---

    fn ready_for(&mut self, pin: Option<u8>) -> bool {
        if !self.connected() {
            self.set_error(AgentError::NotConnected);
            return false;
        }
        if let Some(pin) = pin
            && (pin as usize) >= MAX_VIRTUAL_PINS
        {
            self.set_error(AgentError::InvalidPin);
            return false;
        }
        true
    }

    async fn publish_out(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) {
        if self.session.publish(topic, payload, qos, retain).await.is_err() {
            warn!("publish failed");
            self.set_error(AgentError::BrokerFailure);
        }
    }

    fn set_error(&mut self, kind: AgentError) {
        self.last_error = Some(kind);
    }
}

/// Copies `src` into a bounded string, clipping at capacity minus one on a
/// character boundary.
fn set_bounded<const N: usize>(dst: &mut String<N>, src: &str) {
    dst.clear();
    let mut end = src.len().min(N - 1);
    while end > 0 && !src.is_char_boundary(end) {
        end -= 1;
    }
    let _ = dst.push_str(&src[..end]);
}
