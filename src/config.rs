//! # Agent Configuration
//!
//! Connection settings and the capacity limits used by the bounded buffers
//! and tables throughout the crate. All limits are plain constants so that
//! memory usage is fixed at compile time.

use embassy_time::Duration;
use heapless::String;

use crate::traits::QoS;

/// Default broker endpoint.
pub const DEFAULT_SERVER: &str = "mqtt.vwire.io";
/// Default port for plain TCP sessions.
pub const DEFAULT_PORT_TCP: u16 = 1883;
/// Default port for TLS sessions.
pub const DEFAULT_PORT_TLS: u16 = 8883;

/// Number of addressable virtual pins (`V0` to `V127`).
pub const MAX_VIRTUAL_PINS: usize = 128;
/// Capacity of the manually registered write-handler table.
pub const MAX_PIN_HANDLERS: usize = 32;
/// Maximum auth-token length in bytes (also the device identity).
pub const MAX_TOKEN_LEN: usize = 64;
/// Maximum broker host name length in bytes.
pub const MAX_SERVER_LEN: usize = 64;
/// Maximum built topic length in bytes.
pub const MAX_TOPIC_LEN: usize = 96;
/// Receive buffer capacity; inbound payloads are clipped to one byte less.
pub const MAX_PAYLOAD_LEN: usize = 512;
/// Buffer capacity for small JSON payloads (heartbeat, email).
pub const JSON_BUF_LEN: usize = 256;

/// How the session reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportKind {
    /// Plain MQTT over TCP.
    Tcp,
    /// MQTT over TLS.
    Tls,
}

impl TransportKind {
    /// Selects the transport by port convention: the well-known secure
    /// ports imply TLS, everything else is plain TCP.
    pub fn from_port(port: u16) -> Self {
        match port {
            8883 | 443 => TransportKind::Tls,
            _ => TransportKind::Tcp,
        }
    }
}

/// Connection settings owned by the agent.
///
/// Mutate only through the agent's configuration methods, before connecting
/// or while disconnected.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Auth token; doubles as the device identity in every owned topic.
    pub auth_token: String<MAX_TOKEN_LEN>,
    /// Broker host name or address.
    pub server: String<MAX_SERVER_LEN>,
    /// Broker port.
    pub port: u16,
    /// Plain or secure session.
    pub transport: TransportKind,
    /// Whether the agent re-attempts the broker on its own after a drop.
    pub auto_reconnect: bool,
    /// Minimum spacing between broker reconnect attempts.
    pub reconnect_interval: Duration,
    /// Liveness publish cadence while connected.
    pub heartbeat_interval: Duration,
    /// How long `begin` waits for the link to come up.
    pub link_timeout: Duration,
    /// Socket-level timeout hint for the broker session.
    pub session_timeout: Duration,
    /// QoS for data writes. Only levels 0 and 1 are meaningful.
    pub data_qos: QoS,
    /// Retain flag for data writes.
    pub data_retain: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut server = String::new();
        let _ = server.push_str(DEFAULT_SERVER);
        Self {
            auth_token: String::new(),
            server,
            port: DEFAULT_PORT_TLS,
            transport: TransportKind::Tls,
            auto_reconnect: true,
            reconnect_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            link_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(10),
            data_qos: QoS::AtLeastOnce,
            data_retain: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_follows_port_convention() {
        assert_eq!(TransportKind::from_port(8883), TransportKind::Tls);
        assert_eq!(TransportKind::from_port(443), TransportKind::Tls);
        assert_eq!(TransportKind::from_port(1883), TransportKind::Tcp);
        assert_eq!(TransportKind::from_port(1884), TransportKind::Tcp);
    }

    #[test]
    fn defaults_prefer_the_secure_endpoint() {
        let config = AgentConfig::default();
        assert_eq!(config.server.as_str(), DEFAULT_SERVER);
        assert_eq!(config.port, DEFAULT_PORT_TLS);
        assert_eq!(config.transport, TransportKind::Tls);
        assert!(config.auto_reconnect);
        assert_eq!(config.data_qos, QoS::AtLeastOnce);
        assert!(!config.data_retain);
    }
}
