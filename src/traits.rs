//! # Collaborator Seams
//!
//! The agent does not establish links or speak the broker wire protocol
//! itself. Both concerns are consumed through the traits in this module,
//! keeping the crate hardware and network-stack agnostic.
//!
//! With the Rust 2024 Edition, the session trait uses native `async fn`,
//! removing the need for the `async-trait` macro.

/// Quality of Service levels for outbound publishes.
///
/// Only "at most once" and "at least once" are supported; the data path
/// clamps anything higher down to level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
}

impl QoS {
    /// Maps a raw level to a supported QoS, clamping 2 and above to 1.
    pub fn clamp_level(level: u8) -> Self {
        if level == 0 {
            QoS::AtMostOnce
        } else {
            QoS::AtLeastOnce
        }
    }
}

/// Credentials handed to the link driver when bringing the link up.
#[derive(Debug, Clone, Copy)]
pub struct LinkCredentials<'a> {
    pub ssid: &'a str,
    pub passphrase: &'a str,
}

/// Link-status provider.
///
/// Implemented over the platform's wireless stack. `establish` only kicks
/// off the attempt; the agent polls `is_up` with its own timeout so the
/// driver never has to block.
pub trait LinkDriver {
    /// Start bringing the link up. Must not block.
    fn establish(&mut self, credentials: &LinkCredentials<'_>);

    /// Whether the link currently carries traffic.
    fn is_up(&mut self) -> bool;

    /// Signal strength in dBm, reported in the liveness payload.
    fn rssi(&mut self) -> i16;
}

/// Parameters for the broker handshake.
///
/// The will message is registered with the broker so that an unclean drop
/// still flips the retained status topic to offline.
#[derive(Debug, Clone, Copy)]
pub struct SessionParams<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub will_topic: &'a str,
    pub will_payload: &'a [u8],
    pub will_retain: bool,
}

/// One inbound message, borrowed from the session's receive buffer.
#[derive(Debug)]
pub struct Inbound<'m> {
    pub topic: &'m str,
    pub payload: &'m [u8],
}

/// Broker-session provider.
///
/// Implemented by a broker-client library over whatever transport the
/// platform offers. The agent treats the session as a narrow pipe: connect,
/// publish, subscribe, and poll for at most one inbound message per call.
#[allow(async_fn_in_trait)]
pub trait BrokerSession {
    /// The error type returned by the session.
    type Error: core::fmt::Debug;

    /// Performs the broker handshake.
    async fn connect(&mut self, params: &SessionParams<'_>) -> Result<(), Self::Error>;

    /// Publishes a message. Fire-and-forget beyond the QoS semantics.
    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error>;

    /// Subscribes to a topic filter.
    async fn subscribe(&mut self, pattern: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Services the inbound path, yielding at most one message per call.
    async fn poll(&mut self) -> Result<Option<Inbound<'_>>, Self::Error>;

    /// Whether the session is currently open.
    fn is_open(&self) -> bool;

    /// Closes the session.
    async fn close(&mut self);

    /// Session-specific diagnostic code for the most recent failure.
    fn last_error_code(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels_clamp_to_at_least_once() {
        assert_eq!(QoS::clamp_level(0), QoS::AtMostOnce);
        assert_eq!(QoS::clamp_level(1), QoS::AtLeastOnce);
        assert_eq!(QoS::clamp_level(2), QoS::AtLeastOnce);
        assert_eq!(QoS::clamp_level(255), QoS::AtLeastOnce);
    }
}
