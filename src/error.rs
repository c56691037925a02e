//! # Error Types
//!
//! Failure kinds surfaced by the agent. Every failure is non-fatal: the
//! operation degrades to a no-op or a state transition, and the kind is
//! recorded in the agent's last-error slot for the host to inspect. There
//! is no panic path in non-test code.

/// Failure kinds recorded by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AgentError {
    /// No auth token was configured before a broker connect attempt.
    NoCredential,
    /// Link establishment failed or the link dropped.
    LinkFailure,
    /// The broker handshake failed or the session reported an error.
    BrokerFailure,
    /// An outbound operation was attempted while disconnected.
    NotConnected,
    /// A pin number outside the addressable range.
    InvalidPin,
    /// A bounded buffer could not hold the produced payload in full.
    BufferFull,
    /// The write-handler table is at capacity.
    RegistryFull,
    /// A timed wait elapsed.
    Timeout,
    /// The secure transport could not complete the handshake.
    SecureTransportFailure,
}
