//! # Vwire Device Agent
//!
//! `vwire-agent` is a `no_std` compatible, asynchronous device agent that
//! keeps a microcontroller connected to the Vwire cloud broker, built upon
//! the [Embassy](https://embassy.dev/) async ecosystem.
//!
//! ## Core Features
//!
//! - **`no_std` & `no_alloc`:** Designed to run on bare-metal microcontrollers
//!   without requiring a standard library or dynamic memory allocation.
//!   Buffers and handler tables are managed using `heapless`.
//! - **Resilient by default:** A deterministic connection state machine with
//!   backoff-paced auto-reconnection recovers from any disconnection point
//!   without operator intervention.
//! - **Virtual pins:** 128 addressable logical channels (`V0` to `V127`) for
//!   bidirectional scalar and array data exchange, with at most one handler
//!   invocation per inbound command.
//! - **Rust 2024 Edition:** Uses native `async fn` in traits, removing the
//!   need for `async-trait`.
//! - **Collaborator agnostic:** The [`traits::LinkDriver`] and
//!   [`traits::BrokerSession`] seams keep link establishment and the broker
//!   wire protocol outside the crate, so the agent runs over any wireless
//!   stack and broker-client library.
//!
//! ## Architecture
//!
//! The host configures the agent, brings it up once, and then drives it
//! from its main loop:
//!
//! ```ignore
//! let mut agent = Agent::new(link, session);
//! agent.config("device-auth-token");
//! agent.on_virtual_write(0, &mut led_handler);
//!
//! agent.begin(&credentials).await?;
//! loop {
//!     agent.run().await;
//!     // other device responsibilities
//! }
//! ```
//!
//! Each `run` tick services the inbound path first, then the liveness
//! heartbeat, and only evaluates disconnection handling and reconnect
//! pacing when the connection is down, keeping the connected path cheap.
//!
//! ## Topic Namespace
//!
//! All traffic lives under `vwire/<deviceId>/...`: retained `status`
//! announcements, inbound `cmd/V<pin>` commands, outbound `pin/V<pin>`
//! writes, `sync` requests, the `heartbeat` liveness payload, and the
//! `notify`/`email`/`log` side channels. See [`topic`] for the codec.
//!
//! ## Failure Model
//!
//! Failures never panic and never terminate the agent. Operations degrade
//! to silent no-ops, the kind is recorded in the last-error slot, and the
//! reconnection loop owns recovery. Optional `log`/`defmt` features add a
//! diagnostic stream; without them the agent is entirely silent.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging shims are in scope crate-wide.
#[macro_use]
mod fmt;

pub mod agent;
pub mod config;
pub mod error;
pub mod pin;
pub mod registry;
mod router;
pub mod topic;
pub mod traits;

/// Crate version, reported in the startup diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export key types for easier access at the crate root.
pub use agent::{Agent, ConnectionState, STATUS_OFFLINE, STATUS_ONLINE};
pub use config::{AgentConfig, TransportKind};
pub use error::AgentError;
pub use pin::PinValue;
pub use registry::{AutoRegistrations, PinBinding};
pub use traits::{BrokerSession, Inbound, LinkCredentials, LinkDriver, QoS, SessionParams};
