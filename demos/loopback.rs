//! Example: driving the agent against an in-process loopback broker.
//!
//! The loopback session reflects every outbound pin write back to the
//! device as a command on the same pin, so the full path (publish, inbound
//! servicing, command classification, handler dispatch) runs without any
//! network. Time comes from the mock driver, so the heartbeat can be
//! triggered deterministically.
//!
//! Run on the host with `cargo run --example loopback`.

use std::collections::VecDeque;

use embassy_time::{Duration, MockDriver};
use futures::executor::block_on;
use vwire_agent::{
    Agent, BrokerSession, Inbound, LinkCredentials, LinkDriver, PinValue, QoS, SessionParams,
};

/// A link that is always up, as on a wired test bench.
struct BenchLink;

impl LinkDriver for BenchLink {
    fn establish(&mut self, _credentials: &LinkCredentials<'_>) {}

    fn is_up(&mut self) -> bool {
        true
    }

    fn rssi(&mut self) -> i16 {
        -55
    }
}

/// A broker session that loops pin writes back as commands.
#[derive(Default)]
struct LoopbackSession {
    open: bool,
    inbound: VecDeque<(String, Vec<u8>)>,
    current: Option<(String, Vec<u8>)>,
}

impl BrokerSession for LoopbackSession {
    type Error = core::convert::Infallible;

    async fn connect(&mut self, params: &SessionParams<'_>) -> Result<(), Self::Error> {
        println!("[broker] session for {}", params.client_id);
        self.open = true;
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        _retain: bool,
    ) -> Result<(), Self::Error> {
        println!("[broker] {} <- {}", topic, String::from_utf8_lossy(payload));
        if let Some(idx) = topic.find("/pin/") {
            let command = format!("{}/cmd/{}", &topic[..idx], &topic[idx + 5..]);
            self.inbound.push_back((command, payload.to_vec()));
        }
        Ok(())
    }

    async fn subscribe(&mut self, pattern: &str, _qos: QoS) -> Result<(), Self::Error> {
        println!("[broker] subscribed {}", pattern);
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<Inbound<'_>>, Self::Error> {
        self.current = self.inbound.pop_front();
        Ok(self.current.as_ref().map(|(topic, payload)| Inbound {
            topic: topic.as_str(),
            payload: payload.as_slice(),
        }))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) {
        self.open = false;
    }
}

fn main() {
    let mut on_temperature = |value: &PinValue| {
        println!("[device] V1 command: {} (as float: {})", value.as_str(), value.as_float());
    };

    let mut agent = Agent::new(BenchLink, LoopbackSession::default());
    agent.config_with_server("demo-token", "broker.local", 1883);
    agent.on_virtual_write(1, &mut on_temperature);

    let credentials = LinkCredentials {
        ssid: "lab",
        passphrase: "hunter2",
    };
    block_on(agent.begin(&credentials)).expect("connect");

    // A write goes out, comes back as a command, and hits the handler on
    // the next tick.
    block_on(agent.virtual_write(1, 21.5f32));
    block_on(agent.run());

    // Advance mock time past the heartbeat interval to see the liveness
    // payload.
    MockDriver::get().advance(Duration::from_secs(30));
    block_on(agent.run());

    block_on(agent.disconnect());
}
