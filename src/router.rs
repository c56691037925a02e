//! # Message Router
//!
//! The inbound dispatch path. Every (topic, payload) pair coming out of the
//! broker session passes through [`route`]: the raw observer sees it first,
//! then the topic is classified and, for commands, the payload is decoded
//! and handed to the handler registry.
//!
//! The payload is clipped to the bounded receive size before any handler
//! sees it. Oversized or partially invalid UTF-8 input loses its tail
//! silently; that is expected behavior on this data path, not a fault.

use crate::config::MAX_PAYLOAD_LEN;
use crate::pin::PinValue;
use crate::registry::HandlerRegistry;
use crate::topic;

/// Clips a raw payload to the receive bound and to valid UTF-8.
///
/// Keeps at most `MAX_PAYLOAD_LEN - 1` bytes, then cuts at the last valid
/// UTF-8 boundary within that window.
fn clip(payload: &[u8]) -> &str {
    let cut = payload.len().min(MAX_PAYLOAD_LEN - 1);
    let bytes = &payload[..cut];
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

/// Routes one inbound message. Returns whether a pin handler ran.
pub(crate) fn route(registry: &mut HandlerRegistry<'_>, topic_str: &str, payload: &[u8]) -> bool {
    let text = clip(payload);
    registry.fire_raw(topic_str, text);

    let Some(pin) = topic::command_pin(topic_str) else {
        return false;
    };

    let value = PinValue::from_text(text);
    registry.dispatch(pin, &value)
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn commands_dispatch_to_the_addressed_pin() {
        let got = Cell::new(0i32);
        let mut handler = |v: &PinValue| got.set(v.as_int());

        let mut registry = HandlerRegistry::new();
        registry.register_write(7, &mut handler).unwrap();

        assert!(route(&mut registry, "vwire/dev/cmd/V7", b"42"));
        assert_eq!(got.get(), 42);
    }

    #[test]
    fn non_commands_reach_only_the_raw_observer() {
        let raw_seen = Cell::new(0u32);
        let handled = Cell::new(0u32);
        let mut raw = |_: &str, _: &str| raw_seen.set(raw_seen.get() + 1);
        let mut handler = |_: &PinValue| handled.set(handled.get() + 1);

        let mut registry = HandlerRegistry::new();
        registry.set_raw(&mut raw);
        registry.register_write(7, &mut handler).unwrap();

        assert!(!route(&mut registry, "vwire/dev/pin/V7", b"42"));
        assert!(!route(&mut registry, "vwire/dev/status", b"{}"));
        assert_eq!(raw_seen.get(), 2);
        assert_eq!(handled.get(), 0);
    }

    #[test]
    fn unhandled_commands_are_ignored() {
        let mut registry = HandlerRegistry::new();
        assert!(!route(&mut registry, "vwire/dev/cmd/V3", b"1"));
    }

    #[test]
    fn oversized_payloads_are_clipped_to_the_receive_bound() {
        let len_seen = Cell::new(0usize);
        let mut handler = |v: &PinValue| len_seen.set(v.as_str().len());

        let mut registry = HandlerRegistry::new();
        registry.register_write(1, &mut handler).unwrap();

        let oversized = [b'7'; MAX_PAYLOAD_LEN + 100];
        assert!(route(&mut registry, "vwire/dev/cmd/V1", &oversized));
        assert_eq!(len_seen.get(), MAX_PAYLOAD_LEN - 1);
    }

    #[test]
    fn invalid_utf8_is_cut_at_the_last_valid_boundary() {
        let text_seen = Cell::new(0usize);
        let mut handler = |v: &PinValue| text_seen.set(v.as_str().len());

        let mut registry = HandlerRegistry::new();
        registry.register_write(2, &mut handler).unwrap();

        assert!(route(&mut registry, "vwire/dev/cmd/V2", b"12\xff\xfe34"));
        assert_eq!(text_seen.get(), 2);
    }
}
