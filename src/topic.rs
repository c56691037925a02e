//! # Topic Codec
//!
//! Builds and parses the device-scoped topic namespace
//! `vwire/<deviceId>/<category>[/V<pin>]`. Building writes into a bounded
//! buffer; an oversized topic is silently truncated rather than growing or
//! faulting. Parsing only ever answers one question: which pin, if any, an
//! inbound command topic addresses.

use core::fmt::Write;

use heapless::String;

use crate::config::{MAX_TOPIC_LEN, MAX_VIRTUAL_PINS};

/// Root literal of the namespace.
pub const TOPIC_ROOT: &str = "vwire";

/// A built topic, sized for the deepest shape in the namespace.
pub type TopicBuf = String<MAX_TOPIC_LEN>;

const CMD_MARKER: &str = "/cmd/";

/// Message categories under `vwire/<deviceId>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Category {
    Status,
    Cmd,
    Pin,
    Sync,
    Heartbeat,
    Notify,
    Email,
    Log,
}

impl Category {
    /// Canonical wire name of the category segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Status => "status",
            Category::Cmd => "cmd",
            Category::Pin => "pin",
            Category::Sync => "sync",
            Category::Heartbeat => "heartbeat",
            Category::Notify => "notify",
            Category::Email => "email",
            Category::Log => "log",
        }
    }
}

/// Builds `vwire/<deviceId>/<category>`.
pub fn device_topic(device_id: &str, category: Category) -> TopicBuf {
    let mut buf = TopicBuf::new();
    let _ = write!(buf, "{}/{}/{}", TOPIC_ROOT, device_id, category.as_str());
    buf
}

/// Builds `vwire/<deviceId>/<category>/V<pin>`.
pub fn pin_topic(device_id: &str, category: Category, pin: u8) -> TopicBuf {
    let mut buf = TopicBuf::new();
    let _ = write!(
        buf,
        "{}/{}/{}/V{}",
        TOPIC_ROOT,
        device_id,
        category.as_str(),
        pin
    );
    buf
}

/// Builds the subscription pattern covering the full command subtree.
pub fn command_pattern(device_id: &str) -> TopicBuf {
    let mut buf = TopicBuf::new();
    let _ = write!(buf, "{}/{}/cmd/#", TOPIC_ROOT, device_id);
    buf
}

/// Extracts the target pin from an inbound command topic.
///
/// Looks for the `/cmd/` marker and reads the trailing segment, tolerating
/// an optional case-insensitive `V` prefix. `None` means "not a command":
/// marker absent, empty remainder, non-numeric text, or a pin outside the
/// addressable range. The router ignores such topics without error.
pub fn command_pin(topic: &str) -> Option<u8> {
    let at = topic.find(CMD_MARKER)?;
    let rest = &topic[at + CMD_MARKER.len()..];
    let digits = rest.strip_prefix(['V', 'v']).unwrap_or(rest);
    if digits.is_empty() {
        return None;
    }
    let pin: u8 = digits.parse().ok()?;
    ((pin as usize) < MAX_VIRTUAL_PINS).then_some(pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_device_and_pin_topics() {
        assert_eq!(
            device_topic("dev123", Category::Status).as_str(),
            "vwire/dev123/status"
        );
        assert_eq!(
            pin_topic("dev123", Category::Pin, 7).as_str(),
            "vwire/dev123/pin/V7"
        );
        assert_eq!(
            pin_topic("dev123", Category::Sync, 127).as_str(),
            "vwire/dev123/sync/V127"
        );
        assert_eq!(command_pattern("dev123").as_str(), "vwire/dev123/cmd/#");
    }

    #[test]
    fn parses_command_pins_with_optional_prefix() {
        assert_eq!(command_pin("vwire/dev123/cmd/V7"), Some(7));
        assert_eq!(command_pin("vwire/dev123/cmd/v7"), Some(7));
        assert_eq!(command_pin("vwire/dev123/cmd/7"), Some(7));
        assert_eq!(command_pin("vwire/dev123/cmd/V0"), Some(0));
        assert_eq!(command_pin("vwire/dev123/cmd/V127"), Some(127));
    }

    #[test]
    fn rejects_non_commands_silently() {
        assert_eq!(command_pin("vwire/dev123/pin/V7"), None);
        assert_eq!(command_pin("vwire/dev123/cmd/"), None);
        assert_eq!(command_pin("vwire/dev123/cmd/Vx"), None);
        assert_eq!(command_pin("vwire/dev123/cmd/V128"), None);
        assert_eq!(command_pin("vwire/dev123/cmd/V300"), None);
        assert_eq!(command_pin("vwire/dev123/status"), None);
        assert_eq!(command_pin(""), None);
    }

    #[test]
    fn oversized_device_id_truncates_without_fault() {
        let long_id = "a".repeat(2 * MAX_TOPIC_LEN);
        let topic = device_topic(&long_id, Category::Status);
        assert_eq!(topic.len(), MAX_TOPIC_LEN);
        assert!(topic.as_str().starts_with("vwire/aaa"));
    }
}
