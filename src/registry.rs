//! # Handler Registry
//!
//! Fixed-capacity tables binding virtual pins to write callbacks, plus
//! single-slot connect/disconnect/raw-message hooks.
//!
//! Two tables exist. The manual table is filled through the agent's
//! registration calls at runtime. The auto table is an ordered list the
//! host builds once during its init phase and installs wholesale, covering
//! handlers that would otherwise be wired up at process-load time. Lookups
//! check manual entries first, in insertion order, then auto entries, and
//! invoke at most one handler.
//!
//! Callbacks are `&mut dyn FnMut` trait objects so hosts can capture state
//! without global statics; the registry never allocates.

use heapless::Vec;

use crate::config::MAX_PIN_HANDLERS;
use crate::error::AgentError;
use crate::pin::PinValue;

/// Write callback invoked with the decoded command payload.
pub type WriteHandler<'h> = &'h mut dyn FnMut(&PinValue);

/// Lifecycle callback for connect/disconnect events.
pub type EventHandler<'h> = &'h mut dyn FnMut();

/// Raw observer invoked with every inbound (topic, payload) pair.
pub type RawHandler<'h> = &'h mut dyn FnMut(&str, &str);

/// One pin-to-callback binding.
pub struct PinBinding<'h> {
    pin: u8,
    handler: WriteHandler<'h>,
    active: bool,
}

impl<'h> PinBinding<'h> {
    pub fn new(pin: u8, handler: WriteHandler<'h>) -> Self {
        Self {
            pin,
            handler,
            active: true,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }
}

/// Ordered load-time registrations, built by the host during init.
pub struct AutoRegistrations<'h> {
    /// Write handlers consulted after the manual table misses.
    pub write_handlers: &'h mut [PinBinding<'h>],
    /// Connect hook fired after the manual connect hook.
    pub on_connect: Option<EventHandler<'h>>,
    /// Disconnect hook fired after the manual disconnect hook.
    pub on_disconnect: Option<EventHandler<'h>>,
}

impl Default for AutoRegistrations<'_> {
    fn default() -> Self {
        Self {
            write_handlers: &mut [],
            on_connect: None,
            on_disconnect: None,
        }
    }
}

/// The handler tables and hook slots.
pub struct HandlerRegistry<'h> {
    manual: Vec<PinBinding<'h>, MAX_PIN_HANDLERS>,
    auto: AutoRegistrations<'h>,
    connect: Option<EventHandler<'h>>,
    disconnect: Option<EventHandler<'h>>,
    raw: Option<RawHandler<'h>>,
}

impl Default for HandlerRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> HandlerRegistry<'h> {
    pub fn new() -> Self {
        Self {
            manual: Vec::new(),
            auto: AutoRegistrations::default(),
            connect: None,
            disconnect: None,
            raw: None,
        }
    }

    /// Appends a manual write handler.
    ///
    /// Once the table is full the call is a no-op and reports
    /// [`AgentError::RegistryFull`]; earlier registrations stay intact.
    pub fn register_write(
        &mut self,
        pin: u8,
        handler: WriteHandler<'h>,
    ) -> Result<(), AgentError> {
        self.manual
            .push(PinBinding::new(pin, handler))
            .map_err(|_| AgentError::RegistryFull)
    }

    /// Installs the host-built auto registrations. Replaces any previous
    /// install.
    pub fn install_auto(&mut self, auto: AutoRegistrations<'h>) {
        self.auto = auto;
    }

    /// Sets the connect hook. Re-registration overwrites.
    pub fn set_connect(&mut self, handler: EventHandler<'h>) {
        self.connect = Some(handler);
    }

    /// Sets the disconnect hook. Re-registration overwrites.
    pub fn set_disconnect(&mut self, handler: EventHandler<'h>) {
        self.disconnect = Some(handler);
    }

    /// Sets the raw-message observer. Re-registration overwrites.
    pub fn set_raw(&mut self, handler: RawHandler<'h>) {
        self.raw = Some(handler);
    }

    /// Number of manual registrations.
    pub fn handler_count(&self) -> usize {
        self.manual.len()
    }

    /// Dispatches a command to the first matching handler.
    ///
    /// Manual entries win over auto entries; at most one handler runs.
    /// Returns whether one did.
    pub fn dispatch(&mut self, pin: u8, value: &PinValue) -> bool {
        for entry in self.manual.iter_mut() {
            if entry.active && entry.pin == pin {
                (entry.handler)(value);
                return true;
            }
        }
        for entry in self.auto.write_handlers.iter_mut() {
            if entry.active && entry.pin == pin {
                (entry.handler)(value);
                return true;
            }
        }
        false
    }

    /// Fires the connect hooks, manual then auto.
    pub fn fire_connect(&mut self) {
        if let Some(handler) = self.connect.as_mut() {
            handler();
        }
        if let Some(handler) = self.auto.on_connect.as_mut() {
            handler();
        }
    }

    /// Fires the disconnect hooks, manual then auto.
    pub fn fire_disconnect(&mut self) {
        if let Some(handler) = self.disconnect.as_mut() {
            handler();
        }
        if let Some(handler) = self.auto.on_disconnect.as_mut() {
            handler();
        }
    }

    /// Hands a raw (topic, payload) pair to the observer, if any.
    pub fn fire_raw(&mut self, topic: &str, payload: &str) {
        if let Some(handler) = self.raw.as_mut() {
            handler(topic, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn dispatch_invokes_exactly_one_handler() {
        let first = Cell::new(0u32);
        let second = Cell::new(0u32);
        let mut h1 = |_: &PinValue| first.set(first.get() + 1);
        let mut h2 = |_: &PinValue| second.set(second.get() + 1);

        let mut registry = HandlerRegistry::new();
        registry.register_write(7, &mut h1).unwrap();
        registry.register_write(7, &mut h2).unwrap();

        assert!(registry.dispatch(7, &PinValue::from(1)));
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 0);
        assert!(!registry.dispatch(8, &PinValue::from(1)));
    }

    #[test]
    fn manual_handlers_take_precedence_over_auto() {
        let manual_hits = Cell::new(0u32);
        let auto_hits = Cell::new(0u32);
        let mut manual = |_: &PinValue| manual_hits.set(manual_hits.get() + 1);
        let mut auto_handler = |v: &PinValue| auto_hits.set(auto_hits.get() + v.as_int() as u32);
        let mut auto_table = [PinBinding::new(3, &mut auto_handler)];

        let mut registry = HandlerRegistry::new();
        registry.install_auto(AutoRegistrations {
            write_handlers: &mut auto_table,
            on_connect: None,
            on_disconnect: None,
        });
        registry.register_write(3, &mut manual).unwrap();

        assert!(registry.dispatch(3, &PinValue::from(5)));
        assert_eq!(manual_hits.get(), 1);
        assert_eq!(auto_hits.get(), 0);
    }

    #[test]
    fn auto_handlers_fill_in_for_unclaimed_pins() {
        let auto_hits = Cell::new(0u32);
        let mut auto_handler = |_: &PinValue| auto_hits.set(auto_hits.get() + 1);
        let mut auto_table = [PinBinding::new(9, &mut auto_handler)];

        let mut registry = HandlerRegistry::new();
        registry.install_auto(AutoRegistrations {
            write_handlers: &mut auto_table,
            on_connect: None,
            on_disconnect: None,
        });

        assert!(registry.dispatch(9, &PinValue::from(1)));
        assert_eq!(auto_hits.get(), 1);
    }

    #[test]
    fn overflow_reports_registry_full_and_keeps_earlier_entries() {
        let hits = Cell::new(0u32);
        let mut handlers: [_; MAX_PIN_HANDLERS + 1] =
            core::array::from_fn(|_| |_: &PinValue| hits.set(hits.get() + 1));

        let mut registry = HandlerRegistry::new();
        for (i, handler) in handlers.iter_mut().enumerate() {
            let result = registry.register_write(i as u8, handler);
            if i < MAX_PIN_HANDLERS {
                assert!(result.is_ok());
            } else {
                assert_eq!(result, Err(AgentError::RegistryFull));
            }
        }

        assert_eq!(registry.handler_count(), MAX_PIN_HANDLERS);
        assert!(registry.dispatch(0, &PinValue::from(1)));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn lifecycle_hooks_fire_manual_then_auto() {
        let order = Cell::new(0u32);
        let manual_seen = Cell::new(0u32);
        let auto_seen = Cell::new(0u32);
        let mut manual = || {
            order.set(order.get() + 1);
            manual_seen.set(order.get());
        };
        let mut auto_hook = || {
            order.set(order.get() + 1);
            auto_seen.set(order.get());
        };

        let mut registry = HandlerRegistry::new();
        registry.set_connect(&mut manual);
        registry.install_auto(AutoRegistrations {
            write_handlers: &mut [],
            on_connect: Some(&mut auto_hook),
            on_disconnect: None,
        });
        registry.fire_connect();

        assert_eq!(manual_seen.get(), 1);
        assert_eq!(auto_seen.get(), 2);
    }

    #[test]
    fn raw_observer_sees_every_pair() {
        let seen = Cell::new(0u32);
        let mut raw = |topic: &str, payload: &str| {
            assert_eq!(topic, "vwire/d/pin/V1");
            assert_eq!(payload, "22");
            seen.set(seen.get() + 1);
        };

        let mut registry = HandlerRegistry::new();
        registry.set_raw(&mut raw);
        registry.fire_raw("vwire/d/pin/V1", "22");
        assert_eq!(seen.get(), 1);
    }
}
