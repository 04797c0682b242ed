//! Event handler registry.
//!
//! Each event type has two independent sinks: one optional `on<type>`
//! handler slot and an ordered list of listeners. The handler always runs
//! first; cancelling from the handler skips the listeners entirely.

use crate::types::MessageEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with a dispatched event.
///
/// Listener identity is `Arc` pointer identity: registering the same
/// `Arc` twice for one type is a no-op, and removal needs that `Arc`.
pub type Listener = Arc<dyn Fn(&mut MessageEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
///
/// # Examples
///
/// ```rust
/// use ssesource::{listener, MessageEvent};
///
/// let on_done = listener(|event: &mut MessageEvent| {
///     if event.data() == "[DONE]" {
///         event.prevent_default();
///     }
/// });
/// let mut event = MessageEvent::new("message").with_data("[DONE]");
/// on_done(&mut event);
/// assert!(event.default_prevented());
/// ```
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&mut MessageEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handler slots and listener lists keyed by event type.
#[derive(Default)]
pub struct EventTarget {
    handlers: HashMap<String, Listener>,
    listeners: HashMap<String, Vec<Listener>>,
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("EventTarget")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("listeners", &counts)
            .finish()
    }
}

impl EventTarget {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `event_type` unless already registered.
    pub fn add_event_listener(&mut self, event_type: &str, listener: &Listener) {
        let listeners = self.listeners.entry(event_type.to_string()).or_default();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, listener)) {
            listeners.push(listener.clone());
        }
    }

    /// Remove a listener; the type entry goes away with its last listener.
    pub fn remove_event_listener(&mut self, event_type: &str, listener: &Listener) {
        let Some(listeners) = self.listeners.get_mut(event_type) else {
            return;
        };
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        if listeners.is_empty() {
            self.listeners.remove(event_type);
        }
    }

    /// Fill the `on<type>` slot, replacing any previous handler.
    pub fn set_handler(&mut self, event_type: &str, handler: Listener) {
        self.handlers.insert(event_type.to_string(), handler);
    }

    /// Empty the `on<type>` slot.
    pub fn clear_handler(&mut self, event_type: &str) -> Option<Listener> {
        self.handlers.remove(event_type)
    }

    /// Whether a handler or any listener is registered for `event_type`.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type) || self.listeners.contains_key(event_type)
    }

    /// Number of listeners (excluding the handler slot) for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, Vec::len)
    }

    /// Run the handler and listeners for the event's type.
    ///
    /// Returns `false` if any of them cancelled the event. Once past the
    /// handler every listener runs, even after a cancellation.
    pub fn dispatch(&self, event: &mut MessageEvent) -> bool {
        if let Some(handler) = self.handlers.get(event.event_type()) {
            handler(event);
            if event.default_prevented() {
                return false;
            }
        }

        if let Some(listeners) = self.listeners.get(event.event_type()) {
            for listener in listeners {
                listener(event);
            }
        }

        !event.default_prevented()
    }
}
