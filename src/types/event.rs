//! Ready states and the listener-facing event type.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Event type used for records without an `event` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Connection lifecycle stage of an [`SseSource`](crate::SseSource).
///
/// # Examples
///
/// ```rust
/// use ssesource::ReadyState;
///
/// assert_eq!(ReadyState::Initializing.code(), -1);
/// assert_eq!(ReadyState::Closed.to_string(), "closed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Constructed, transport not opened yet
    Initializing,
    /// Transport opened, waiting for the first response data
    Connecting,
    /// Response data observed, events are being delivered
    Open,
    /// Terminal
    Closed,
}

impl ReadyState {
    /// Numeric state code (`-1`, `0`, `1`, `2`).
    pub fn code(self) -> i8 {
        match self {
            Self::Initializing => -1,
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closed => 2,
        }
    }

    /// Name used in `Display` and serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the [`SseSource`](crate::SseSource) an event came from.
///
/// Events refer back to their source by id only; they never keep the
/// source alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(Uuid);

impl SourceId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An event dispatched to handlers and listeners.
///
/// Produced from a parsed SSE record (`message` or a custom type) or by
/// the source itself (`open`, `error`, `abort`, `readystatechange`).
/// Any handler may call [`prevent_default`](Self::prevent_default) to
/// cancel it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    event_type: String,
    data: String,
    id: Option<String>,
    last_event_id: String,
    ready_state: Option<ReadyState>,
    source: Option<SourceId>,
    default_prevented: bool,
}

impl MessageEvent {
    /// Create an event of the given type with empty data.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::MessageEvent;
    ///
    /// let mut event = MessageEvent::new("ping").with_data("pong");
    /// assert_eq!(event.event_type(), "ping");
    /// assert_eq!(event.data(), "pong");
    ///
    /// event.prevent_default();
    /// assert!(event.default_prevented());
    /// ```
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: String::new(),
            id: None,
            last_event_id: String::new(),
            ready_state: None,
            source: None,
            default_prevented: false,
        }
    }

    /// Set the data payload.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the record id.
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Set the last event id snapshot.
    pub fn with_last_event_id(mut self, last_event_id: impl Into<String>) -> Self {
        self.last_event_id = last_event_id.into();
        self
    }

    pub(crate) fn ready_state_change(state: ReadyState) -> Self {
        let mut event = Self::new("readystatechange");
        event.ready_state = Some(state);
        event
    }

    pub(crate) fn set_source(&mut self, source: SourceId) {
        self.source = Some(source);
    }

    /// Effective event type.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Data payload; empty when the record had no `data` field.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The record's own `id` field, verbatim.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Running last event id of the source at dispatch time.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// New state carried by `readystatechange` events.
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.ready_state
    }

    /// Source this event was dispatched by.
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Whether a handler cancelled this event.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Cancel the event; stops fan-out past the `on<type>` handler.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_codes() {
        let codes: Vec<_> = [
            ReadyState::Initializing,
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closed,
        ]
        .iter()
        .map(|s| s.code())
        .collect();
        assert_eq!(codes, vec![-1, 0, 1, 2]);
    }

    #[test]
    fn ready_state_serializes_lowercase() {
        let json = serde_json::to_string(&ReadyState::Open).unwrap();
        assert_eq!(json, "\"open\"");
    }

    #[test]
    fn ready_state_change_carries_state() {
        let event = MessageEvent::ready_state_change(ReadyState::Connecting);
        assert_eq!(event.event_type(), "readystatechange");
        assert_eq!(event.ready_state(), Some(ReadyState::Connecting));
        assert_eq!(event.data(), "");
        assert!(event.source().is_none());
    }

    #[test]
    fn source_ids_are_unique() {
        assert_ne!(SourceId::new(), SourceId::new());
    }
}
