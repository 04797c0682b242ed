//! Transport layer abstraction.
//!
//! A transport performs one streaming request and reports back through
//! [`TransportSignal`]s. It exposes the response as a monotonically
//! growing text buffer that the source reads incrementally.

use crate::error::Result;
use std::fmt::Debug;
use tokio::sync::mpsc;
use url::Url;

/// Lifecycle stage reported by `ReadyStateChange` signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransportState {
    /// Created, not opened
    Unsent,
    /// `open` called
    Opened,
    /// Status and headers received
    HeadersReceived,
    /// Body is arriving
    Loading,
    /// Request finished, failed or was aborted
    Done,
}

/// Notification from a transport to its source.
///
/// Signals from one transport are delivered in the order it observed
/// them; `Load` always follows the last `Progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    /// More response text is available
    Progress,
    /// The response body completed
    Load,
    /// The transport changed state
    ReadyStateChange(TransportState),
    /// The request failed at the network level
    Error,
    /// The request was aborted
    Abort,
}

/// Sending half handed to a transport on [`Transport::send`].
pub type SignalSender = mpsc::UnboundedSender<TransportSignal>;

/// Receiving half held by the source for the live connection.
pub type SignalReceiver = mpsc::UnboundedReceiver<TransportSignal>;

/// Create a signal channel.
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// One streaming request.
///
/// Calls arrive in the order `open`, `set_header`*, `set_with_credentials`,
/// `send`. After `abort` the transport is not required to deliver any
/// further signals.
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::{SignalSender, Transport, TransportSignal};
/// use ssesource::Url;
///
/// #[derive(Debug, Default)]
/// struct CannedTransport {
///     text: String,
/// }
///
/// impl Transport for CannedTransport {
///     fn open(&mut self, _method: &str, _url: &Url) -> ssesource::Result<()> {
///         Ok(())
///     }
///     fn set_header(&mut self, _name: &str, _value: &str) -> ssesource::Result<()> {
///         Ok(())
///     }
///     fn set_with_credentials(&mut self, _enabled: bool) {}
///     fn send(&mut self, _body: &str, signals: SignalSender) -> ssesource::Result<()> {
///         self.text = "data: canned\n\n".to_string();
///         let _ = signals.send(TransportSignal::Progress);
///         let _ = signals.send(TransportSignal::Load);
///         Ok(())
///     }
///     fn status(&self) -> Option<u16> {
///         Some(200)
///     }
///     fn response_text_from(&self, offset: usize) -> String {
///         self.text.get(offset..).unwrap_or_default().to_string()
///     }
///     fn is_done(&self) -> bool {
///         true
///     }
///     fn abort(&mut self) {}
/// }
/// ```
pub trait Transport: Send + Debug {
    /// Prepare a request with the given method and URL.
    fn open(&mut self, method: &str, url: &Url) -> Result<()>;

    /// Add a request header. May be called repeatedly.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Whether ambient credentials are included.
    fn set_with_credentials(&mut self, enabled: bool);

    /// Start the request. Signals are reported on `signals`.
    fn send(&mut self, body: &str, signals: SignalSender) -> Result<()>;

    /// Response status, once known.
    fn status(&self) -> Option<u16>;

    /// Response text received so far, starting at byte `offset`.
    fn response_text_from(&self, offset: usize) -> String;

    /// All response text received so far.
    fn response_text(&self) -> String {
        self.response_text_from(0)
    }

    /// Whether the request has reached [`TransportState::Done`].
    fn is_done(&self) -> bool;

    /// Request immediate termination.
    fn abort(&mut self);

    /// Get the transport type name for debugging.
    fn transport_type(&self) -> &'static str {
        "unknown"
    }
}

/// Factory creating a fresh [`Transport`] for every connection attempt.
pub trait Connector: Send + Sync + Debug {
    /// Create a new, unopened transport.
    fn connect(&self) -> Box<dyn Transport>;
}

/// True for 2xx status codes.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_ordering() {
        assert!(TransportState::Unsent < TransportState::Opened);
        assert!(TransportState::Loading < TransportState::Done);
    }

    #[test]
    fn success_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(!is_success_status(199));
        assert!(!is_success_status(301));
        assert!(!is_success_status(500));
    }

    #[tokio::test]
    async fn signal_channel_preserves_order() {
        let (tx, mut rx) = signal_channel();
        tx.send(TransportSignal::Progress).unwrap();
        tx.send(TransportSignal::Load).unwrap();
        assert_eq!(rx.recv().await, Some(TransportSignal::Progress));
        assert_eq!(rx.recv().await, Some(TransportSignal::Load));
    }
}
