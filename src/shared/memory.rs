//! In-memory transport.
//!
//! [`MemoryConnector`] hands out [`MemoryTransport`]s and keeps a
//! [`MemoryHandle`] to each one, so a test (or a replay of a recorded
//! stream) can script the response and inspect the request the source made.

use crate::error::{Result, TransportError};
use crate::shared::transport::{
    Connector, SignalSender, Transport, TransportSignal, TransportState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Default)]
struct MemoryState {
    method: Option<String>,
    url: Option<Url>,
    headers: Vec<(String, String)>,
    with_credentials: bool,
    body: Option<String>,
    status: Option<u16>,
    text: String,
    done: bool,
    aborted: bool,
    signals: Option<SignalSender>,
}

impl MemoryState {
    fn signal(&self, signal: TransportSignal) {
        if let Some(signals) = &self.signals {
            // The source drops its receiver on close; late signals are discarded.
            let _ = signals.send(signal);
        }
    }

    fn finish_with(&mut self, signal: TransportSignal) {
        if self.done {
            return;
        }
        self.done = true;
        self.signal(signal);
        self.signal(TransportSignal::ReadyStateChange(TransportState::Done));
    }
}

/// Scripted transport backed by shared memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Create a transport and the handle driving it.
    pub fn new() -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: state.clone(),
            },
            MemoryHandle { state },
        )
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, method: &str, url: &Url) -> Result<()> {
        let mut state = self.state.lock();
        if state.body.is_some() {
            return Err(TransportError::AlreadySent.into());
        }
        state.method = Some(method.to_string());
        state.url = Some(url.clone());
        state.signal(TransportSignal::ReadyStateChange(TransportState::Opened));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.method.is_none() {
            return Err(TransportError::NotOpened.into());
        }
        state.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_with_credentials(&mut self, enabled: bool) {
        self.state.lock().with_credentials = enabled;
    }

    fn send(&mut self, body: &str, signals: SignalSender) -> Result<()> {
        let mut state = self.state.lock();
        if state.method.is_none() {
            return Err(TransportError::NotOpened.into());
        }
        if state.body.is_some() {
            return Err(TransportError::AlreadySent.into());
        }
        state.body = Some(body.to_string());
        state.signals = Some(signals);
        Ok(())
    }

    fn status(&self) -> Option<u16> {
        self.state.lock().status
    }

    fn response_text_from(&self, offset: usize) -> String {
        let state = self.state.lock();
        state.text.get(offset..).unwrap_or_default().to_string()
    }

    fn is_done(&self) -> bool {
        self.state.lock().done
    }

    fn abort(&mut self) {
        let mut state = self.state.lock();
        state.aborted = true;
        state.finish_with(TransportSignal::Abort);
    }

    fn transport_type(&self) -> &'static str {
        "memory"
    }
}

/// Controls one [`MemoryTransport`] and records what was sent on it.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    /// Set the response status and report headers received.
    pub fn respond(&self, status: u16) {
        let mut state = self.state.lock();
        state.status = Some(status);
        state.signal(TransportSignal::ReadyStateChange(
            TransportState::HeadersReceived,
        ));
    }

    /// Append response text and report progress.
    ///
    /// Responds `200` first if no status was set.
    pub fn push(&self, text: &str) {
        let mut state = self.state.lock();
        if state.status.is_none() {
            state.status = Some(200);
        }
        state.text.push_str(text);
        state.signal(TransportSignal::Progress);
    }

    /// Complete the response body.
    pub fn finish(&self) {
        self.state.lock().finish_with(TransportSignal::Load);
    }

    /// Fail the request at the network level.
    pub fn fail(&self) {
        self.state.lock().finish_with(TransportSignal::Error);
    }

    /// Abort the request from the transport side.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        state.finish_with(TransportSignal::Abort);
    }

    /// Method passed to `open`.
    pub fn method(&self) -> Option<String> {
        self.state.lock().method.clone()
    }

    /// URL passed to `open`.
    pub fn url(&self) -> Option<Url> {
        self.state.lock().url.clone()
    }

    /// Headers in the order they were set.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.state.lock().headers.clone()
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Body passed to `send`, if sent.
    pub fn body(&self) -> Option<String> {
        self.state.lock().body.clone()
    }

    /// Whether `send` was called.
    pub fn is_sent(&self) -> bool {
        self.state.lock().body.is_some()
    }

    /// Credentials flag set before sending.
    pub fn with_credentials(&self) -> bool {
        self.state.lock().with_credentials
    }

    /// Whether the request was aborted by either side.
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }
}

/// Connector producing [`MemoryTransport`]s.
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::MemoryConnector;
/// use ssesource::SseSource;
///
/// let connector = MemoryConnector::new();
/// let mut source = SseSource::builder("http://localhost/events")
///     .connector(connector.clone())
///     .build()
///     .unwrap();
///
/// let handle = connector.last().unwrap();
/// handle.push("data: hi\n\n");
/// source.process_pending();
/// assert_eq!(handle.method().as_deref(), Some("GET"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    connections: Arc<Mutex<Vec<MemoryHandle>>>,
}

impl MemoryConnector {
    /// Create a connector with no connections yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles of every transport created so far, oldest first.
    pub fn connections(&self) -> Vec<MemoryHandle> {
        self.connections.lock().clone()
    }

    /// Handle of the most recently created transport.
    pub fn last(&self) -> Option<MemoryHandle> {
        self.connections.lock().last().cloned()
    }

    /// Number of transports created.
    pub fn count(&self) -> usize {
        self.connections.lock().len()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self) -> Box<dyn Transport> {
        let (transport, handle) = MemoryTransport::new();
        self.connections.lock().push(handle);
        Box::new(transport)
    }
}
