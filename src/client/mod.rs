//! SSE client: the stream controller.
//!
//! [`SseSource`] owns one transport at a time, cuts the text it delivers
//! into SSE records and dispatches them to handlers and listeners. It is
//! driven by the caller: transport signals queue up until
//! [`process_pending`](SseSource::process_pending),
//! [`next_signal`](SseSource::next_signal) or [`run`](SseSource::run)
//! handles them, one at a time, on the caller's task.

use crate::error::Result;
use crate::shared::logging::{DiagnosticSink, TracingDiagnostics};
use crate::shared::sse_parser::{parse_event_chunk, ChunkBuffer};
use crate::shared::transport::{
    is_success_status, signal_channel, Connector, SignalReceiver, SignalSender, Transport,
    TransportSignal, TransportState,
};
use crate::types::{MessageEvent, ReadyState, SourceId, SseConfig, DEFAULT_EVENT_TYPE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};
use url::Url;

pub mod dispatch;

pub use dispatch::{listener, EventTarget, Listener};

/// Request header carrying the last seen event id on reconnect.
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

/// The live transport and the receiving end of its signals.
#[derive(Debug)]
struct Connection {
    transport: Box<dyn Transport>,
    signals: SignalReceiver,
    /// Set when the request could not be started; reported as the `error` data.
    setup_error: Option<String>,
}

/// Token for closing a source from places that cannot borrow it, such as
/// its own handlers.
///
/// The request is honoured before the next signal is handled, and no
/// further records from the current delivery are dispatched.
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::MemoryConnector;
/// use ssesource::{listener, ReadyState, SseSource};
///
/// let connector = MemoryConnector::new();
/// let mut source = SseSource::builder("http://localhost/chat")
///     .connector(connector.clone())
///     .build()
///     .unwrap();
///
/// let closer = source.closer();
/// source.add_event_listener("message", &listener(move |event| {
///     if event.data() == "[DONE]" {
///         closer.close();
///     }
/// }));
///
/// connector.last().unwrap().push("data: hi\n\ndata: [DONE]\n\ndata: late\n\n");
/// source.process_pending();
/// assert_eq!(source.ready_state(), ReadyState::Closed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Closer(Arc<AtomicBool>);

impl Closer {
    /// Ask the source to close.
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a close has been requested and not yet honoured.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Configurable Server-Sent Events client.
///
/// Unlike a browser `EventSource`, the request method, headers and body
/// are caller supplied.
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::MemoryConnector;
/// use ssesource::{listener, SseSource};
/// use std::sync::{Arc, Mutex};
///
/// let connector = MemoryConnector::new();
/// let mut source = SseSource::builder("http://localhost/v1/completions")
///     .header("Content-Type", "application/json")
///     .payload(r#"{"stream": true}"#)
///     .connector(connector.clone())
///     .build()
///     .unwrap();
///
/// let received = Arc::new(Mutex::new(Vec::new()));
/// let sink = received.clone();
/// source.add_event_listener("message", &listener(move |event| {
///     sink.lock().unwrap().push(event.data().to_string());
/// }));
///
/// let handle = connector.last().unwrap();
/// assert_eq!(handle.method().as_deref(), Some("POST"));
/// handle.push("data: hel");
/// handle.push("lo\n\n");
/// source.process_pending();
///
/// assert_eq!(*received.lock().unwrap(), vec!["hello".to_string()]);
/// ```
#[derive(Debug)]
pub struct SseSource {
    id: SourceId,
    url: Url,
    config: SseConfig,
    connector: Arc<dyn Connector>,
    diagnostics: Arc<dyn DiagnosticSink>,
    target: EventTarget,
    ready_state: ReadyState,
    buffer: ChunkBuffer,
    consumed: usize,
    last_event_id: String,
    connection: Option<Connection>,
    closer: Closer,
}

impl SseSource {
    /// Create a source with the given configuration and the default
    /// connector.
    pub fn new(url: impl Into<String>, config: SseConfig) -> Result<Self> {
        Self::builder(url).config(config).build()
    }

    /// Start building a source for `url`.
    pub fn builder(url: impl Into<String>) -> SseSourceBuilder {
        SseSourceBuilder::new(url)
    }

    /// Identifier carried by every event this source dispatches.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Stream URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SseConfig {
        &self.config
    }

    /// Current ready state.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Id of the most recent record that carried one; empty until then.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// Whether a transport handle is held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Token for requesting a close from inside handlers.
    pub fn closer(&self) -> Closer {
        self.closer.clone()
    }

    /// Register a listener for `event_type`.
    pub fn add_event_listener(&mut self, event_type: &str, listener: &Listener) {
        self.target.add_event_listener(event_type, listener);
    }

    /// Unregister a listener for `event_type`.
    pub fn remove_event_listener(&mut self, event_type: &str, listener: &Listener) {
        self.target.remove_event_listener(event_type, listener);
    }

    /// Set the single `on<type>` handler, run before any listener.
    pub fn set_handler(&mut self, event_type: &str, handler: Listener) {
        self.target.set_handler(event_type, handler);
    }

    /// Clear the `on<type>` handler.
    pub fn clear_handler(&mut self, event_type: &str) -> Option<Listener> {
        self.target.clear_handler(event_type)
    }

    /// Whether anything is registered for `event_type`.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.target.has_listeners(event_type)
    }

    /// Dispatch an event to the handler and listeners of its type.
    ///
    /// Returns `false` if any of them cancelled it.
    pub fn dispatch_event(&self, event: &mut MessageEvent) -> bool {
        event.set_source(self.id);
        if self.config.debug {
            self.diagnostics.event(event);
        }
        self.target.dispatch(event)
    }

    /// Open a new transport and send the configured request.
    ///
    /// No-op while a transport handle is held. A request that cannot be
    /// started is reported as an `error` event when signals are next
    /// processed.
    pub fn stream(&mut self) {
        if self.connection.is_some() {
            debug!("stream() ignored, already connected");
            return;
        }

        self.closer.take();
        self.set_ready_state(ReadyState::Connecting);

        self.buffer.reset();
        self.consumed = 0;

        let (tx, rx) = signal_channel();
        let mut transport = self.connector.connect();
        info!(
            transport = transport.transport_type(),
            "Connecting to SSE endpoint: {}", self.url
        );
        let setup_error = match self.start_request(transport.as_mut(), tx.clone()) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to start SSE request: {}", e);
                let _ = tx.send(TransportSignal::Error);
                Some(e.to_string())
            },
        };

        self.connection = Some(Connection {
            transport,
            signals: rx,
            setup_error,
        });
    }

    /// Abort the transport, release it and move to `Closed`.
    ///
    /// No-op when already closed, apart from releasing a transport that
    /// finished on its own, so that a later [`stream`](Self::stream) can
    /// reconnect.
    ///
    /// Closing drops the transport's signals, so no `abort` event follows a
    /// caller-initiated close. Only the `closed` ready-state change is
    /// dispatched. An `abort` event means the transport gave up on its own.
    pub fn close(&mut self) {
        if self.ready_state == ReadyState::Closed {
            if self.connection.take().is_some() {
                debug!("Released finished transport");
            }
            return;
        }

        if let Some(mut connection) = self.connection.take() {
            if !connection.transport.is_done() {
                connection.transport.abort();
            }
        }

        info!("SSE source closed");
        self.set_ready_state(ReadyState::Closed);
    }

    /// Handle every signal already delivered, without waiting.
    ///
    /// Returns the number of signals handled.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        loop {
            if self.honor_close_request() {
                break;
            }
            let Some(connection) = self.connection.as_mut() else {
                break;
            };
            match connection.signals.try_recv() {
                Ok(signal) => {
                    self.handle_signal(signal);
                    processed += 1;
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.on_signals_ended();
                    break;
                },
            }
        }
        processed
    }

    /// Wait for the next signal and handle it.
    ///
    /// Returns `false` when there is nothing left to wait for: the source
    /// is closed, has no transport, or its signal channel has ended.
    pub async fn next_signal(&mut self) -> bool {
        if self.honor_close_request() || self.ready_state == ReadyState::Closed {
            return false;
        }
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        match connection.signals.recv().await {
            Some(signal) => {
                self.handle_signal(signal);
                self.honor_close_request();
                true
            },
            None => {
                self.on_signals_ended();
                false
            },
        }
    }

    /// Handle signals until the source is closed.
    pub async fn run(&mut self) {
        while self.ready_state != ReadyState::Closed && self.next_signal().await {}
    }

    fn start_request(&self, transport: &mut dyn Transport, signals: SignalSender) -> Result<()> {
        transport.open(self.config.effective_method(), &self.url)?;
        for (name, value) in &self.config.headers {
            transport.set_header(name, value)?;
        }
        if !self.last_event_id.is_empty() {
            transport.set_header(LAST_EVENT_ID_HEADER, &self.last_event_id)?;
        }
        transport.set_with_credentials(self.config.with_credentials);
        transport.send(&self.config.payload, signals)
    }

    fn set_ready_state(&mut self, state: ReadyState) {
        debug!("Ready state -> {}", state);
        self.ready_state = state;
        self.dispatch_event(&mut MessageEvent::ready_state_change(state));
    }

    fn honor_close_request(&mut self) -> bool {
        if self.closer.take() {
            self.close();
            return true;
        }
        false
    }

    fn handle_signal(&mut self, signal: TransportSignal) {
        if self.ready_state == ReadyState::Closed {
            debug!(?signal, "Ignoring transport signal after close");
            return;
        }
        match signal {
            TransportSignal::Progress => {
                self.on_progress();
            },
            TransportSignal::Load => self.on_load(),
            TransportSignal::ReadyStateChange(TransportState::Done) => self.on_transport_done(),
            TransportSignal::ReadyStateChange(_) => {},
            TransportSignal::Error => self.on_failure(),
            TransportSignal::Abort => self.on_abort(),
        }
    }

    /// Consume newly delivered text. Returns `false` if the response failed
    /// or there is no transport.
    fn on_progress(&mut self) -> bool {
        let Some(connection) = &self.connection else {
            return false;
        };
        if !connection.transport.status().is_some_and(is_success_status) {
            self.on_failure();
            return false;
        }

        if self.ready_state == ReadyState::Connecting {
            self.dispatch_event(&mut MessageEvent::new("open"));
            self.set_ready_state(ReadyState::Open);
        }

        let Some(connection) = &self.connection else {
            return false;
        };
        let text = connection.transport.response_text_from(self.consumed);
        self.consumed += text.len();

        for chunk in self.buffer.push(&text) {
            if self.closer.is_requested() {
                break;
            }
            self.dispatch_chunk(&chunk);
        }
        true
    }

    fn on_load(&mut self) {
        if !self.on_progress() {
            return;
        }
        let rest = self.buffer.finish();
        if !self.closer.is_requested() {
            self.dispatch_chunk(&rest);
        }
    }

    fn on_transport_done(&mut self) {
        if self.ready_state != ReadyState::Closed {
            self.set_ready_state(ReadyState::Closed);
        }
    }

    fn on_signals_ended(&mut self) {
        debug!("Transport signal channel ended");
        self.on_transport_done();
    }

    fn on_failure(&mut self) {
        let data = match self.connection.as_mut() {
            Some(connection) => connection
                .setup_error
                .take()
                .unwrap_or_else(|| connection.transport.response_text()),
            None => String::new(),
        };
        warn!(
            status = self.connection.as_ref().and_then(|c| c.transport.status()),
            "SSE stream failed"
        );
        self.dispatch_event(&mut MessageEvent::new("error").with_data(data));
        self.close();
    }

    fn on_abort(&mut self) {
        info!("SSE request aborted");
        self.dispatch_event(&mut MessageEvent::new("abort"));
        self.close();
    }

    /// Parse one record chunk and dispatch its event, if any.
    fn dispatch_chunk(&mut self, chunk: &str) {
        if self.config.debug {
            self.diagnostics.chunk(chunk);
        }
        let Some(record) = parse_event_chunk(chunk) else {
            return;
        };
        if let Some(id) = &record.id {
            self.last_event_id.clone_from(id);
        }

        let event_type = record
            .event
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        let mut event = MessageEvent::new(event_type)
            .with_data(record.data.unwrap_or_default())
            .with_id(record.id)
            .with_last_event_id(self.last_event_id.clone());
        self.dispatch_event(&mut event);
    }
}

/// Builder for [`SseSource`].
#[derive(Debug)]
pub struct SseSourceBuilder {
    url: String,
    config: SseConfig,
    connector: Option<Arc<dyn Connector>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl SseSourceBuilder {
    /// Create a builder for `url` with default configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: SseConfig::default(),
            connector: None,
            diagnostics: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SseConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Add several request headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the request body.
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.config.payload = payload.into();
        self
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.config.method = Some(method.into());
        self
    }

    /// Include ambient credentials.
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.config.with_credentials = enabled;
        self
    }

    /// Whether `build` starts streaming.
    pub fn start(mut self, start: bool) -> Self {
        self.config.start = start;
        self
    }

    /// Emit chunk and event diagnostics.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Use a custom connector.
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Use a custom diagnostic sink for `debug` traces.
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Some(Arc::new(sink));
        self
    }

    /// Build the source, streaming immediately unless `start(false)`.
    pub fn build(self) -> Result<SseSource> {
        let url = Url::parse(&self.url)?;
        self.config.validate()?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => default_connector()?,
        };

        let mut source = SseSource {
            id: SourceId::new(),
            url,
            config: self.config,
            connector,
            diagnostics: self
                .diagnostics
                .unwrap_or_else(|| Arc::new(TracingDiagnostics)),
            target: EventTarget::new(),
            ready_state: ReadyState::Initializing,
            buffer: ChunkBuffer::new(),
            consumed: 0,
            last_event_id: String::new(),
            connection: None,
            closer: Closer::default(),
        };

        if source.config.start {
            source.stream();
        }
        Ok(source)
    }
}

#[cfg(feature = "http")]
fn default_connector() -> Result<Arc<dyn Connector>> {
    Ok(Arc::new(crate::shared::http::HttpConnector::new()))
}

#[cfg(not(feature = "http"))]
fn default_connector() -> Result<Arc<dyn Connector>> {
    Err(crate::error::Error::validation(
        "no connector configured and the `http` feature is disabled",
    ))
}
