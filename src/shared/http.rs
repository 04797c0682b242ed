//! HTTP transport backed by `reqwest`.
//!
//! The request runs on a spawned tokio task. Body chunks are decoded as
//! UTF-8 and appended to a shared response buffer, each append reported as
//! a [`TransportSignal::Progress`].

use crate::error::{Result, TransportError};
use crate::shared::transport::{
    Connector, SignalSender, Transport, TransportSignal, TransportState,
};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<u16>,
    text: String,
    done: bool,
}

/// Streaming HTTP request.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    request: Option<(Method, Url)>,
    headers: HeaderMap,
    with_credentials: bool,
    response: Arc<RwLock<ResponseState>>,
    signals: Option<SignalSender>,
    task: Option<JoinHandle<()>>,
}

impl HttpTransport {
    /// Create a transport issuing its request through `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            request: None,
            headers: HeaderMap::new(),
            with_credentials: false,
            response: Arc::new(RwLock::new(ResponseState::default())),
            signals: None,
            task: None,
        }
    }

    /// Credentials flag recorded by `set_with_credentials`.
    ///
    /// There is no ambient credential store outside a browser, so the flag
    /// does not change the request on the wire.
    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }
}

impl Transport for HttpTransport {
    fn open(&mut self, method: &str, url: &Url) -> Result<()> {
        if self.signals.is_some() {
            return Err(TransportError::AlreadySent.into());
        }
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| TransportError::InvalidMethod(method.to_string()))?;
        self.request = Some((method, url.clone()));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        if self.request.is_none() {
            return Err(TransportError::NotOpened.into());
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        self.headers.append(header_name, header_value);
        Ok(())
    }

    fn set_with_credentials(&mut self, enabled: bool) {
        self.with_credentials = enabled;
    }

    fn send(&mut self, body: &str, signals: SignalSender) -> Result<()> {
        if self.signals.is_some() {
            return Err(TransportError::AlreadySent.into());
        }
        let (method, url) = self.request.clone().ok_or(TransportError::NotOpened)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Request(format!("no tokio runtime: {}", e)))?;

        debug!("Sending {} {}", method, url);
        let mut builder = self
            .client
            .request(method, url)
            .headers(std::mem::take(&mut self.headers));
        if !body.is_empty() {
            builder = builder.body(body.to_string());
        }

        let task = runtime.spawn(stream_response(
            builder,
            self.response.clone(),
            signals.clone(),
        ));
        self.signals = Some(signals);
        self.task = Some(task);
        Ok(())
    }

    fn status(&self) -> Option<u16> {
        self.response.read().status
    }

    fn response_text_from(&self, offset: usize) -> String {
        let response = self.response.read();
        response.text.get(offset..).unwrap_or_default().to_string()
    }

    fn is_done(&self) -> bool {
        self.response.read().done
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let was_done = std::mem::replace(&mut self.response.write().done, true);
        if was_done {
            return;
        }
        if let Some(signals) = &self.signals {
            let _ = signals.send(TransportSignal::Abort);
            let _ = signals.send(TransportSignal::ReadyStateChange(TransportState::Done));
        }
    }

    fn transport_type(&self) -> &'static str {
        "http"
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drive one request to completion, reporting through `signals`.
async fn stream_response(
    request: RequestBuilder,
    response: Arc<RwLock<ResponseState>>,
    signals: SignalSender,
) {
    let outcome = read_body(request, &response, &signals).await;
    let signal = match outcome {
        Ok(()) => TransportSignal::Load,
        Err(e) => {
            warn!("SSE request failed: {}", e);
            TransportSignal::Error
        },
    };

    response.write().done = true;
    // A closed receiver means the source has already let go of this request.
    let _ = signals.send(signal);
    let _ = signals.send(TransportSignal::ReadyStateChange(TransportState::Done));
}

async fn read_body(
    request: RequestBuilder,
    response: &RwLock<ResponseState>,
    signals: &SignalSender,
) -> std::result::Result<(), TransportError> {
    let mut res = request
        .send()
        .await
        .map_err(|e| TransportError::Request(e.to_string()))?;

    response.write().status = Some(res.status().as_u16());
    let _ = signals.send(TransportSignal::ReadyStateChange(
        TransportState::HeadersReceived,
    ));

    let mut decoder = Utf8Decoder::default();
    while let Some(chunk) = res
        .chunk()
        .await
        .map_err(|e| TransportError::Request(e.to_string()))?
    {
        append(response, signals, &decoder.decode(&chunk));
    }
    append(response, signals, &decoder.finish());
    Ok(())
}

fn append(response: &RwLock<ResponseState>, signals: &SignalSender, text: &str) {
    if text.is_empty() {
        return;
    }
    response.write().text.push_str(text);
    let _ = signals.send(TransportSignal::Progress);
}

/// Incremental UTF-8 decoder.
///
/// A multi-byte sequence split across chunks is held back until it is
/// complete. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                    break;
                },
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid;
                        },
                        // Incomplete trailing sequence: wait for the next chunk.
                        None => {
                            start = valid_end;
                            break;
                        },
                    }
                },
            }
        }
        self.pending.drain(..start);
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Connector issuing requests through a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    /// Create a connector with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector reusing an existing client (pooling, TLS, proxies).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Box<dyn Transport> {
        Box::new(HttpTransport::new(self.client.clone()))
    }
}
