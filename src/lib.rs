//! # ssesource
//!
//! A configurable Server-Sent Events client.
//!
//! Browser `EventSource` only issues bare `GET` requests. This crate keeps
//! the same event model (ready states, `open`/`message`/`error` events,
//! `on<type>` handlers plus listener lists) but lets the caller choose the
//! method, headers and request body, which is what streaming APIs that
//! take a JSON prompt over `POST` need.
//!
//! - Record framing that tolerates event boundaries split anywhere across
//!   network reads, in all three line-ending conventions
//! - `Last-Event-ID` carried into caller-initiated reconnects
//! - Pluggable transports: `reqwest` over HTTP, or in memory for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ssesource::{listener, SseSource};
//!
//! # async fn example() -> ssesource::Result<()> {
//! let mut source = SseSource::builder("https://api.example.com/v1/chat")
//!     .header("Content-Type", "application/json")
//!     .header("Authorization", "Bearer token")
//!     .payload(r#"{"messages": [], "stream": true}"#)
//!     .build()?;
//!
//! let closer = source.closer();
//! source.add_event_listener("message", &listener(move |event| {
//!     if event.data() == "[DONE]" {
//!         closer.close();
//!     } else {
//!         println!("{}", event.data());
//!     }
//! }));
//!
//! source.run().await;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Allow certain clippy lints that are too pedantic for this codebase
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::multiple_crate_versions)]

pub mod client;
pub mod error;
pub mod shared;
pub mod types;

// Re-export commonly used types
pub use client::{listener, Closer, EventTarget, Listener, SseSource, SseSourceBuilder};
pub use error::{Error, Result, TransportError};
pub use shared::{Connector, SseEvent, Transport, TransportSignal};
pub use types::{MessageEvent, ReadyState, SourceId, SseConfig};
pub use url::Url;

#[cfg(feature = "http")]
pub use shared::HttpConnector;
