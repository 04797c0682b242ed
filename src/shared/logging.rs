//! Logging setup and the per-source diagnostic sink.
//!
//! Lifecycle logging goes through `tracing`. Chunk and event traces are
//! only produced when a source is configured with `debug`, and they go to
//! an injected [`DiagnosticSink`] rather than straight to the global
//! subscriber.

use crate::types::MessageEvent;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Target used by [`TracingDiagnostics`].
pub const DIAGNOSTICS_TARGET: &str = "ssesource::diagnostics";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level.
    pub level: LogLevel,

    /// Whether to include the event target.
    pub source_location: bool,

    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level logging
    Trace,
    /// Debug level logging
    Debug,
    /// Info level logging
    Info,
    /// Warning level logging
    Warn,
    /// Error level logging
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs
    Json,
    /// Pretty formatted logs
    Pretty,
    /// Compact formatted logs
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            source_location: true,
            format: LogFormat::Pretty,
        }
    }
}

/// Initialize a global subscriber with configuration.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(config.source_location);

    let fmt_layer = match config.format {
        LogFormat::Json => fmt_layer.json().with_ansi(false).boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
        LogFormat::Compact => fmt_layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Receiver for `debug` traces of an [`SseSource`](crate::SseSource).
pub trait DiagnosticSink: Send + Sync + Debug {
    /// A record chunk is about to be parsed.
    fn chunk(&self, chunk: &str);

    /// An event is about to be dispatched.
    fn event(&self, event: &MessageEvent);
}

/// Default sink, forwarding to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn chunk(&self, chunk: &str) {
        tracing::debug!(target: DIAGNOSTICS_TARGET, chunk, "parsing chunk");
    }

    fn event(&self, event: &MessageEvent) {
        tracing::debug!(
            target: DIAGNOSTICS_TARGET,
            event_type = event.event_type(),
            id = event.id(),
            last_event_id = event.last_event_id(),
            data = event.data(),
            "dispatching event"
        );
    }
}
