//! Shared components: parsing, transports and diagnostics.

#[cfg(feature = "http")]
pub mod http;
pub mod logging;
pub mod memory;
pub mod sse_parser;
pub mod transport;

// Re-export commonly used types
#[cfg(feature = "http")]
pub use http::{HttpConnector, HttpTransport};
pub use logging::{init_logging, DiagnosticSink, LogConfig, LogFormat, LogLevel, TracingDiagnostics};
pub use memory::{MemoryConnector, MemoryHandle, MemoryTransport};
pub use sse_parser::{parse_event_chunk, split_event_chunks, ChunkBuffer, SseEvent};
pub use transport::{
    Connector, SignalReceiver, SignalSender, Transport, TransportSignal, TransportState,
};
