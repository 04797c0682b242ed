//! Core types shared by the client and its transports.
//!
//! This module contains the ready-state machine values, the listener-facing
//! event type and the caller configuration.

pub mod config;
pub mod event;

pub use config::SseConfig;
pub use event::{MessageEvent, ReadyState, SourceId, DEFAULT_EVENT_TYPE};
