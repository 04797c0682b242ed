//! Error types for the SSE client.
//!
//! Stream-level failures (non-2xx responses, network errors, aborts) are
//! never returned from [`SseSource::stream`](crate::SseSource::stream) or
//! [`SseSource::close`](crate::SseSource::close); they surface as `error`
//! and `abort` events. The types here cover construction, configuration
//! and the transport trait seam.

use thiserror::Error;

/// Result type alias for SSE client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transport-specific errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be built or sent
    #[error("Request error: {0}")]
    Request(String),

    /// Method name is not a valid HTTP token
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Header name or value is not valid
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Operation requires `open` to have been called first
    #[error("Transport not opened")]
    NotOpened,

    /// `send` was called twice on the same transport
    #[error("Request already sent")]
    AlreadySent,
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Validation(format!("invalid url: {}", err))
    }
}

impl Error {
    /// Create a validation error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::Error;
    ///
    /// let err = Error::validation("method must not be empty");
    /// assert_eq!(err.to_string(), "Validation error: method must not be empty");
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error originated in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_converts() {
        let err: Error = TransportError::NotOpened.into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport error: Transport not opened");
    }

    #[test]
    fn url_error_is_validation() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn anyhow_error_is_transparent() {
        let err: Error = anyhow::anyhow!("connection refused").into();
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "connection refused");
    }
}
