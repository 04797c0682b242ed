//! Caller-supplied configuration for an [`SseSource`](crate::SseSource).

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Configuration options.
///
/// Field names follow the camelCase option names when (de)serialized, and
/// every field has a default, so partial documents are accepted.
///
/// # Examples
///
/// ```rust
/// use ssesource::SseConfig;
///
/// let config = SseConfig::from_json(r#"{"payload": "{}", "withCredentials": true}"#).unwrap();
/// assert_eq!(config.effective_method(), "POST");
/// assert!(config.with_credentials);
/// assert!(config.start);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SseConfig {
    /// Headers sent on every `stream()` call, in insertion order.
    pub headers: IndexMap<String, String>,
    /// Request body; empty means no body.
    pub payload: String,
    /// HTTP method. Defaults to `POST` with a payload, `GET` without.
    pub method: Option<String>,
    /// Whether the transport includes ambient credentials.
    pub with_credentials: bool,
    /// Whether construction starts streaming immediately.
    pub start: bool,
    /// Emit diagnostics for every chunk and event processed.
    pub debug: bool,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            headers: IndexMap::new(),
            payload: String::new(),
            method: None,
            with_credentials: false,
            start: true,
            debug: false,
        }
    }
}

impl SseConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Method that will be used for the request.
    pub fn effective_method(&self) -> &str {
        match self.method.as_deref() {
            Some(method) => method,
            None if self.payload.is_empty() => "GET",
            None => "POST",
        }
    }

    /// Check method and header names are usable tokens.
    pub fn validate(&self) -> Result<()> {
        if let Some(method) = &self.method {
            if !is_token(method) {
                return Err(Error::validation(format!("invalid method: {:?}", method)));
            }
        }
        if let Some(name) = self.headers.keys().find(|name| !is_token(name)) {
            return Err(Error::validation(format!("invalid header name: {:?}", name)));
        }
        Ok(())
    }
}

/// RFC 9110 token: non-empty, visible ASCII without delimiters.
fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "", "GET")]
    #[case(None, "{\"q\":1}", "POST")]
    #[case(Some("PUT"), "", "PUT")]
    #[case(Some("GET"), "body", "GET")]
    fn effective_method(#[case] method: Option<&str>, #[case] payload: &str, #[case] expected: &str) {
        let config = SseConfig {
            method: method.map(str::to_string),
            payload: payload.to_string(),
            ..SseConfig::default()
        };
        assert_eq!(config.effective_method(), expected);
    }

    #[test]
    fn defaults() {
        let config = SseConfig::default();
        assert!(config.start);
        assert!(!config.debug);
        assert!(!config.with_credentials);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn json_preserves_header_order() {
        let config =
            SseConfig::from_json(r#"{"headers": {"X-B": "2", "X-A": "1"}, "start": false}"#)
                .unwrap();
        let names: Vec<_> = config.headers.keys().cloned().collect();
        assert_eq!(names, vec!["X-B", "X-A"]);
        assert!(!config.start);
    }

    #[rstest]
    #[case(r#"{"method": "GE T"}"#)]
    #[case(r#"{"method": ""}"#)]
    #[case(r#"{"headers": {"Bad Header": "x"}}"#)]
    fn invalid_config_rejected(#[case] json: &str) {
        assert!(matches!(SseConfig::from_json(json), Err(Error::Validation(_))));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        assert!(matches!(
            SseConfig::from_json("{"),
            Err(Error::Serialization(_))
        ));
    }
}
