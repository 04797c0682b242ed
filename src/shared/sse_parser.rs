//! Server-Sent Events (SSE) record framing and parsing.
//!
//! The wire format is line oriented: `field: value` lines grouped into
//! records separated by a single blank line. This module provides the two
//! pure pieces of the pipeline:
//!
//! - [`ChunkBuffer`] accumulates incrementally delivered text and cuts it
//!   into complete record chunks on blank-line boundaries.
//! - [`parse_event_chunk`] folds one record chunk into an [`SseEvent`].

use std::fmt;

/// Separator between a field name and its value.
pub const FIELD_SEPARATOR: char = ':';

/// SSE record parsed from the stream.
///
/// Every field is optional: a record only carries what the server sent.
/// Unknown field names never reach this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID for resumption
    pub id: Option<String>,
    /// Event type/name
    pub event: Option<String>,
    /// Event data, `data` lines joined with `\n`
    pub data: Option<String>,
    /// Raw retry field, kept as sent
    pub retry: Option<String>,
}

impl SseEvent {
    /// Create a new SSE record with data.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::shared::sse_parser::SseEvent;
    ///
    /// let event = SseEvent::new("Hello, world!");
    /// assert_eq!(event.data.as_deref(), Some("Hello, world!"));
    /// assert!(event.id.is_none());
    /// assert!(event.event.is_none());
    /// ```
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Set the event ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the event type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::shared::sse_parser::SseEvent;
    ///
    /// let event = SseEvent::new("data").with_event("custom");
    /// assert_eq!(event.event, Some("custom".to_string()));
    /// ```
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the retry field.
    pub fn with_retry(mut self, retry: impl Into<String>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// True when no recognized field was present in the record.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.event.is_none() && self.data.is_none() && self.retry.is_none()
    }

    /// Retry interval in milliseconds, if the retry field is a valid integer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::shared::sse_parser::SseEvent;
    ///
    /// assert_eq!(SseEvent::default().with_retry("3000").retry_millis(), Some(3000));
    /// assert_eq!(SseEvent::default().with_retry("soon").retry_millis(), None);
    /// ```
    pub fn retry_millis(&self) -> Option<u64> {
        self.retry.as_deref().and_then(|r| r.parse().ok())
    }

    /// Apply one recognized field line, returning the updated record.
    fn apply(mut self, field: Field, value: &str) -> Self {
        match field {
            Field::Id => self.id = Some(value.to_string()),
            Field::Event => self.event = Some(value.to_string()),
            Field::Retry => self.retry = Some(value.to_string()),
            Field::Data => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                },
                None => self.data = Some(value.to_string()),
            },
        }
        self
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            writeln!(f, "id: {}", id)?;
        }
        if let Some(event) = &self.event {
            writeln!(f, "event: {}", event)?;
        }
        if let Some(retry) = &self.retry {
            writeln!(f, "retry: {}", retry)?;
        }
        if let Some(data) = &self.data {
            for line in data.split('\n') {
                writeln!(f, "data: {}", line)?;
            }
        }

        writeln!(f)?; // Empty line to end event
        Ok(())
    }
}

/// The four field names the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Event,
    Data,
    Retry,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "event" => Some(Self::Event),
            "data" => Some(Self::Data),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Parse one blank-line-free record chunk.
///
/// Returns `None` when the chunk is empty or carries no recognized field
/// (comments, blank lines, unknown fields only).
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::sse_parser::parse_event_chunk;
///
/// let event = parse_event_chunk("event: ping\ndata: a\ndata: b").unwrap();
/// assert_eq!(event.event.as_deref(), Some("ping"));
/// assert_eq!(event.data.as_deref(), Some("a\nb"));
///
/// assert!(parse_event_chunk(": keep-alive").is_none());
/// ```
pub fn parse_event_chunk(chunk: &str) -> Option<SseEvent> {
    if chunk.is_empty() {
        return None;
    }

    let record = split_lines(chunk)
        .filter_map(parse_line)
        .filter_map(|(name, value)| Field::from_name(name).map(|field| (field, value)))
        .fold(SseEvent::default(), |record, (field, value)| {
            record.apply(field, value)
        });

    (!record.is_empty()).then_some(record)
}

/// Split a line into field name and value.
///
/// `None` for comment lines (separator in first position). A line with no
/// separator is a field with an empty value. Exactly one space after the
/// separator is stripped.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    match line.find(FIELD_SEPARATOR) {
        Some(0) => None,
        Some(index) => {
            let value = &line[index + FIELD_SEPARATOR.len_utf8()..];
            Some((&line[..index], value.strip_prefix(' ').unwrap_or(value)))
        },
        None => Some((line, "")),
    }
}

/// Iterate over the lines of a chunk, splitting on `\r\n`, `\r` or `\n`.
fn split_lines(chunk: &str) -> LineSplit<'_> {
    LineSplit { rest: Some(chunk) }
}

#[derive(Debug)]
struct LineSplit<'a> {
    rest: Option<&'a str>,
}

impl<'a> Iterator for LineSplit<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.find(&['\r', '\n'][..]) {
            Some(pos) => {
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                self.rest = Some(&rest[pos + skip..]);
                Some(&rest[..pos])
            },
            None => {
                self.rest = None;
                Some(rest)
            },
        }
    }
}

/// Length of the record delimiter starting at the head of `bytes`, if any.
///
/// Alternatives are tried in order: `\r\n\r\n`, `\r\r`, `\n\n`.
fn delimiter_len(bytes: &[u8]) -> Option<usize> {
    if bytes.starts_with(b"\r\n\r\n") {
        Some(4)
    } else if bytes.starts_with(b"\r\r") || bytes.starts_with(b"\n\n") {
        Some(2)
    } else {
        None
    }
}

/// Split text on record delimiters.
///
/// Returns every segment followed by a delimiter, and the trailing
/// segment after the last delimiter (possibly empty, possibly a complete
/// record the server has not terminated yet).
///
/// # Examples
///
/// ```rust
/// use ssesource::shared::sse_parser::split_event_chunks;
///
/// let (chunks, rest) = split_event_chunks("data: a\n\ndata: b\r\n\r\ndata: c");
/// assert_eq!(chunks, vec!["data: a", "data: b"]);
/// assert_eq!(rest, "data: c");
/// ```
pub fn split_event_chunks(text: &str) -> (Vec<&str>, &str) {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match delimiter_len(&bytes[pos..]) {
            Some(len) => {
                chunks.push(&text[start..pos]);
                pos += len;
                start = pos;
            },
            None => pos += 1,
        }
    }

    (chunks, &text[start..])
}

/// Carry-over buffer for incrementally delivered SSE text.
///
/// The last segment of every delivery is withheld, since bytes for it may
/// still be in flight. It is only released by [`ChunkBuffer::finish`].
#[derive(Debug, Default, Clone)]
pub struct ChunkBuffer {
    carry_over: String,
}

impl ChunkBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly delivered text and return the chunks it completed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssesource::shared::sse_parser::ChunkBuffer;
    ///
    /// let mut buffer = ChunkBuffer::new();
    /// assert!(buffer.push("data: hel").is_empty());
    /// assert!(buffer.push("lo\n\n").len() == 1);
    /// assert_eq!(buffer.pending(), "");
    /// ```
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut combined = std::mem::take(&mut self.carry_over);
        combined.push_str(text);

        let (chunks, rest) = split_event_chunks(&combined);
        let chunks = chunks.into_iter().map(str::to_string).collect();
        self.carry_over = rest.to_string();
        chunks
    }

    /// Release the withheld trailing segment, leaving the buffer empty.
    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.carry_over)
    }

    /// The currently withheld text.
    pub fn pending(&self) -> &str {
        &self.carry_over
    }

    /// Discard any withheld text.
    pub fn reset(&mut self) {
        self.carry_over.clear();
    }
}
