use ssesource::shared::sse_parser::{parse_event_chunk, split_event_chunks, ChunkBuffer, SseEvent};

/// Feed `input` through a fresh buffer, flush it, and parse every chunk.
fn parse_all(input: &str) -> Vec<SseEvent> {
    let mut buffer = ChunkBuffer::new();
    let mut chunks = buffer.push(input);
    chunks.push(buffer.finish());
    chunks.iter().filter_map(|c| parse_event_chunk(c)).collect()
}

#[test]
fn test_simple_message() {
    let events = parse_all("data: hello world\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some("hello world"));
    assert_eq!(events[0].event, None);
    assert_eq!(events[0].id, None);
}

#[test]
fn test_message_with_id() {
    let events = parse_all("id: 123\ndata: test message\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some("test message"));
    assert_eq!(events[0].id, Some("123".to_string()));
}

#[test]
fn test_custom_event_type() {
    let events = parse_all("event: custom\ndata: custom data\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, Some("custom".to_string()));
    assert_eq!(events[0].data.as_deref(), Some("custom data"));
}

#[test]
fn test_multiline_data() {
    let events = parse_all("data: foo\ndata: bar\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some("foo\nbar"));
}

#[test]
fn test_crlf_line_endings() {
    let events = parse_all("id: 456\r\ndata: windows style\r\n\r\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, Some("456".to_string()));
    assert_eq!(events[0].data.as_deref(), Some("windows style"));
}

#[test]
fn test_cr_line_endings() {
    let events = parse_all("id: 7\rdata: old mac\r\rdata: next\r\r");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data.as_deref(), Some("old mac"));
    assert_eq!(events[1].data.as_deref(), Some("next"));
}

#[test]
fn test_mixed_line_endings() {
    let events = parse_all("id: 789\ndata: mixed\r\ndata: endings\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, Some("789".to_string()));
    assert_eq!(events[0].data.as_deref(), Some("mixed\nendings"));
}

#[test]
fn test_comment_only_record() {
    assert!(parse_all(": this is a comment\n\n").is_empty());
}

#[test]
fn test_comment_ignored() {
    let events = parse_all(": this is a comment\ndata: actual data\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some("actual data"));
}

#[test]
fn test_partial_parsing() {
    let mut buffer = ChunkBuffer::new();

    // Send partial data
    assert!(buffer.push("data: partial").is_empty());

    // Complete the event
    let chunks = buffer.push(" message\n\n");
    assert_eq!(chunks.len(), 1);
    let event = parse_event_chunk(&chunks[0]).unwrap();
    assert_eq!(event.data.as_deref(), Some("partial message"));
}

#[test]
fn test_complete_record_withheld_until_next_delivery() {
    let mut buffer = ChunkBuffer::new();
    // No trailing blank line yet: the record stays in the carry-over.
    assert!(buffer.push("data: one\n").is_empty());
    assert_eq!(buffer.push("\n"), vec!["data: one".to_string()]);
}

#[test]
fn test_multiple_events() {
    let events = parse_all("data: event1\n\ndata: event2\n\nid: 3\ndata: event3\n\n");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].data.as_deref(), Some("event1"));
    assert_eq!(events[1].data.as_deref(), Some("event2"));
    assert_eq!(events[2].data.as_deref(), Some("event3"));
    assert_eq!(events[2].id, Some("3".to_string()));
}

#[test]
fn test_json_data() {
    let json = r#"{"choices":[{"delta":{"content":"hi"}}]}"#;
    let events = parse_all(&format!("data: {}\n\n", json));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some(json));
}

#[test]
fn test_done_sentinel_is_opaque() {
    let events = parse_all("data: [DONE]\n\n");
    assert_eq!(events[0].data.as_deref(), Some("[DONE]"));
}

#[test]
fn test_event_without_data_still_parsed() {
    let events = parse_all("event: empty\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some("empty"));
    assert_eq!(events[0].data, None);
}

#[test]
fn test_space_after_colon() {
    let events = parse_all("data:no space\n\ndata: with space\n\ndata:  two spaces\n\n");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].data.as_deref(), Some("no space"));
    assert_eq!(events[1].data.as_deref(), Some("with space"));
    assert_eq!(events[2].data.as_deref(), Some(" two spaces"));
}

#[test]
fn test_retry_field_kept() {
    let events = parse_all("retry: 1000\ndata: message\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data.as_deref(), Some("message"));
    assert_eq!(events[0].retry_millis(), Some(1000));
}

#[test]
fn test_unknown_field_ignored() {
    let events = parse_all("unknown: field\ndata: message\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], SseEvent::new("message"));
}

#[test]
fn test_bare_field_names() {
    let events = parse_all("data\n\nid\n\nnonsense\n\n");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data.as_deref(), Some(""));
    assert_eq!(events[1].id.as_deref(), Some(""));
}

#[test]
fn test_blank_runs_produce_nothing() {
    let (chunks, rest) = split_event_chunks("\n\n\n\n\r\n\r\n");
    assert!(chunks.iter().all(|c| parse_event_chunk(c).is_none()));
    assert_eq!(rest, "");
}
