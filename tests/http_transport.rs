//! End-to-end tests of the `reqwest` transport against a mock server.

#![cfg(feature = "http")]

use mockito::{Matcher, Server};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use ssesource::{listener, ReadyState, SseSource};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

type Log = Arc<Mutex<Vec<(String, String)>>>;

fn record(source: &mut SseSource, types: &[&str]) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let recorder = listener(move |event| {
        sink.lock()
            .push((event.event_type().to_string(), event.data().to_string()));
    });
    for event_type in types {
        source.add_event_listener(event_type, &recorder);
    }
    log
}

fn pair(event_type: &str, data: &str) -> (String, String) {
    (event_type.to_string(), data.to_string())
}

async fn run(source: &mut SseSource) {
    tokio::time::timeout(Duration::from_secs(10), source.run())
        .await
        .expect("stream did not finish in time");
}

#[tokio::test]
async fn test_stream_until_server_closes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/events")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: one\n\nevent: delta\ndata: two\n\n: comment\n\ndata: three")
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/events", server.url()))
        .build()
        .unwrap();
    let log = record(&mut source, &["open", "message", "delta", "error"]);

    run(&mut source).await;

    assert_eq!(
        *log.lock(),
        vec![
            pair("open", ""),
            pair("message", "one"),
            pair("delta", "two"),
            pair("message", "three"),
        ]
    );
    assert_eq!(source.ready_state(), ReadyState::Closed);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_reported_with_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/events")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/events", server.url()))
        .build()
        .unwrap();
    let log = record(&mut source, &["open", "message", "error"]);

    run(&mut source).await;

    assert_eq!(*log.lock(), vec![pair("error", "boom")]);
    assert_eq!(source.ready_state(), ReadyState::Closed);
    assert!(!source.is_connected());
}

#[tokio::test]
async fn test_post_with_payload_and_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer secret")
        .match_body(r#"{"stream":true}"#)
        .with_status(200)
        .with_body("data: ok\n\n")
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/v1/chat", server.url()))
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer secret")
        .payload(r#"{"stream":true}"#)
        .build()
        .unwrap();
    let log = record(&mut source, &["message", "error"]);

    run(&mut source).await;

    assert_eq!(*log.lock(), vec![pair("message", "ok")]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reconnect_sends_last_event_id() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/events")
        .match_header("last-event-id", Matcher::Missing)
        .with_status(200)
        .with_body("id: 42\ndata: a\n\n")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/events")
        .match_header("last-event-id", "42")
        .with_status(200)
        .with_body("data: b\n\n")
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/events", server.url()))
        .build()
        .unwrap();
    let log = record(&mut source, &["message", "error"]);

    run(&mut source).await;
    assert_eq!(source.last_event_id(), "42");

    source.close();
    source.stream();
    run(&mut source).await;

    assert_eq!(*log.lock(), vec![pair("message", "a"), pair("message", "b")]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_multibyte_text_split_across_writes() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/events")
        .with_status(200)
        .with_chunked_body(|w| {
            let bytes = "data: héllo wörld\n\n".as_bytes();
            // Cut inside the two-byte 'é'
            w.write_all(&bytes[..8])?;
            w.flush()?;
            w.write_all(&bytes[8..])?;
            w.flush()
        })
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/events", server.url()))
        .build()
        .unwrap();
    let log = record(&mut source, &["message", "error"]);

    run(&mut source).await;

    assert_eq!(*log.lock(), vec![pair("message", "héllo wörld")]);
}

#[tokio::test]
async fn test_close_stops_stream() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/events")
        .with_status(200)
        .with_body("data: first\n\ndata: [DONE]\n\ndata: after\n\n")
        .create_async()
        .await;

    let mut source = SseSource::builder(format!("{}/events", server.url()))
        .build()
        .unwrap();
    let log = record(&mut source, &["message", "abort", "error"]);
    let closer = source.closer();
    source.add_event_listener(
        "message",
        &listener(move |event| {
            if event.data() == "[DONE]" {
                closer.close();
            }
        }),
    );

    run(&mut source).await;

    assert_eq!(
        *log.lock(),
        vec![pair("message", "first"), pair("message", "[DONE]")]
    );
    assert_eq!(source.ready_state(), ReadyState::Closed);
}
