//! `HttpEventSink` against a `wiremock` destination.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedrelay::config::DestinationConfig;
use feedrelay::destination::http::BATCH_CONTENT_TYPE;
use feedrelay::destination::{DestinationError, EventSink, HttpEventSink};
use feedrelay::event::{EventBody, MetadataValue};
use feedrelay::CanonicalEvent;

fn make_sink(server: &MockServer) -> HttpEventSink {
    let config = DestinationConfig {
        uri: format!("{}/v1/events", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    };
    HttpEventSink::new(&config).expect("client builds")
}

fn event(subject: &str) -> CanonicalEvent {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "title".to_string(),
        MetadataValue::String(format!("title of {}", subject)),
    );
    CanonicalEvent {
        id: format!("id-{}", subject),
        spec_version: "1.0".to_string(),
        event_type: "com.github.feedrelay.rss".to_string(),
        source: "https://news.example.com".to_string(),
        subject: subject.to_string(),
        time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        body: Some(EventBody {
            content_type: "text/plain".to_string(),
            data: "hello".to_string(),
        }),
        metadata,
    }
}

#[tokio::test]
async fn test_batch_is_posted_as_cloudevents_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events"))
        .and(header("content-type", BATCH_CONTENT_TYPE))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = make_sink(&server)
        .submit_batch(&[event("one"), event("two")])
        .await;
    assert_eq!(response.ack_count, 2);
    assert_eq!(response.error, None);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let batch = body.as_array().unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["specversion"], "1.0");
    assert_eq!(batch[0]["type"], "com.github.feedrelay.rss");
    assert_eq!(batch[0]["subject"], "one");
    assert_eq!(batch[0]["datacontenttype"], "text/plain");
    assert_eq!(batch[0]["data"], "hello");
    assert_eq!(batch[0]["title"], "title of one");
    assert_eq!(batch[1]["id"], "id-two");
}

#[tokio::test]
async fn test_prefix_ack_and_error_from_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"count":1,"error":"queue full: try later"}"#.as_bytes().to_vec(),
            "application/json",
        ))
        .mount(&server)
        .await;

    let response = make_sink(&server)
        .submit_batch(&[event("one"), event("two"), event("three")])
        .await;
    assert_eq!(response.ack_count, 1);
    assert!(matches!(
        response.error,
        Some(DestinationError::TransientCapacity(_))
    ));
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let cases: [(u16, &str); 5] = [
        (404, "target_missing"),
        (410, "target_missing"),
        (429, "transient_capacity"),
        (503, "transient_capacity"),
        (500, "internal"),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let response = make_sink(&server).submit_batch(&[event("one")]).await;
        assert_eq!(response.ack_count, 0, "status {}", status);
        assert_eq!(response.error.unwrap().kind(), kind, "status {}", status);
    }
}

#[tokio::test]
async fn test_unreachable_destination_is_internal_error() {
    let config = DestinationConfig {
        uri: "http://127.0.0.1:1/v1/events".to_string(),
        timeout_secs: 5,
        ..Default::default()
    };
    let sink = HttpEventSink::new(&config).expect("client builds");

    let response = sink.submit_batch(&[event("one")]).await;
    assert_eq!(response.ack_count, 0);
    assert!(matches!(response.error, Some(DestinationError::Internal(_))));
}

#[tokio::test]
async fn test_truncated_success_body_acknowledges_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 64 * 1024];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"count\": 1, \"er")
            .await
            .unwrap();
        socket.flush().await.unwrap();
    });

    let config = DestinationConfig {
        uri: format!("http://{}/v1/events", addr),
        timeout_secs: 5,
        ..Default::default()
    };
    let sink = HttpEventSink::new(&config).expect("client builds");

    let response = sink
        .submit_batch(&[event("one"), event("two"), event("three")])
        .await;
    assert_eq!(response.ack_count, 0);
    assert!(matches!(response.error, Some(DestinationError::Internal(_))));
    server.await.unwrap();
}
