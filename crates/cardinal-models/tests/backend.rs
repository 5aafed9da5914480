use std::time::Duration;

use bytes::Bytes;
use cardinal_core::CardinalError;
use cardinal_models::{
    FakeBackend, HttpBackend, HttpBackendConfig, ProviderBackend, ProviderRequest,
    ProviderResponse,
};
use futures::StreamExt;
use serde_json::json;

fn request(body: serde_json::Value) -> ProviderRequest {
    ProviderRequest {
        url: "http://localhost/chat/completions".to_string(),
        headers: vec![],
        body,
    }
}

// ---------------------------------------------------------------------------
// ProviderResponse::error_for_status
// ---------------------------------------------------------------------------

#[test]
fn success_status_passes_through() {
    let resp = ProviderResponse::ok(json!({"choices": []}));
    let resp = resp.error_for_status().unwrap();
    assert_eq!(resp.status, 200);
}

#[test]
fn status_429_maps_to_rate_limit() {
    let resp = ProviderResponse {
        status: 429,
        body: json!({"error": {"message": "too many requests"}}),
    };
    let err = resp.error_for_status().unwrap_err();
    assert!(matches!(err, CardinalError::RateLimit(ref m) if m == "too many requests"));
}

#[test]
fn other_error_status_maps_to_api_error() {
    let resp = ProviderResponse {
        status: 500,
        body: json!({}),
    };
    let err = resp.error_for_status().unwrap_err();
    assert!(matches!(err, CardinalError::Api { status: 500, ref message } if message == "unknown API error"));
    assert!(err.to_string().contains("500"));
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fake_backend_replays_queue_in_order() {
    let backend = FakeBackend::new();
    backend
        .push_error(CardinalError::Transport("down".to_string()))
        .push_response(ProviderResponse::ok(json!({"n": 1})));

    let first = backend.send(request(json!({"a": 1}))).await;
    assert!(matches!(first, Err(CardinalError::Transport(_))));

    let second = backend.send(request(json!({"a": 2}))).await.unwrap();
    assert_eq!(second.body["n"], 1);

    let exhausted = backend.send(request(json!({"a": 3}))).await;
    assert!(exhausted.is_err());

    assert_eq!(backend.send_calls(), 3);
    let bodies: Vec<_> = backend.requests().into_iter().map(|r| r.body["a"].clone()).collect();
    assert_eq!(bodies, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn fake_backend_streams() {
    let backend = FakeBackend::new();
    backend
        .push_stream_error(CardinalError::Transport("refused".to_string()))
        .push_stream_chunks(vec![Bytes::from("a"), Bytes::from("b")])
        .push_broken_stream(
            vec![Bytes::from("c")],
            CardinalError::Transport("reset".to_string()),
        );

    assert!(backend.send_stream(request(json!({}))).await.is_err());

    let chunks: Vec<_> = backend
        .send_stream(request(json!({})))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.is_ok()));

    let broken: Vec<_> = backend
        .send_stream(request(json!({})))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(broken.len(), 2);
    assert!(broken[0].is_ok());
    assert!(broken[1].is_err());

    assert_eq!(backend.stream_calls(), 3);
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

#[test]
fn http_backend_config_defaults() {
    let config = HttpBackendConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 5);
}

#[tokio::test]
async fn http_backend_reports_connection_failure() {
    let backend = HttpBackend::new(HttpBackendConfig {
        timeout: Duration::from_millis(200),
        max_retries: 0,
    })
    .unwrap();
    // Port 9 (discard) is not expected to accept connections.
    let err = backend
        .send(ProviderRequest {
            url: "http://127.0.0.1:9/chat/completions".to_string(),
            headers: vec![],
            body: json!({}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CardinalError::Transport(_)));
}
