//! Mock upstream that stands in for a model server behind the gateway
//!
//! Tests pre-configure responses via SharedUpstreamState before each request.
//! Streamed responses are written piece by piece with real pauses so the
//! caller side can observe incremental delivery.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{MockResponse, ReceivedRequest, SharedUpstreamState, UpstreamState};

/// Default fallback response when no response is queued
fn default_completion_response() -> MockResponse {
    MockResponse::json(
        r#"{"id":"chatcmpl-default","object":"chat.completion","created":1700000000,"model":"demo","choices":[{"index":0,"message":{"role":"assistant","content":"Default response (no mock queued)"},"finish_reason":"stop"}]}"#,
    )
}

/// Handle POST /v1/chat/completions - records the raw body, serves the next queued response
async fn handle_chat_completions(
    State(state): State<SharedUpstreamState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received = ReceivedRequest {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    };

    let mock = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(received);
        state.response_queue.pop_front().unwrap_or_else(default_completion_response)
    };

    let delay = mock.chunk_delay;
    let pieces = futures::stream::iter(mock.chunks.into_iter().enumerate()).then(move |(i, piece)| async move {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok::<_, std::io::Error>(Bytes::from(piece))
    });

    Response::builder()
        .status(StatusCode::from_u16(mock.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(header::CONTENT_TYPE, mock.content_type)
        .body(Body::from_stream(pieces))
        .unwrap()
        .into_response()
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], r#"{"status":"ok"}"#)
}

/// Start the mock upstream and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedUpstreamState> {
    let state: SharedUpstreamState = std::sync::Arc::new(std::sync::Mutex::new(UpstreamState::default()));

    let app = Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock upstream to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock upstream server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Configure the next response for /v1/chat/completions
pub fn queue_response(state: &SharedUpstreamState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// All requests received since last clear
pub fn drain_requests(state: &SharedUpstreamState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}
