//! HTTP client that plays the caller of the gateway

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use std::time::Instant;

use crate::types::{GatewayResponse, StreamCapture, TimedChunk};

/// Build an HTTP client (no connection pooling for test isolation)
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(0)
        .build()
        .expect("Failed to build reqwest client")
}

fn header_string(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST a raw body to /v1/chat/completions and read the whole response
pub async fn send_raw(client: &Client, gateway_addr: &str, body: impl Into<String>) -> anyhow::Result<GatewayResponse> {
    let url = format!("http://{gateway_addr}/v1/chat/completions");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(body.into())
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send request to gateway: {}", e))?;

    let status = resp.status().as_u16();
    let content_type = header_string(&resp, "content-type");
    let request_id = header_string(&resp, "x-request-id");
    let body = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read gateway response: {}", e))?;

    Ok(GatewayResponse {
        status,
        content_type,
        request_id,
        body,
    })
}

/// Send a JSON chat completion request to the gateway
pub async fn send_json(client: &Client, gateway_addr: &str, request_body: &serde_json::Value) -> anyhow::Result<GatewayResponse> {
    send_raw(client, gateway_addr, request_body.to_string()).await
}

/// Send a streaming request and record each body chunk with its arrival time
pub async fn send_streaming(
    client: &Client,
    gateway_addr: &str,
    request_body: &serde_json::Value,
) -> anyhow::Result<StreamCapture> {
    let url = format!("http://{gateway_addr}/v1/chat/completions");
    let start = Instant::now();

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(request_body.to_string())
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send streaming request to gateway: {}", e))?;

    let status = resp.status().as_u16();
    let content_type = header_string(&resp, "content-type");

    let mut stream = resp.bytes_stream();
    let mut chunks = Vec::new();

    while let Some(chunk) = stream.next().await {
        let data: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        chunks.push(TimedChunk {
            at: start.elapsed(),
            data,
        });
    }

    Ok(StreamCapture {
        status,
        content_type,
        chunks,
    })
}

/// Send a GET request to the gateway
pub async fn send_get(client: &Client, gateway_addr: &str, path: &str) -> anyhow::Result<GatewayResponse> {
    let url = format!("http://{gateway_addr}{path}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let content_type = header_string(&resp, "content-type");
    let request_id = header_string(&resp, "x-request-id");
    let body = resp.text().await.unwrap_or_default();

    Ok(GatewayResponse {
        status,
        content_type,
        request_id,
        body,
    })
}

/// Send a POST with an empty body (admin endpoints)
pub async fn send_post_empty(client: &Client, gateway_addr: &str, path: &str) -> anyhow::Result<GatewayResponse> {
    let url = format!("http://{gateway_addr}{path}");

    let resp = client
        .post(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to POST {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let content_type = header_string(&resp, "content-type");
    let body = resp.text().await.unwrap_or_default();

    Ok(GatewayResponse {
        status,
        content_type,
        request_id: None,
        body,
    })
}
