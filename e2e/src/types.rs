//! Shared types for the e2e test framework

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock response the upstream will serve for the next chat completion request
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    /// Body pieces written in order, with `chunk_delay` between them
    pub chunks: Vec<String>,
    pub chunk_delay: Duration,
}

impl MockResponse {
    /// A complete JSON body sent in one piece
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            chunks: vec![body.into()],
            chunk_delay: Duration::ZERO,
        }
    }

    /// An error response with a JSON body
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::json(body)
        }
    }

    /// A streamed body written piece by piece with a pause between pieces
    pub fn stream(chunks: Vec<String>, chunk_delay: Duration) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream".to_string(),
            chunks,
            chunk_delay,
        }
    }
}

/// Shared state for the mock upstream server
#[derive(Debug, Default)]
pub struct UpstreamState {
    /// Queue of responses to serve - tests push responses, upstream pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All requests received by the upstream (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A request received by the mock upstream
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub type SharedUpstreamState = Arc<Mutex<UpstreamState>>;

/// Result of a buffered request to the gateway
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub request_id: Option<String>,
    pub body: String,
}

/// First `max_chars` characters of `text`, for error messages
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl GatewayResponse {
    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            anyhow::anyhow!(
                "Gateway response is not valid JSON: {}: {}",
                e,
                preview(&self.body, 500)
            )
        })
    }

    /// The `error.code` field of an error body
    pub fn error_code(&self) -> Option<String> {
        self.json()
            .ok()?
            .pointer("/error/code")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

/// A body chunk as the caller received it, stamped with arrival time
#[derive(Debug, Clone)]
pub struct TimedChunk {
    pub at: Duration,
    pub data: Bytes,
}

/// Result of a streaming request - every chunk as it arrived
#[derive(Debug)]
pub struct StreamCapture {
    pub status: u16,
    pub content_type: Option<String>,
    pub chunks: Vec<TimedChunk>,
}

impl StreamCapture {
    /// All received bytes concatenated
    pub fn text(&self) -> String {
        let all: Vec<u8> = self.chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
        String::from_utf8_lossy(&all).into_owned()
    }

    /// Arrival time of the first chunk containing `needle`
    pub fn arrival_of(&self, needle: &str) -> Option<Duration> {
        self.chunks
            .iter()
            .find(|c| String::from_utf8_lossy(&c.data).contains(needle))
            .map(|c| c.at)
    }
}

/// How a single test case ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

/// Result of a single test case
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

/// Returned by a test that cannot run against this gateway setup
#[derive(Debug)]
pub struct Skip(pub String);

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipped: {}", self.0)
    }
}

impl std::error::Error for Skip {}
