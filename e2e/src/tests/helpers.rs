//! Common test helpers and JSON builders

use serde_json::{json, Value};

use crate::types::preview;

/// Model served by the mock upstream
pub const LIVE_MODEL: &str = "demo";
/// Model whose endpoint has nothing listening
pub const DOWN_MODEL: &str = "down";
/// Model with a local path but no endpoint
pub const LOCAL_MODEL: &str = "local";

// ─── Request builders ────────────────────────────────────────────────────────

/// Build a basic chat request for `model`
pub fn chat_request(model: &str, prompt: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "stream": stream
    })
}

// ─── Response builders ────────────────────────────────────────────────────────

/// A normal text completion as an upstream would send it
pub fn upstream_text_response(content: &str) -> String {
    json!({
        "id": "chatcmpl-test001",
        "object": "chat.completion",
        "created": 1700000000,
        "model": LIVE_MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// SSE lines for a short streamed completion, one `data:` line per piece
pub fn upstream_sse_lines(pieces: &[&str]) -> Vec<String> {
    let mut lines: Vec<String> = pieces
        .iter()
        .map(|p| {
            let chunk = json!({
                "object": "chat.completion.chunk",
                "model": LIVE_MODEL,
                "choices": [{"index": 0, "delta": {"content": p}}]
            });
            format!("data: {}\n\n", chunk)
        })
        .collect();
    lines.push("data: [DONE]\n\n".to_string());
    lines
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert an HTTP status, showing the body on mismatch
pub fn assert_status(actual: u16, expected: u16, body: &str) -> anyhow::Result<()> {
    assert_true(
        actual == expected,
        &format!("Expected status {}, got {}: {}", expected, actual, preview(body, 300)),
    )
}
