//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Each test:
/// 1. Queues a mock upstream response (what a model server would return)
/// 2. Sends a request to the REAL gateway
/// 3. Validates what the caller received and what the upstream saw
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Buffered forwarding ───────────────────────────────────────────────
        test!(
            "basic/buffered_verbatim",
            "Non-streaming upstream body is returned byte-for-byte",
            basic::test_buffered_response_verbatim
        ),
        test!(
            "basic/payload_forwarded_exactly",
            "Caller payload reaches the upstream unchanged",
            basic::test_payload_forwarded_exactly
        ),
        test!(
            "basic/upstream_error_relayed",
            "Upstream error status and body are relayed as-is",
            basic::test_upstream_error_status_relayed
        ),

        // ── Streaming relay ───────────────────────────────────────────────────
        test!(
            "streaming/incremental",
            "Streamed lines reach the caller as they are produced",
            streaming::test_lines_arrive_incrementally
        ),
        test!(
            "streaming/sse_passthrough",
            "SSE completion including [DONE] is relayed unchanged",
            streaming::test_sse_completion_passthrough
        ),
        test!(
            "streaming/split_lines",
            "Lines split across upstream chunks are regrouped",
            streaming::test_split_lines_regrouped
        ),
        test!(
            "streaming/trailing_partial",
            "Trailing bytes without a newline are delivered",
            streaming::test_trailing_partial_line
        ),
        test!(
            "streaming/flag_selects_mode",
            "stream:true selects the line relay regardless of upstream framing",
            streaming::test_stream_flag_selects_mode
        ),

        // ── Errors ────────────────────────────────────────────────────────────
        test!("errors/unknown_model", "Unknown model is 404", errors::test_unknown_model),
        test!("errors/malformed_body", "Non-JSON body is 400", errors::test_malformed_body),
        test!(
            "errors/missing_model_field",
            "Request without model is 404",
            errors::test_missing_model_field
        ),
        test!(
            "errors/unreachable_upstream",
            "Unreachable upstream is 502",
            errors::test_unreachable_upstream
        ),
        test!(
            "errors/no_endpoint",
            "Model with only a local path is 502",
            errors::test_model_without_endpoint
        ),
        test!(
            "errors/request_id",
            "Responses carry x-request-id",
            errors::test_request_id_header
        ),

        // ── Auxiliary endpoints ───────────────────────────────────────────────
        test!("models/health", "/health returns status:ok", models::test_health),
        test!("models/list", "/v1/models lists valid records", models::test_models_list),
        test!(
            "models/reload",
            "POST /admin/reload picks up record changes",
            models::test_reload_picks_up_new_record
        ),
        test!(
            "models/stats",
            "/stats counts requests per route, model and error",
            models::test_stats_reflect_requests
        ),
    ]
}
