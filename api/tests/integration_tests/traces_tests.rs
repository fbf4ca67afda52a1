//! Integration tests for trace assembly and diagnostics.
//!
//! Tests cover:
//! - Implicit tool-call children synthesized from JSON-RPC request bodies
//! - Event-stream response bodies
//! - Explicit span lists in arbitrary order, including orphans
//! - Diagnostics for failed requests
//! - Newest-first ordering and the limit parameter

use axum::http::StatusCode;
use serde_json::json;
use shared::models::{RawEntry, RawSpan, RawSpanStatus};

use super::common::{get, test_app};

const TOOL_CALL: &str =
    r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"my_tool","arguments":{"arg1":"val1"}}}"#;

#[tokio::test]
async fn test_tool_call_becomes_child_span() {
    let (app, source) = test_app();
    source.push(
        RawEntry::new("req-1", "POST", "/mcp", 200)
            .with_timestamp("2026-01-05T10:00:00Z")
            .with_duration_ns(250_000_000)
            .with_request_body(TOOL_CALL)
            .with_response_body(r#"{"jsonrpc":"2.0","id":1,"result":{"output":"success"}}"#),
    );

    let (status, json) = get(app, "/api/v1/traces/req-1").await;

    assert_eq!(status, StatusCode::OK);
    let root = &json["trace"]["rootSpan"];
    assert_eq!(root["name"], "Execute Request");
    assert_eq!(root["type"], "core");
    assert_eq!(root["endTime"].as_i64().unwrap() - root["startTime"].as_i64().unwrap(), 250);

    let child = &root["children"][0];
    assert_eq!(child["name"], "my_tool");
    assert_eq!(child["type"], "tool");
    assert_eq!(child["status"], "success");
    assert_eq!(child["input"], json!({"arg1": "val1"}));
    assert_eq!(child["output"], json!({"output": "success"}));

    assert_eq!(json["trace"]["totalDuration"], 250.0);
    assert_eq!(json["trace"]["trigger"], "user");
    assert_eq!(json["diagnostics"], json!([]));
}

#[tokio::test]
async fn test_event_stream_response_is_decoded() {
    let (app, source) = test_app();
    source.push(
        RawEntry::new("sse", "POST", "/mcp", 200)
            .with_request_body(TOOL_CALL)
            .with_response_body("event: message\ndata: {\"result\":\"sse_success\"}\n\n"),
    );

    let (_status, json) = get(app, "/api/v1/traces/sse").await;

    assert_eq!(json["trace"]["rootSpan"]["output"], json!({"result": "sse_success"}));
    assert_eq!(
        json["trace"]["rootSpan"]["children"][0]["output"],
        json!("sse_success")
    );
}

#[tokio::test]
async fn test_explicit_spans_build_tree_in_any_order() {
    let (app, source) = test_app();
    source.push(
        RawEntry::new("req-2", "POST", "/mcp", 200).with_spans(vec![
            RawSpan::new("db", "select users", "db").with_parent("svc"),
            RawSpan::new("svc", "user-service", "service"),
            RawSpan::new("orphan", "cache lookup", "cache").with_parent("gone"),
            RawSpan::new("tool", "summarize", "tool_call")
                .with_parent("svc")
                .with_status(RawSpanStatus::Error)
                .with_error("model overloaded"),
        ]),
    );

    let (status, json) = get(app, "/api/v1/traces/req-2").await;
    assert_eq!(status, StatusCode::OK);

    let root = &json["trace"]["rootSpan"];
    assert_eq!(root["name"], "POST /mcp");
    let top: Vec<&str> = root["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(top, vec!["svc", "orphan"]);

    let service = &root["children"][0];
    assert_eq!(service["type"], "service");
    assert_eq!(service["children"][0]["id"], "db");
    assert_eq!(service["children"][0]["type"], "resource");
    assert_eq!(service["children"][1]["status"], "error");
    assert_eq!(service["children"][1]["errorMessage"], "model overloaded");
    assert_eq!(root["children"][1]["type"], "resource");
}

#[tokio::test]
async fn test_failed_request_produces_diagnostics() {
    let (app, source) = test_app();
    source.push(
        RawEntry::new("bad", "POST", "/mcp", 400)
            .with_request_body(TOOL_CALL)
            .with_response_body(r#"{"error":{"code":-32602,"message":"ZodError: expected string"}}"#),
    );

    let (status, json) = get(app.clone(), "/api/v1/traces/bad").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trace"]["status"], "error");
    assert_eq!(json["trace"]["rootSpan"]["errorMessage"], "ZodError: expected string");
    assert_eq!(json["trace"]["rootSpan"]["children"][0]["status"], "error");

    let diagnostics = json["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["title"], "Schema Validation Error");
    assert_eq!(diagnostics[0]["type"], "error");
    assert!(diagnostics[0]["suggestion"].is_string());

    let (status, json) = get(app, "/api/v1/traces/bad/diagnostics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["diagnostics"][0]["title"], "Schema Validation Error");
}

#[tokio::test]
async fn test_non_json_error_body_is_truncated() {
    let (app, source) = test_app();
    let body = "x".repeat(300);
    source.push(RawEntry::new("html", "GET", "/", 502).with_response_body(body.clone()));

    let (_status, json) = get(app, "/api/v1/traces/html").await;

    let root = &json["trace"]["rootSpan"];
    assert_eq!(root["output"], json!({"raw": body}));
    let message = root["errorMessage"].as_str().unwrap();
    assert_eq!(message.len(), 203);
    assert!(message.ends_with("..."));
}

#[tokio::test]
async fn test_list_is_newest_first_and_limited() {
    let (app, source) = test_app();
    for (id, timestamp) in [
        ("a", "2026-01-05T09:00:00Z"),
        ("b", "2026-01-05T11:00:00Z"),
        ("c", "2026-01-05T10:00:00Z"),
    ] {
        source.push(RawEntry::new(id, "GET", "/", 200).with_timestamp(timestamp));
    }

    let (status, json) = get(app.clone(), "/api/v1/traces").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["traces"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);

    let (_status, json) = get(app, "/api/v1/traces?limit=2").await;
    assert_eq!(json["total_count"], 2);
}

#[tokio::test]
async fn test_empty_upstream_lists_nothing() {
    let (app, _source) = test_app();

    let (status, json) = get(app, "/api/v1/traces").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["traces"], json!([]));
    assert_eq!(json["total_count"], 0);
}

#[tokio::test]
async fn test_get_nonexistent_trace() {
    let (app, _source) = test_app();

    let (status, json) = get(app.clone(), "/api/v1/traces/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, _json) = get(app, "/api/v1/traces/nope/diagnostics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
