//! Integration tests for the call-protocol inspector endpoints.

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use super::common::{after_flush, get, live_app, post_json, settle, test_app};

fn record(id: &str, message: serde_json::Value) -> String {
    json!({
        "id": id,
        "timestamp": "2026-01-05T10:00:00Z",
        "message": message.to_string(),
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_only_jsonrpc_messages_are_kept() {
    let live = live_app().await;

    live.inspector
        .send(record("r1", json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"})))
        .unwrap();
    live.inspector
        .send(record("r2", json!({"level": "info", "msg": "not rpc"})))
        .unwrap();
    live.inspector.send("garbage".to_string()).unwrap();
    live.inspector
        .send(record("r3", json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}})))
        .unwrap();
    after_flush().await;

    let (status, json) = get(live.router, "/api/v1/inspector").await;

    assert_eq!(status, StatusCode::OK);
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"], "r3");
    assert_eq!(messages[0]["kind"], "response");
    assert_eq!(messages[1]["kind"], "request");
    assert_eq!(messages[1]["method"], "tools/call");
    assert_eq!(json["status"]["messages"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_synthetic_traffic_toggle() {
    let live = live_app().await;

    let (status, _json) = post_json(
        live.router.clone(),
        "/api/v1/inspector/synthetic",
        json!({"enabled": true}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;
    assert!(live.inspector.is_closed());

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let (_status, json) = get(live.router.clone(), "/api/v1/inspector").await;
    assert_eq!(json["status"]["synthetic"], true);
    assert_eq!(json["status"]["state"], "suspended");
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    assert_eq!(json["messages"][1]["method"], "tools/call");

    let (status, _json) = post_json(
        live.router.clone(),
        "/api/v1/inspector/synthetic",
        json!({"enabled": false}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    let (_status, json) = get(live.router, "/api/v1/inspector").await;
    assert_eq!(json["status"]["synthetic"], false);
    assert_ne!(json["status"]["state"], "suspended");
}

#[tokio::test(start_paused = true)]
async fn test_synthetic_requires_flag() {
    let live = live_app().await;

    let (status, json) = post_json(live.router, "/api/v1/inspector/synthetic", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_json");
}

#[tokio::test]
async fn test_inspector_without_feed() {
    let (app, _source) = test_app();

    let (status, json) = get(app, "/api/v1/inspector").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "feed_disabled");
}
