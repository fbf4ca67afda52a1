//! Integration tests for the live log feed endpoints.
//!
//! Frames are pushed through an in-process connection; time is paused so that
//! flush ticks are deterministic.

use axum::http::StatusCode;
use serde_json::json;

use super::common::{after_flush, get, live_app, post_json, request, send_json, settle, test_app};

fn frame(id: usize, source: &str, message: &str) -> String {
    json!({
        "id": id.to_string(),
        "timestamp": "2026-01-05T10:00:00Z",
        "level": "info",
        "message": message,
        "source": source,
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_logs_appear_after_flush() {
    let live = live_app().await;

    live.logs.send(frame(1, "gateway", "request started")).unwrap();
    live.logs.send("raw text line".to_string()).unwrap();
    after_flush().await;

    let (status, json) = get(live.router.clone(), "/api/v1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["logs"][0]["message"], "request started");
    assert_eq!(json["logs"][0]["displayTime"], "10:00:00");
    assert_eq!(json["logs"][1]["message"], "raw text line");
    assert_eq!(json["logs"][1]["level"], "info");

    let (status, json) = get(live.router, "/api/v1/logs/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "connected");
    assert_eq!(json["committed"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_buffer_keeps_newest_thousand() {
    let live = live_app().await;

    for i in 0..1500 {
        live.logs.send(frame(i, "gateway", "tick")).unwrap();
        if i % 400 == 399 {
            after_flush().await;
        }
    }
    after_flush().await;

    let (_status, json) = get(live.router, "/api/v1/logs").await;
    let logs = json["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1000);
    assert_eq!(logs[0]["id"], "500");
    assert_eq!(logs[999]["id"], "1499");
}

#[tokio::test(start_paused = true)]
async fn test_search_and_limit() {
    let live = live_app().await;

    live.logs.send(frame(1, "upstream", "Connection refused")).unwrap();
    live.logs.send(frame(2, "gateway", "ok")).unwrap();
    live.logs.send(frame(3, "gateway", "connection REFUSED again")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router.clone(), "/api/v1/logs?q=refused").await;
    let ids: Vec<&str> = json["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);

    let (_status, json) = get(live.router, "/api/v1/logs?limit=1").await;
    assert_eq!(json["logs"][0]["id"], "3");
    assert_eq!(json["total_count"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_discards_records() {
    let live = live_app().await;

    let (status, _json) = post_json(live.router.clone(), "/api/v1/logs/pause", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    live.logs.send(frame(1, "gateway", "lost")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router.clone(), "/api/v1/logs/status").await;
    assert_eq!(json["paused"], true);

    let (status, _json) = request(live.router.clone(), "POST", "/api/v1/logs/resume").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    live.logs.send(frame(2, "gateway", "kept")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router, "/api/v1/logs").await;
    assert_eq!(json["logs"].as_array().unwrap().len(), 1);
    assert_eq!(json["logs"][0]["message"], "kept");
}

#[tokio::test(start_paused = true)]
async fn test_hidden_view_discards_records() {
    let live = live_app().await;

    let (status, _json) = send_json(
        live.router.clone(),
        "PUT",
        "/api/v1/logs/visibility",
        json!({"visible": false}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    live.logs.send(frame(1, "gateway", "hidden")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router, "/api/v1/logs").await;
    assert_eq!(json["logs"], json!([]));
}

#[tokio::test(start_paused = true)]
async fn test_source_filter() {
    let live = live_app().await;

    let (status, _json) = send_json(
        live.router.clone(),
        "PUT",
        "/api/v1/logs/filter",
        json!({"value": "weather"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    live.logs.send(frame(1, "weather", "sunny")).unwrap();
    live.logs.send(frame(2, "github", "issue opened")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router.clone(), "/api/v1/logs").await;
    assert_eq!(json["logs"].as_array().unwrap().len(), 1);
    assert_eq!(json["logs"][0]["source"], "weather");

    let (status, _json) = request(live.router.clone(), "DELETE", "/api/v1/logs/filter").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    live.logs.send(frame(3, "github", "issue closed")).unwrap();
    after_flush().await;

    let (_status, json) = get(live.router, "/api/v1/logs").await;
    assert_eq!(json["logs"].as_array().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_filter_rejected() {
    let live = live_app().await;

    let (status, json) = send_json(
        live.router,
        "PUT",
        "/api/v1/logs/filter",
        json!({"value": "weather", "key": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test(start_paused = true)]
async fn test_stopped_feed_reports_unavailable() {
    let live = live_app().await;
    live.log_feed.teardown().await;

    let (status, json) = request(live.router.clone(), "POST", "/api/v1/logs/pause").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "feed_stopped");

    let (_status, json) = get(live.router, "/api/v1/logs/status").await;
    assert_eq!(json["state"], "closed");
}

#[tokio::test]
async fn test_logs_without_feed() {
    let (app, _source) = test_app();

    let (status, json) = get(app, "/api/v1/logs").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "feed_disabled");
}
