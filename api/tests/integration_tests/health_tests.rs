//! Integration tests for the health endpoint.

use axum::http::StatusCode;

use super::common::{get, live_app, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _source) = test_app();

    let (status, json) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "lantern-api");
    assert!(json["feeds"]["logs"].is_null());
}

#[tokio::test]
async fn test_health_does_not_depend_on_upstream() {
    let (app, source) = test_app();
    drop(source);

    let (status, _json) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_feed_states() {
    let live = live_app().await;

    let (status, json) = get(live.router.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["feeds"]["logs"], "connected");
    assert_eq!(json["feeds"]["inspector"], "connected");

    live.log_feed.teardown().await;

    let (status, json) = get(live.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["feeds"]["logs"], "closed");
}
