//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup and HTTP request helpers.

use api::upstream::InMemoryEntrySource;
use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::assembler::TraceAssembler;
use shared::live::{ChannelSource, FeedConfig, InspectorFeed, LogFeed};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Creates a test router backed by an empty in-memory entry source.
///
/// # Returns
///
/// A tuple containing the configured router and the entry source.
pub fn test_app() -> (Router, InMemoryEntrySource) {
    let source = InMemoryEntrySource::default();
    let state = AppState::new(Arc::new(source.clone()), TraceAssembler::default());
    (create_router(state), source)
}

/// A router wired to running live feeds fed through in-process channels.
pub struct LiveApp {
    /// The router.
    pub router: Router,
    /// Sender for the log feed's connection.
    pub logs: UnboundedSender<String>,
    /// Sender for the inspector feed's connection.
    pub inspector: UnboundedSender<String>,
    /// Keeps the log feed task alive.
    pub log_feed: LogFeed,
    /// Keeps the inspector feed task alive.
    pub inspector_feed: InspectorFeed,
}

/// Creates a router with connected live feeds.
///
/// Call from a `#[tokio::test(start_paused = true)]` test; the feeds are connected
/// when this returns.
pub async fn live_app() -> LiveApp {
    let log_source = Arc::new(ChannelSource::new());
    let logs = log_source.offer();
    let inspector_source = Arc::new(ChannelSource::new());
    let inspector = inspector_source.offer();

    let log_feed = LogFeed::spawn(log_source, FeedConfig::default());
    let inspector_feed = InspectorFeed::spawn(inspector_source, FeedConfig::default());

    let state = AppState::with_in_memory_source()
        .with_log_feed(log_feed.handle())
        .with_inspector_feed(inspector_feed.handle());

    settle().await;

    LiveApp {
        router: create_router(state),
        logs,
        inspector,
        log_feed,
        inspector_feed,
    }
}

/// Lets the feed tasks process pending frames and commands.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits past one flush of the log buffer.
pub async fn after_flush() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a request with a JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn send_json(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Helper to make a POST request with JSON body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send_json(app, "POST", uri, body).await
}

/// Helper to make a body-less request with the given method.
pub async fn request(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    request(app, "GET", uri).await
}
