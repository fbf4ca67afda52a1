//! Live log feed endpoints.
//!
//! Reads the committed snapshot of the live log buffer and forwards control
//! commands (pause, visibility, source filter) to the feed task. Commands are
//! applied asynchronously, so they answer `202 Accepted`.

use super::{api_error, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::live::{search, FeedError, FeedStatus, LogFeedHandle, SourceFilter};
use shared::models::EnrichedEvent;
use validator::Validate;

/// Query parameters for reading logs.
#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    /// Case-insensitive substring matched against message and source.
    pub q: Option<String>,
    /// Keep only the newest `limit` matches.
    pub limit: Option<usize>,
}

/// Response for log reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    /// Matching records in committed order.
    pub logs: Vec<EnrichedEvent>,
    /// Number of committed records before filtering.
    pub total_count: usize,
}

/// Request body for visibility changes.
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    /// Whether the consuming view is visible.
    pub visible: bool,
}

/// Request body for setting the source filter.
#[derive(Debug, Deserialize, Validate)]
pub struct FilterRequest {
    /// Source name to keep.
    #[validate(length(min = 1, message = "Filter value cannot be empty"))]
    pub value: String,

    /// Metadata field compared against `value` (defaults to `service`).
    #[validate(length(min = 1, message = "Metadata key cannot be empty"))]
    pub key: Option<String>,
}

impl From<FilterRequest> for SourceFilter {
    fn from(request: FilterRequest) -> Self {
        let filter = SourceFilter::new(request.value);
        match request.key {
            Some(key) => filter.with_metadata_key(key),
            None => filter,
        }
    }
}

/// Creates the live log routes.
pub fn logs_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/logs", get(read_logs))
        .route("/api/v1/logs/status", get(feed_status))
        .route("/api/v1/logs/pause", post(pause))
        .route("/api/v1/logs/resume", post(resume))
        .route("/api/v1/logs/visibility", put(set_visibility))
        .route("/api/v1/logs/filter", put(set_filter).delete(clear_filter))
        .with_state(state)
}

fn log_feed(state: &AppState) -> ApiResult<&LogFeedHandle> {
    state.logs().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "feed_disabled",
            "Live log feed is not configured",
        )
    })
}

fn command_result(result: Result<(), FeedError>) -> ApiResult<StatusCode> {
    result
        .map(|()| StatusCode::ACCEPTED)
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, "feed_stopped", e.to_string()))
}

async fn read_logs(
    State(state): State<AppState>,
    params: Result<Query<LogQueryParams>, QueryRejection>,
) -> ApiResult<Json<LogsResponse>> {
    let Query(params) = params.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
    })?;
    let snapshot = log_feed(&state)?.snapshot();

    let logs = search(&snapshot, params.q.as_deref().unwrap_or_default(), params.limit);
    Ok(Json(LogsResponse {
        logs,
        total_count: snapshot.len(),
    }))
}

async fn feed_status(State(state): State<AppState>) -> ApiResult<Json<FeedStatus>> {
    Ok(Json(log_feed(&state)?.status()))
}

async fn pause(State(state): State<AppState>) -> ApiResult<StatusCode> {
    command_result(log_feed(&state)?.pause())
}

async fn resume(State(state): State<AppState>) -> ApiResult<StatusCode> {
    command_result(log_feed(&state)?.resume())
}

async fn set_visibility(
    State(state): State<AppState>,
    payload: Result<Json<VisibilityRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
    })?;
    command_result(log_feed(&state)?.set_visible(request.visible))
}

async fn set_filter(
    State(state): State<AppState>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
    })?;
    request
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;

    command_result(log_feed(&state)?.set_filter(Some(request.into())))
}

async fn clear_filter(State(state): State<AppState>) -> ApiResult<StatusCode> {
    command_result(log_feed(&state)?.set_filter(None))
}
