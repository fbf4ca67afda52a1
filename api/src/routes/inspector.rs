//! Call-protocol inspector endpoints.

use super::{api_error, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::live::{InspectorFeedHandle, InspectorStatus, ProtocolMessage};

/// Response for inspector reads.
#[derive(Debug, Serialize)]
pub struct InspectorResponse {
    /// Captured JSON-RPC messages, newest first.
    pub messages: Vec<ProtocolMessage>,
    /// Feed status.
    pub status: InspectorStatus,
}

/// Request body for toggling synthetic traffic.
#[derive(Debug, Deserialize)]
pub struct SyntheticRequest {
    /// Whether synthetic traffic replaces the live connection.
    pub enabled: bool,
}

/// Creates the inspector routes.
pub fn inspector_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/inspector", get(read_messages))
        .route("/api/v1/inspector/synthetic", post(set_synthetic))
        .with_state(state)
}

fn inspector_feed(state: &AppState) -> ApiResult<&InspectorFeedHandle> {
    state.inspector().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "feed_disabled",
            "Inspector feed is not configured",
        )
    })
}

async fn read_messages(State(state): State<AppState>) -> ApiResult<Json<InspectorResponse>> {
    let feed = inspector_feed(&state)?;
    let messages = feed
        .snapshot()
        .iter()
        .map(|message| message.as_ref().clone())
        .collect();

    Ok(Json(InspectorResponse {
        messages,
        status: feed.status(),
    }))
}

async fn set_synthetic(
    State(state): State<AppState>,
    payload: Result<Json<SyntheticRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
    })?;
    let feed = inspector_feed(&state)?;

    let result = if request.enabled {
        feed.start_synthetic()
    } else {
        feed.stop_synthetic()
    };
    tracing::info!(enabled = request.enabled, "Synthetic inspector traffic toggled");

    result
        .map(|()| StatusCode::ACCEPTED)
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, "feed_stopped", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_inspector_without_feed_is_unavailable() {
        let app = inspector_routes(AppState::with_in_memory_source());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/inspector")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
