//! Health check endpoint.
//!
//! Liveness plus the connection state of each live feed, so operators can tell
//! a healthy console with a dropped event stream from one with feeds disabled.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use shared::live::ConnectionState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Live feed connection states.
    pub feeds: FeedsHealth,
}

/// Connection state per live feed; `None` when the feed is not configured.
#[derive(Debug, Serialize)]
pub struct FeedsHealth {
    /// Log feed.
    pub logs: Option<ConnectionState>,
    /// Inspector feed.
    pub inspector: Option<ConnectionState>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Reports liveness only; a dropped feed or an unreachable gateway does not
/// make the console unhealthy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let feeds = FeedsHealth {
        logs: state.logs().map(|feed| feed.status().state),
        inspector: state.inspector().map(|feed| feed.status().state),
    };

    Json(HealthResponse {
        status: "healthy",
        service: "lantern-api",
        version: env!("CARGO_PKG_VERSION"),
        feeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_body() {
        let app = health_routes(AppState::with_in_memory_source());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "lantern-api");
        assert!(health["version"].is_string());
        assert!(health["feeds"]["logs"].is_null());
        assert!(health["feeds"]["inspector"].is_null());
    }
}
