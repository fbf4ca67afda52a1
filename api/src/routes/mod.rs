//! API route definitions.
//!
//! This module organizes all HTTP routes for the Lantern API server.

mod health;
mod inspector;
mod logs;
mod traces;

pub use health::health_routes;
pub use inspector::inspector_routes;
pub use logs::logs_routes;
pub use traces::traces_routes;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Error response body shared by all routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Result type returned by route handlers.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Builds an error response.
pub fn api_error(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}
