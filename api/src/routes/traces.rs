//! Trace and diagnostic query endpoints.
//!
//! Traces are assembled on every request from the entries the gateway currently
//! holds; nothing is stored on this side.

use super::{api_error, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::diagnostics::analyze_trace;
use shared::models::{Diagnostic, Trace};

/// Query parameters for listing traces.
#[derive(Debug, Deserialize)]
pub struct TraceListParams {
    /// Maximum number of entries requested from the gateway.
    pub limit: Option<usize>,
}

/// Response for trace listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceListResponse {
    /// Assembled traces, newest first.
    pub traces: Vec<Trace>,
    /// Number of traces returned.
    pub total_count: usize,
}

/// Response for a single trace.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceDetailResponse {
    /// The assembled trace.
    pub trace: Trace,
    /// Diagnostics for the trace; empty for successful traces.
    pub diagnostics: Vec<Diagnostic>,
}

/// Response for diagnostics only.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    /// Trace identifier.
    pub trace_id: String,
    /// Diagnostics for the trace.
    pub diagnostics: Vec<Diagnostic>,
}

/// Creates the traces routes.
pub fn traces_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/traces", get(list_traces))
        .route("/api/v1/traces/{trace_id}", get(get_trace))
        .route("/api/v1/traces/{trace_id}/diagnostics", get(get_diagnostics))
        .with_state(state)
}

async fn list_traces(
    State(state): State<AppState>,
    params: Result<Query<TraceListParams>, QueryRejection>,
) -> ApiResult<Json<TraceListResponse>> {
    let Query(params) = params.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
    })?;

    let entries = state.entries().fetch_entries(params.limit).await;
    let traces = state.assembler().assemble_batch(&entries);

    tracing::debug!(count = traces.len(), limit = ?params.limit, "Traces assembled");

    Ok(Json(TraceListResponse {
        total_count: traces.len(),
        traces,
    }))
}

async fn find_trace(state: &AppState, trace_id: &str) -> ApiResult<Trace> {
    let entry = state.entries().find_entry(trace_id).await.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Trace not found: {trace_id}"),
        )
    })?;
    Ok(state.assembler().assemble(&entry))
}

async fn get_trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> ApiResult<Json<TraceDetailResponse>> {
    let trace = find_trace(&state, &trace_id).await?;
    let diagnostics = analyze_trace(&trace);
    Ok(Json(TraceDetailResponse { trace, diagnostics }))
}

async fn get_diagnostics(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> ApiResult<Json<DiagnosticsResponse>> {
    let trace = find_trace(&state, &trace_id).await?;
    Ok(Json(DiagnosticsResponse {
        diagnostics: analyze_trace(&trace),
        trace_id: trace.id,
    }))
}
