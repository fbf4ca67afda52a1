//! Wire-level records received from the gateway's debug API.
//!
//! A [`RawEntry`] is one captured HTTP exchange, optionally carrying the flat
//! list of [`RawSpan`] instrumentation points recorded while serving it. They are
//! consumed by the trace assembler and discarded afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header values as captured by the gateway: either a single value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// A single header value.
    One(String),
    /// Repeated header values.
    Many(Vec<String>),
}

/// Captured request or response headers.
pub type HeaderMap = HashMap<String, HeaderValue>;

/// One captured HTTP exchange.
///
/// # Example
///
/// ```
/// use shared::models::RawEntry;
///
/// let entry: RawEntry = serde_json::from_str(r#"{
///     "id": "req-1",
///     "timestamp": "2026-01-05T10:00:00Z",
///     "method": "POST",
///     "path": "/mcp",
///     "status": 200,
///     "duration": 1500000
/// }"#).unwrap();
///
/// assert!(!entry.is_failure());
/// assert!(entry.spans.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    /// Unique request identifier.
    pub id: String,

    /// ISO-8601 time the request was received.
    pub timestamp: String,

    /// HTTP method.
    pub method: String,

    /// Request path.
    pub path: String,

    /// HTTP status code of the response.
    pub status: u16,

    /// Time spent serving the request, in nanoseconds.
    #[serde(default)]
    pub duration: i64,

    /// Request headers.
    #[serde(default)]
    pub request_headers: HeaderMap,

    /// Response headers.
    #[serde(default)]
    pub response_headers: HeaderMap,

    /// Captured request body (may be truncated by the gateway).
    #[serde(default)]
    pub request_body: String,

    /// Captured response body (may be truncated by the gateway).
    #[serde(default)]
    pub response_body: String,

    /// Instrumentation spans recorded while serving the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<RawSpan>>,
}

impl RawEntry {
    /// Creates an entry with empty bodies, zero duration and the Unix epoch as timestamp.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: "1970-01-01T00:00:00Z".to_string(),
            method: method.into(),
            path: path.into(),
            status,
            duration: 0,
            request_headers: HeaderMap::new(),
            response_headers: HeaderMap::new(),
            request_body: String::new(),
            response_body: String::new(),
            spans: None,
        }
    }

    /// Sets the ISO-8601 timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Sets the duration in nanoseconds.
    #[must_use]
    pub fn with_duration_ns(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the captured request body.
    #[must_use]
    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = body.into();
        self
    }

    /// Sets the captured response body.
    #[must_use]
    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = body.into();
        self
    }

    /// Sets the explicit span list.
    #[must_use]
    pub fn with_spans(mut self, spans: Vec<RawSpan>) -> Self {
        self.spans = Some(spans);
        self
    }

    /// Returns true if the response status indicates failure (4xx or 5xx).
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

/// Status reported by an instrumentation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RawSpanStatus {
    /// Completed successfully.
    Success,
    /// Failed.
    Error,
    /// Still running, or a status this version does not know.
    #[default]
    #[serde(other)]
    Pending,
}

/// One instrumentation point inside a captured request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpan {
    /// Span identifier, unique within its entry.
    pub id: String,

    /// Identifier of the enclosing span, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Operation name.
    pub name: String,

    /// Free-text kind, mapped onto [`SpanKind`](super::SpanKind) during assembly.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// ISO-8601 start time.
    pub start_time: String,

    /// Duration in nanoseconds.
    #[serde(default)]
    pub duration: i64,

    /// Completion status.
    #[serde(default)]
    pub status: RawSpanStatus,

    /// Input payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    /// Output payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Error text when the span failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Service that recorded the span; inherited from the trace when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl RawSpan {
    /// Creates a successful span of the given kind starting at the Unix epoch.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            kind: kind.into(),
            start_time: "1970-01-01T00:00:00Z".to_string(),
            duration: 0,
            status: RawSpanStatus::Success,
            input: None,
            output: None,
            error: None,
            service: None,
        }
    }

    /// Sets the parent span identifier.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: RawSpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the ISO-8601 start time and duration in nanoseconds.
    #[must_use]
    pub fn with_timing(mut self, start_time: impl Into<String>, duration: i64) -> Self {
        self.start_time = start_time.into();
        self.duration = duration;
        self
    }

    /// Sets the error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
