//! Trace and span data models.
//!
//! Defines the assembled, hierarchical execution trace served to the console.
//! Field names follow the console's camelCase JSON shape.

use serde::{Deserialize, Serialize};

/// Status of a span or trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// The operation completed without error.
    #[default]
    Success,
    /// The operation failed.
    Error,
    /// The operation has not completed.
    Pending,
}

impl SpanStatus {
    /// Returns true for [`SpanStatus::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Returns true for [`SpanStatus::Error`].
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

impl From<super::RawSpanStatus> for SpanStatus {
    fn from(status: super::RawSpanStatus) -> Self {
        match status {
            super::RawSpanStatus::Success => Self::Success,
            super::RawSpanStatus::Error => Self::Error,
            super::RawSpanStatus::Pending => Self::Pending,
        }
    }
}

/// Canonical kind of span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// A tool invocation.
    Tool,
    /// A call to an upstream service.
    Service,
    /// A resource read (files, databases, caches).
    Resource,
    /// Gateway-internal work, and anything unrecognised.
    #[default]
    Core,
}

impl SpanKind {
    /// Maps a free-text instrumentation kind onto the canonical enumeration.
    ///
    /// Matching is case-insensitive. Unknown kinds map to [`SpanKind::Core`].
    ///
    /// | Raw kinds | Canonical |
    /// |---|---|
    /// | `tool`, `tool_call`, `function`, `prompt` | `tool` |
    /// | `service`, `upstream`, `http`, `grpc`, `rpc`, `client`, `graphql` | `service` |
    /// | `resource`, `db`, `database`, `sql`, `cache`, `file`, `filesystem`, `storage` | `resource` |
    /// | anything else | `core` |
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::SpanKind;
    ///
    /// assert_eq!(SpanKind::from_raw("Database"), SpanKind::Resource);
    /// assert_eq!(SpanKind::from_raw("mystery"), SpanKind::Core);
    /// ```
    #[must_use]
    pub fn from_raw(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "tool" | "tool_call" | "function" | "prompt" => Self::Tool,
            "service" | "upstream" | "http" | "grpc" | "rpc" | "client" | "graphql" => {
                Self::Service
            }
            "resource" | "db" | "database" | "sql" | "cache" | "file" | "filesystem"
            | "storage" => Self::Resource,
            _ => Self::Core,
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Service => write!(f, "service"),
            Self::Resource => write!(f, "resource"),
            Self::Core => write!(f, "core"),
        }
    }
}

/// One node of a trace's execution tree.
///
/// # Example
///
/// ```
/// use shared::models::{Span, SpanKind, SpanStatus};
///
/// let span = Span::new("span-1", "POST /mcp", "gateway")
///     .with_kind(SpanKind::Core)
///     .with_timing(1_000, 1_250)
///     .with_child(Span::new("span-2", "weather.get", "gateway").with_kind(SpanKind::Tool));
///
/// assert_eq!(span.duration_ms(), 250);
/// assert_eq!(span.span_count(), 2);
/// assert_eq!(span.status, SpanStatus::Success);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Span identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Canonical kind.
    #[serde(rename = "type")]
    pub kind: SpanKind,

    /// Start time in epoch milliseconds.
    pub start_time: i64,

    /// End time in epoch milliseconds.
    pub end_time: i64,

    /// Completion status.
    pub status: SpanStatus,

    /// Decoded input payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    /// Decoded output payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Child spans in discovery order.
    #[serde(default)]
    pub children: Vec<Span>,

    /// Service that owns this span.
    pub service_name: String,
}

impl Span {
    /// Creates a successful, childless `core` span with zeroed timing.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: SpanKind::default(),
            start_time: 0,
            end_time: 0,
            status: SpanStatus::default(),
            input: None,
            output: None,
            error_message: None,
            children: Vec::new(),
            service_name: service_name.into(),
        }
    }

    /// Sets the span kind.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the span status.
    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets start and end time in epoch milliseconds.
    #[must_use]
    pub fn with_timing(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Sets the input payload.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets the output payload.
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Appends a child span.
    #[must_use]
    pub fn with_child(mut self, child: Span) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Iterates over this span and all descendants, depth-first, pre-order.
    pub fn iter(&self) -> SpanIter<'_> {
        SpanIter { stack: vec![self] }
    }

    /// Returns the number of spans in this subtree, including this one.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.iter().count()
    }

    /// Finds a span by id in this subtree.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Span> {
        self.iter().find(|span| span.id == id)
    }
}

/// Depth-first iterator over a span subtree.
pub struct SpanIter<'a> {
    stack: Vec<&'a Span>,
}

impl<'a> Iterator for SpanIter<'a> {
    type Item = &'a Span;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.stack.pop()?;
        self.stack.extend(span.children.iter().rev());
        Some(span)
    }
}

/// A reconstructed execution trace for one captured request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    /// Trace identifier (the captured request id).
    pub id: String,

    /// The single root of the execution tree.
    pub root_span: Span,

    /// ISO-8601 time the request was received.
    pub timestamp: String,

    /// Total duration in milliseconds.
    pub total_duration: f64,

    /// Overall status, mirroring the root span.
    pub status: SpanStatus,

    /// What initiated the request.
    pub trigger: String,
}

impl Trace {
    /// Returns the number of spans in this trace.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.root_span.span_count()
    }

    /// Returns all services involved in this trace, sorted and deduplicated.
    #[must_use]
    pub fn services(&self) -> Vec<&str> {
        let mut services: Vec<&str> = self
            .root_span
            .iter()
            .map(|s| s.service_name.as_str())
            .collect();
        services.sort_unstable();
        services.dedup();
        services
    }

    /// Returns true if either the trace or its root span failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status.is_error() || self.root_span.status.is_error()
    }
}
