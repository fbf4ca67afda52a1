//! Trace assembly.
//!
//! Turns one captured [`RawEntry`] and its optional flat list of [`RawSpan`]s into
//! a hierarchical [`Trace`]:
//!
//! 1. The entry itself becomes the root span (`"{method} {path}"`, kind `core`).
//! 2. Without explicit spans, a JSON-RPC call in the request body yields a single
//!    implicit child and the root is relabelled [`IMPLICIT_ROOT_NAME`].
//! 3. With explicit spans, the tree is built from an arena keyed by span id plus a
//!    parent-resolution pass. Spans whose parent is missing hang off the root, so
//!    list order never matters and the result is always a tree.
//!
//! Assembly never fails: an undecodable body degrades to a `{"raw": ...}` value
//! for that field only.

use crate::models::{RawEntry, RawSpan, Span, SpanStatus, Trace};
use crate::payload::{decode_body, extract_error_message, JsonRpcMessage, ResponseOutcome};
use chrono::DateTime;
use serde_json::Value;
use std::collections::HashMap;

/// Service name given to spans that do not declare one.
pub const DEFAULT_SERVICE_NAME: &str = "gateway";

/// Root span name used when the trace is built from an implicit JSON-RPC call.
pub const IMPLICIT_ROOT_NAME: &str = "Execute Request";

/// Trigger tag attached to every trace.
pub const DEFAULT_TRIGGER: &str = "user";

/// Builds [`Trace`]s from captured gateway traffic.
///
/// # Example
///
/// ```
/// use shared::assembler::TraceAssembler;
/// use shared::models::{RawEntry, SpanKind};
///
/// let entry = RawEntry::new("req-1", "POST", "/mcp", 200)
///     .with_request_body(r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"my_tool","arguments":{}}}"#)
///     .with_response_body(r#"{"jsonrpc":"2.0","result":{"output":"success"}}"#);
///
/// let trace = TraceAssembler::default().assemble(&entry);
/// assert_eq!(trace.root_span.name, "Execute Request");
/// assert_eq!(trace.root_span.children[0].kind, SpanKind::Tool);
/// ```
#[derive(Debug, Clone)]
pub struct TraceAssembler {
    service_name: String,
}

impl Default for TraceAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl TraceAssembler {
    /// Creates an assembler that attributes spans to `service_name` by default.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the default service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Assembles one entry into a trace.
    #[must_use]
    pub fn assemble(&self, entry: &RawEntry) -> Trace {
        let start_time = epoch_millis(&entry.timestamp);
        let end_time = start_time + nanos_to_millis(entry.duration);
        let request = decode_optional(&entry.request_body);
        let response = decode_optional(&entry.response_body);

        let status = if entry.is_failure() {
            SpanStatus::Error
        } else {
            SpanStatus::Success
        };

        let mut root = Span::new(
            entry.id.clone(),
            format!("{} {}", entry.method, entry.path),
            self.service_name.clone(),
        )
        .with_timing(start_time, end_time)
        .with_status(status);

        if entry.is_failure() {
            let decoded = response
                .clone()
                .unwrap_or_else(|| decode_body(&entry.response_body));
            let message = extract_error_message(&decoded, &entry.response_body);
            if !message.is_empty() {
                root.error_message = Some(message);
            }
        }

        match entry.spans.as_deref().filter(|spans| !spans.is_empty()) {
            Some(spans) => root.children = self.build_tree(spans),
            None => {
                if let Some(call) = self.implicit_call(entry, request.as_ref(), response.as_ref()) {
                    root.name = IMPLICIT_ROOT_NAME.to_string();
                    root.children.push(call.with_timing(start_time, end_time));
                }
            }
        }

        root.input = request;
        root.output = response;

        Trace {
            id: entry.id.clone(),
            timestamp: entry.timestamp.clone(),
            total_duration: nanos_to_millis_f64(entry.duration),
            status: root.status,
            trigger: DEFAULT_TRIGGER.to_string(),
            root_span: root,
        }
    }

    /// Assembles a batch of entries, newest first.
    #[must_use]
    pub fn assemble_batch(&self, entries: &[RawEntry]) -> Vec<Trace> {
        let mut traces: Vec<Trace> = entries.iter().map(|entry| self.assemble(entry)).collect();
        sort_traces(&mut traces);
        traces
    }

    fn implicit_call(
        &self,
        entry: &RawEntry,
        request: Option<&Value>,
        response: Option<&Value>,
    ) -> Option<Span> {
        let target = JsonRpcMessage::classify(request?)?.call()?;

        let mut span = Span::new(
            format!("{}-call", entry.id),
            target.name,
            self.service_name.clone(),
        )
        .with_kind(target.kind);
        span.input = target.arguments;

        match response.map(ResponseOutcome::from_body) {
            Some(outcome) => {
                span.status = if outcome.is_error() {
                    SpanStatus::Error
                } else {
                    SpanStatus::Success
                };
                span.error_message = outcome.error;
                span.output = Some(outcome.output);
            }
            None if entry.is_failure() => span.status = SpanStatus::Error,
            None => {}
        }

        Some(span)
    }

    fn instantiate(&self, raw: &RawSpan) -> Span {
        let start_time = epoch_millis(&raw.start_time);
        Span {
            id: raw.id.clone(),
            name: raw.name.clone(),
            kind: crate::models::SpanKind::from_raw(&raw.kind),
            start_time,
            end_time: start_time + nanos_to_millis(raw.duration),
            status: raw.status.into(),
            input: raw.input.clone(),
            output: raw.output.clone(),
            error_message: raw.error.clone(),
            children: Vec::new(),
            service_name: raw
                .service
                .clone()
                .unwrap_or_else(|| self.service_name.clone()),
        }
    }

    /// Builds the children of the root from a flat span list.
    fn build_tree(&self, raw: &[RawSpan]) -> Vec<Span> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(raw.len());
        for (i, span) in raw.iter().enumerate() {
            index.entry(span.id.as_str()).or_insert(i);
        }
        let mut nodes: Vec<Option<Span>> = raw.iter().map(|s| Some(self.instantiate(s))).collect();

        let mut parents: Vec<Option<usize>> = raw
            .iter()
            .enumerate()
            .map(|(i, span)| {
                let parent_id = span.parent_id.as_deref()?;
                let parent = index.get(parent_id).copied().filter(|&p| p != i);
                if parent.is_none() {
                    tracing::debug!(
                        span_id = %span.id,
                        parent_id,
                        "Parent span not found, attaching to root"
                    );
                }
                parent
            })
            .collect();
        break_cycles(&mut parents);

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); raw.len()];
        let mut top = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(i),
                None => top.push(i),
            }
        }

        // Children always come after their parent in breadth-first order, so
        // walking it backwards finalises every subtree before it is moved.
        let mut order = top.clone();
        let mut cursor = 0;
        while cursor < order.len() {
            order.extend_from_slice(&children[order[cursor]]);
            cursor += 1;
        }
        for &i in order.iter().rev() {
            let subtree: Vec<Span> = children[i]
                .iter()
                .filter_map(|&c| nodes[c].take())
                .collect();
            if let Some(node) = nodes[i].as_mut() {
                node.children = subtree;
            }
        }

        top.iter().filter_map(|&i| nodes[i].take()).collect()
    }
}

/// Detaches one node of every parent cycle so that each chain ends at the root.
fn break_cycles(parents: &mut [Option<usize>]) {
    const UNVISITED: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNVISITED; parents.len()];
    for start in 0..parents.len() {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(node) = current {
            match state[node] {
                DONE => break,
                ON_PATH => {
                    tracing::debug!(node, "Span parent cycle detected, attaching to root");
                    parents[node] = None;
                    break;
                }
                _ => {
                    state[node] = ON_PATH;
                    path.push(node);
                    current = parents[node];
                }
            }
        }
        for node in path {
            state[node] = DONE;
        }
    }
}

/// Assembles one entry with the default assembler.
#[must_use]
pub fn assemble_trace(entry: &RawEntry) -> Trace {
    TraceAssembler::default().assemble(entry)
}

/// Sorts traces newest first.
///
/// ISO-8601 timestamps order lexically, so they are compared as strings.
pub fn sort_traces(traces: &mut [Trace]) {
    traces.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn decode_optional(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        None
    } else {
        Some(decode_body(body))
    }
}

fn epoch_millis(timestamp: &str) -> i64 {
    DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |e| {
            tracing::debug!(timestamp, error = %e, "Unparseable timestamp, using epoch");
            0
        },
        |t| t.timestamp_millis(),
    )
}

fn nanos_to_millis(nanos: i64) -> i64 {
    nanos.max(0) / 1_000_000
}

#[allow(clippy::cast_precision_loss)]
fn nanos_to_millis_f64(nanos: i64) -> f64 {
    nanos.max(0) as f64 / 1e6
}
