//! Call-protocol inspector buffer.
//!
//! Keeps only records whose message is a JSON-RPC 2.0 envelope, newest first.
//! [`SyntheticTraffic`] produces plausible request/response pairs for demos.

use crate::models::{EventRecord, LogLevel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of inspector messages retained.
pub const INSPECTOR_CAPACITY: usize = 1000;

/// Source name stamped on synthetic records.
pub const SYNTHETIC_SOURCE: &str = "synthetic";

/// Shape of a JSON-RPC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A method call expecting a response.
    Request,
    /// A method call without an id.
    Notification,
    /// A successful response.
    Response,
    /// An error response.
    Error,
}

/// One captured JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessage {
    /// Id of the record that carried the message.
    pub id: String,
    /// Record timestamp.
    pub timestamp: String,
    /// Record source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Message shape.
    pub kind: MessageKind,
    /// Method name for requests and notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// JSON-RPC id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_id: Option<Value>,
    /// The full envelope.
    pub payload: Value,
}

impl ProtocolMessage {
    /// Builds a message from a record, or `None` if the record is not JSON-RPC 2.0.
    #[must_use]
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        let payload: Value = serde_json::from_str(&record.message).ok()?;
        if payload.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return None;
        }

        let method = payload.get("method").and_then(Value::as_str).map(str::to_string);
        let rpc_id = payload.get("id").filter(|id| !id.is_null()).cloned();
        let kind = match (&method, &rpc_id) {
            (Some(_), Some(_)) => MessageKind::Request,
            (Some(_), None) => MessageKind::Notification,
            (None, _) if payload.get("error").is_some_and(|e| !e.is_null()) => MessageKind::Error,
            (None, _) => MessageKind::Response,
        };

        Some(Self {
            id: record.id.clone(),
            timestamp: record.timestamp.clone(),
            source: record.source.clone(),
            kind,
            method,
            rpc_id,
            payload,
        })
    }
}

/// Newest-first buffer of JSON-RPC messages.
#[derive(Debug)]
pub struct InspectorBuffer {
    capacity: usize,
    messages: VecDeque<Arc<ProtocolMessage>>,
}

impl Default for InspectorBuffer {
    fn default() -> Self {
        Self::new(INSPECTOR_CAPACITY)
    }
}

impl InspectorBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity.min(INSPECTOR_CAPACITY)),
        }
    }

    /// Decodes a push frame and keeps it if it carries a JSON-RPC 2.0 message.
    ///
    /// Frames that are not records are dropped.
    pub fn ingest_frame(&mut self, frame: &str) -> bool {
        match serde_json::from_str::<EventRecord>(frame) {
            Ok(record) => self.ingest(&record),
            Err(_) => false,
        }
    }

    /// Keeps the record if it carries a JSON-RPC 2.0 message.
    pub fn ingest(&mut self, record: &EventRecord) -> bool {
        let Some(message) = ProtocolMessage::from_record(record) else {
            return false;
        };
        self.messages.push_front(Arc::new(message));
        self.messages.truncate(self.capacity);
        true
    }

    /// Returns the retained messages, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<ProtocolMessage>> {
        self.messages.iter().cloned().collect()
    }

    /// Returns the number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no messages are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Discards all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

const TOOLS: &[(&str, &str)] = &[
    ("weather.get_forecast", r#"{"city":"Berlin","days":3}"#),
    ("github.list_issues", r#"{"repo":"acme/gateway","state":"open"}"#),
    ("filesystem.read_file", r#"{"path":"/srv/data/report.csv"}"#),
    ("search.web", r#"{"query":"rust async cancellation"}"#),
];

const FAILURES: &[(i64, &str)] = &[
    (-32602, "Invalid input: missing required field"),
    (-32603, "Upstream request timeout"),
    (-32000, "Rate limit exceeded"),
];

/// Generates alternating JSON-RPC requests and responses.
#[derive(Debug)]
pub struct SyntheticTraffic {
    rng: StdRng,
    next_id: u64,
    pending: Option<(u64, &'static str)>,
}

impl Default for SyntheticTraffic {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticTraffic {
    /// Creates a generator seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            next_id: 1,
            pending: None,
        }
    }

    /// Produces the next record: a `tools/call` request, or the response to the
    /// previous one.
    pub fn next_record(&mut self) -> EventRecord {
        let (level, envelope) = match self.pending.take() {
            Some((id, tool)) => self.response(id, tool),
            None => self.request(),
        };
        EventRecord::new(level, envelope.to_string()).with_source(SYNTHETIC_SOURCE)
    }

    fn request(&mut self) -> (LogLevel, Value) {
        let (tool, arguments) = TOOLS[self.rng.gen_range(0..TOOLS.len())];
        let id = self.next_id;
        self.next_id += 1;
        self.pending = Some((id, tool));

        let arguments: Value = serde_json::from_str(arguments).unwrap_or(Value::Null);
        (
            LogLevel::Debug,
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": tool, "arguments": arguments}
            }),
        )
    }

    fn response(&mut self, id: u64, tool: &str) -> (LogLevel, Value) {
        if self.rng.gen_bool(0.8) {
            let latency_ms: u32 = self.rng.gen_range(5..900);
            return (
                LogLevel::Debug,
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "content": [{"type": "text", "text": format!("{tool} finished in {latency_ms}ms")}],
                        "isError": false
                    }
                }),
            );
        }
        let (code, message) = FAILURES[self.rng.gen_range(0..FAILURES.len())];
        (
            LogLevel::Error,
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message}
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> EventRecord {
        EventRecord::new(LogLevel::Debug, message)
    }

    #[test]
    fn test_accepts_only_jsonrpc_two() {
        let mut buffer = InspectorBuffer::new(10);

        assert!(buffer.ingest(&record(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)));
        assert!(!buffer.ingest(&record(r#"{"jsonrpc":"1.0","id":1,"method":"x"}"#)));
        assert!(!buffer.ingest(&record(r#"{"id":1,"method":"x"}"#)));
        assert!(!buffer.ingest(&record("plain text")));

        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_drops_non_record_frames() {
        let mut buffer = InspectorBuffer::new(10);
        assert!(!buffer.ingest_frame("garbage"));
        assert!(!buffer.ingest_frame(r#"{"jsonrpc":"2.0","method":"x"}"#));

        let frame = serde_json::to_string(&record(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#)).unwrap();
        assert!(buffer.ingest_frame(&frame));
        assert_eq!(buffer.snapshot()[0].kind, MessageKind::Response);
    }

    #[test]
    fn test_newest_first_and_capped() {
        let mut buffer = InspectorBuffer::new(3);
        for i in 0..5 {
            buffer.ingest(&record(&format!(r#"{{"jsonrpc":"2.0","id":{i},"result":{{}}}}"#)));
        }

        let ids: Vec<Value> = buffer
            .snapshot()
            .iter()
            .filter_map(|m| m.rpc_id.clone())
            .collect();
        assert_eq!(ids, vec![json!(4), json!(3), json!(2)]);
    }

    #[test]
    fn test_message_kinds() {
        let kind = |text: &str| ProtocolMessage::from_record(&record(text)).map(|m| m.kind);

        assert_eq!(
            kind(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#),
            Some(MessageKind::Request)
        );
        assert_eq!(
            kind(r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#),
            Some(MessageKind::Notification)
        );
        assert_eq!(
            kind(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#),
            Some(MessageKind::Error)
        );
        assert_eq!(
            kind(r#"{"jsonrpc":"2.0","id":1,"result":null,"error":null}"#),
            Some(MessageKind::Response)
        );
    }

    #[test]
    fn test_clear() {
        let mut buffer = InspectorBuffer::new(3);
        buffer.ingest(&record(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_synthetic_traffic_pairs_requests_and_responses() {
        let mut traffic = SyntheticTraffic::seeded(7);
        let mut buffer = InspectorBuffer::new(10);

        for _ in 0..6 {
            let record = traffic.next_record();
            assert_eq!(record.source.as_deref(), Some(SYNTHETIC_SOURCE));
            assert!(buffer.ingest(&record));
        }

        let messages = buffer.snapshot();
        assert_eq!(messages.len(), 6);
        for pair in messages.chunks(2) {
            let (response, request) = (&pair[0], &pair[1]);
            assert_eq!(request.kind, MessageKind::Request);
            assert_eq!(request.method.as_deref(), Some("tools/call"));
            assert!(matches!(response.kind, MessageKind::Response | MessageKind::Error));
            assert_eq!(response.rpc_id, request.rpc_id);
        }
    }
}
