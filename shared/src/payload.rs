//! Payload decoding for captured request and response bodies.
//!
//! Bodies arrive as opaque strings. [`decode_body`] turns them into JSON values,
//! tolerating server-sent-event framing and falling back to a `{"raw": ...}`
//! wrapper so that a bad body never aborts trace assembly.

use crate::models::SpanKind;
use serde_json::{json, Value};

/// Maximum number of characters of raw body text used as an error message.
pub const ERROR_TEXT_LIMIT: usize = 200;

/// Decodes a captured body.
///
/// Tries, in order: strict JSON, SSE framing (`event:` / `data:` blocks carrying
/// JSON), and finally wraps the text as `{"raw": text}`.
///
/// # Example
///
/// ```
/// use shared::payload::decode_body;
/// use serde_json::json;
///
/// assert_eq!(decode_body(r#"{"a":1}"#), json!({"a": 1}));
/// assert_eq!(
///     decode_body("event: message\ndata: {\"result\":\"ok\"}\n\n"),
///     json!({"result": "ok"})
/// );
/// assert_eq!(decode_body("<html>"), json!({"raw": "<html>"}));
/// ```
#[must_use]
pub fn decode_body(raw: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return value;
    }
    if let Some(value) = parse_sse(raw) {
        return value;
    }
    json!({ "raw": raw })
}

/// Extracts the first JSON `data:` payload from an event-stream body.
///
/// Returns `None` unless the body contains at least one `event:` line and a block
/// whose `data:` lines form valid JSON. Multiple `data:` lines within one block
/// are joined with newlines.
#[must_use]
pub fn parse_sse(raw: &str) -> Option<Value> {
    let normalized = raw.replace("\r\n", "\n");
    if !normalized.lines().any(|line| line.starts_with("event:")) {
        return None;
    }

    normalized.split("\n\n").find_map(|block| {
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.strip_prefix(' ').unwrap_or(data))
            .collect();
        if data.is_empty() {
            return None;
        }
        serde_json::from_str(&data.join("\n")).ok()
    })
}

/// A recognised JSON-RPC 2.0 envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonRpcMessage<'a> {
    /// A request or notification.
    Request {
        /// Method name, e.g. `tools/call`.
        method: &'a str,
        /// Parameters, if present.
        params: Option<&'a Value>,
    },
    /// A response.
    Response {
        /// Successful result.
        result: Option<&'a Value>,
        /// Error object.
        error: Option<&'a Value>,
    },
}

/// The target of a call-style JSON-RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    /// Span kind the call maps to.
    pub kind: SpanKind,
    /// Tool name, prompt name or resource URI.
    pub name: String,
    /// Call arguments.
    pub arguments: Option<Value>,
}

impl<'a> JsonRpcMessage<'a> {
    /// Recognises a JSON-RPC 2.0 envelope.
    ///
    /// The value must be an object with `"jsonrpc": "2.0"` and at least one of
    /// `method`, `result` or `error`.
    #[must_use]
    pub fn classify(value: &'a Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return None;
        }
        if let Some(method) = object.get("method").and_then(Value::as_str) {
            return Some(Self::Request {
                method,
                params: object.get("params"),
            });
        }
        let result = object.get("result");
        let error = object.get("error").filter(|e| !e.is_null());
        if result.is_none() && error.is_none() {
            return None;
        }
        Some(Self::Response { result, error })
    }

    /// Returns the call target for `tools/call`, `prompts/get` and `resources/read`.
    #[must_use]
    pub fn call(&self) -> Option<CallTarget> {
        let Self::Request { method, params } = self else {
            return None;
        };
        let params = (*params)?;
        let (kind, name) = match *method {
            "tools/call" | "prompts/get" => (SpanKind::Tool, params.get("name")?),
            "resources/read" => (SpanKind::Resource, params.get("uri")?),
            _ => return None,
        };
        Some(CallTarget {
            kind,
            name: name.as_str()?.to_string(),
            arguments: params.get("arguments").cloned(),
        })
    }
}

/// The outcome carried by a decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOutcome {
    /// The `result`, the `error` object, or the whole body if neither is present.
    pub output: Value,
    /// Error message when the body carries an error.
    pub error: Option<String>,
}

impl ResponseOutcome {
    /// Reads the result or error out of a decoded response body.
    ///
    /// Works for full JSON-RPC envelopes as well as bare `{"result": ...}` objects
    /// such as those carried in SSE frames.
    #[must_use]
    pub fn from_body(decoded: &Value) -> Self {
        if let Some(error) = decoded.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map_or_else(|| error.to_string(), str::to_string);
            return Self {
                output: error.clone(),
                error: Some(message),
            };
        }
        let output = decoded.get("result").unwrap_or(decoded).clone();
        Self {
            output,
            error: None,
        }
    }

    /// Returns true if the response carried an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Extracts a human-readable error message from a failed response.
///
/// Checks, in order: a string `error` field, a string `error.message`, a string
/// `message`, a string `detail`; otherwise falls back to `raw` truncated to
/// [`ERROR_TEXT_LIMIT`] characters with an ellipsis.
///
/// # Example
///
/// ```
/// use shared::payload::{decode_body, extract_error_message};
///
/// let raw = r#"{"error":{"code":-32601,"message":"Method not found"}}"#;
/// assert_eq!(extract_error_message(&decode_body(raw), raw), "Method not found");
/// ```
#[must_use]
pub fn extract_error_message(decoded: &Value, raw: &str) -> String {
    let error = decoded.get("error");
    error
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .or_else(|| decoded.get("message").and_then(Value::as_str))
        .or_else(|| decoded.get("detail").and_then(Value::as_str))
        .map_or_else(|| truncate(raw, ERROR_TEXT_LIMIT), str::to_string)
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strict_json() {
        assert_eq!(decode_body("[1,2]"), json!([1, 2]));
        assert_eq!(decode_body("\"text\""), json!("text"));
    }

    #[test]
    fn test_decode_sse_body() {
        let body = "event: message\ndata: {\"result\":\"sse_success\"}\n\n";
        assert_eq!(decode_body(body), json!({"result": "sse_success"}));
    }

    #[test]
    fn test_decode_sse_with_crlf_and_multiline_data() {
        let body = "event: message\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\n";
        assert_eq!(decode_body(body), json!({"a": 1}));
    }

    #[test]
    fn test_decode_sse_skips_non_json_blocks() {
        let body = "event: ping\ndata: keepalive\n\nevent: message\ndata: {\"ok\":true}\n\n";
        assert_eq!(decode_body(body), json!({"ok": true}));
    }

    #[test]
    fn test_data_lines_without_event_are_not_sse() {
        let body = "data: {\"ok\":true}\n\n";
        assert_eq!(decode_body(body), json!({"raw": body}));
    }

    #[test]
    fn test_decode_fallback_wraps_raw() {
        assert_eq!(decode_body(""), json!({"raw": ""}));
        assert_eq!(decode_body("{broken"), json!({"raw": "{broken"}));
    }

    #[test]
    fn test_classify_request_and_call() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "my_tool", "arguments": {"arg1": "val1"}}
        });
        let message = JsonRpcMessage::classify(&body).unwrap();
        let call = message.call().unwrap();

        assert_eq!(call.kind, SpanKind::Tool);
        assert_eq!(call.name, "my_tool");
        assert_eq!(call.arguments, Some(json!({"arg1": "val1"})));
    }

    #[test]
    fn test_resource_read_call() {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "resources/read",
            "params": {"uri": "file:///etc/motd"}
        });
        let call = JsonRpcMessage::classify(&body).unwrap().call().unwrap();
        assert_eq!(call.kind, SpanKind::Resource);
        assert_eq!(call.name, "file:///etc/motd");
        assert_eq!(call.arguments, None);
    }

    #[test]
    fn test_non_call_methods_have_no_target() {
        let body = json!({"jsonrpc": "2.0", "method": "tools/list"});
        assert!(JsonRpcMessage::classify(&body).unwrap().call().is_none());
    }

    #[test]
    fn test_classify_rejects_non_envelopes() {
        assert!(JsonRpcMessage::classify(&json!({"jsonrpc": "1.0", "method": "x"})).is_none());
        assert!(JsonRpcMessage::classify(&json!({"jsonrpc": "2.0"})).is_none());
        assert!(JsonRpcMessage::classify(&json!({"method": "x"})).is_none());
        assert!(JsonRpcMessage::classify(&json!("2.0")).is_none());
    }

    #[test]
    fn test_classify_response() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"output": "success"}});
        assert!(matches!(
            JsonRpcMessage::classify(&body),
            Some(JsonRpcMessage::Response { result: Some(_), error: None })
        ));
    }

    #[test]
    fn test_response_outcome() {
        let ok = ResponseOutcome::from_body(&json!({"jsonrpc": "2.0", "result": {"output": "success"}}));
        assert_eq!(ok.output, json!({"output": "success"}));
        assert!(!ok.is_error());

        let failed = ResponseOutcome::from_body(&json!({
            "jsonrpc": "2.0",
            "error": {"code": -32602, "message": "invalid input"}
        }));
        assert!(failed.is_error());
        assert_eq!(failed.error.as_deref(), Some("invalid input"));

        let bare = ResponseOutcome::from_body(&json!({"value": 3}));
        assert_eq!(bare.output, json!({"value": 3}));
    }

    #[test]
    fn test_error_message_priority() {
        let both = json!({"error": "top", "message": "second"});
        assert_eq!(extract_error_message(&both, ""), "top");

        let nested = json!({"error": {"message": "nested"}, "message": "second"});
        assert_eq!(extract_error_message(&nested, ""), "nested");

        let message = json!({"error": {"code": 1}, "message": "second", "detail": "third"});
        assert_eq!(extract_error_message(&message, ""), "second");

        let detail = json!({"detail": "third"});
        assert_eq!(extract_error_message(&detail, ""), "third");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_text() {
        let raw = "upstream exploded";
        assert_eq!(extract_error_message(&decode_body(raw), raw), raw);
    }

    #[test]
    fn test_error_message_truncates_long_text() {
        let raw = "x".repeat(250);
        let message = extract_error_message(&decode_body(&raw), &raw);
        assert_eq!(message.len(), 203);
        assert!(message.ends_with("..."));

        let exact = "y".repeat(200);
        assert_eq!(extract_error_message(&json!({}), &exact), exact);
    }
}
