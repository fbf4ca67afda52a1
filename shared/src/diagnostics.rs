//! Diagnostic classification of failed traces.
//!
//! [`analyze_trace`] matches the trace's error text against a table of known
//! failure signatures and checks the span tree for runaway nesting. Rules are
//! independent: one error message can produce several diagnostics.

use crate::models::{Diagnostic, DiagnosticType, Span, Trace};
use serde_json::Value;

/// Span trees deeper than this produce a "High Recursion Depth" warning.
pub const MAX_RECOMMENDED_DEPTH: usize = 10;

struct Rule {
    title: &'static str,
    kind: DiagnosticType,
    tokens: &'static [&'static str],
    message: &'static str,
    suggestion: &'static str,
}

impl Rule {
    fn matches(&self, haystack: &str) -> bool {
        self.tokens.iter().any(|token| haystack.contains(token))
    }

    fn diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.kind, self.title, self.message).with_suggestion(self.suggestion)
    }
}

const RULES: &[Rule] = &[
    Rule {
        title: "Authentication Failed",
        kind: DiagnosticType::Error,
        tokens: &[
            "401",
            "403",
            "unauthorized",
            "unauthenticated",
            "invalid api key",
            "invalid token",
        ],
        message: "The upstream service rejected the request's credentials.",
        suggestion: "Check the API key or token configured for this service and make sure it has not expired.",
    },
    Rule {
        title: "Tool Not Found",
        kind: DiagnosticType::Error,
        tokens: &["tool not found", "unknown tool", "method not found"],
        message: "The requested tool or method is not registered.",
        suggestion: "Verify the tool name and that the service exposing it is enabled and healthy.",
    },
    Rule {
        title: "Rate Limit Exceeded",
        kind: DiagnosticType::Warning,
        tokens: &["429", "rate limit", "quota exceeded", "too many requests"],
        message: "The upstream service is throttling requests.",
        suggestion: "Reduce request frequency, enable caching, or raise the upstream quota.",
    },
    Rule {
        title: "Schema Validation Error",
        kind: DiagnosticType::Error,
        tokens: &[
            "schema validation",
            "validation error",
            "invalid input",
            "zoderror",
        ],
        message: "The arguments did not match the tool's input schema.",
        suggestion: "Compare the call arguments with the tool's input schema, including required fields and types.",
    },
    Rule {
        title: "Permission Denied",
        kind: DiagnosticType::Error,
        tokens: &["eperm", "eacces", "permission denied", "access denied"],
        message: "The operation was denied by the operating system or the upstream service.",
        suggestion: "Check file system permissions and the policies attached to this profile.",
    },
    Rule {
        title: "JSON Parsing Error",
        kind: DiagnosticType::Error,
        tokens: &["json parse error", "syntaxerror", "unexpected token"],
        message: "A payload could not be parsed as JSON.",
        suggestion: "Inspect the raw request and response bodies for malformed or truncated JSON.",
    },
    Rule {
        title: "Operation Timed Out",
        kind: DiagnosticType::Error,
        tokens: &["timeout", "deadline exceeded"],
        message: "The operation did not complete within its deadline.",
        suggestion: "Check upstream latency or increase the timeout configured for this service.",
    },
    Rule {
        title: "Connection Failed",
        kind: DiagnosticType::Error,
        tokens: &[
            "connection refused",
            "failed to connect",
            "econnrefused",
            "network error",
        ],
        message: "The gateway could not reach the upstream service.",
        suggestion: "Make sure the upstream is running and reachable from the gateway's network.",
    },
];

/// Classifies a trace's failure into actionable diagnostics.
///
/// Returns an empty list when both the trace and its root span succeeded.
/// Otherwise every matching rule contributes a diagnostic; a span tree deeper
/// than [`MAX_RECOMMENDED_DEPTH`] adds a warning; and an error with text that no
/// rule recognises yields a single "Unknown Error".
///
/// # Example
///
/// ```
/// use shared::assembler::assemble_trace;
/// use shared::diagnostics::analyze_trace;
/// use shared::models::RawEntry;
///
/// let entry = RawEntry::new("req-1", "POST", "/mcp", 429)
///     .with_response_body(r#"{"error":"Too Many Requests"}"#);
/// let diagnostics = analyze_trace(&assemble_trace(&entry));
///
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].title, "Rate Limit Exceeded");
/// ```
#[must_use]
pub fn analyze_trace(trace: &Trace) -> Vec<Diagnostic> {
    if trace.status.is_success() && trace.root_span.status.is_success() {
        return Vec::new();
    }

    let error_text = resolve_error_text(trace);
    let haystack = error_text.to_lowercase();

    let mut diagnostics: Vec<Diagnostic> = RULES
        .iter()
        .filter(|rule| rule.matches(&haystack))
        .map(Rule::diagnostic)
        .collect();

    if diagnostics.is_empty() && trace.is_error() && !error_text.is_empty() {
        diagnostics.push(
            Diagnostic::new(DiagnosticType::Error, "Unknown Error", error_text)
                .with_suggestion("Check the gateway and upstream service logs for more details."),
        );
    }

    let depth = max_depth(&trace.root_span);
    if depth > MAX_RECOMMENDED_DEPTH {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticType::Warning,
                "High Recursion Depth",
                format!(
                    "The execution tree is {depth} levels deep, above the recommended {MAX_RECOMMENDED_DEPTH}."
                ),
            )
            .with_suggestion("Look for tools or agents that call each other recursively."),
        );
    }

    tracing::debug!(
        trace_id = %trace.id,
        count = diagnostics.len(),
        depth,
        "Trace analyzed"
    );

    diagnostics
}

/// Resolves the text used for pattern matching.
///
/// Uses the root span's error message, else a string `error` or `message`
/// field of its output, else the empty string.
#[must_use]
pub fn resolve_error_text(trace: &Trace) -> String {
    let root = &trace.root_span;
    if let Some(message) = root.error_message.as_deref().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    root.output
        .as_ref()
        .and_then(|output| {
            output
                .get("error")
                .and_then(Value::as_str)
                .or_else(|| output.get("message").and_then(Value::as_str))
        })
        .unwrap_or_default()
        .to_string()
}

/// Returns the depth of the span tree; a lone root has depth 1.
#[must_use]
pub fn max_depth(root: &Span) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(root, 1)];
    while let Some((span, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(span.children.iter().map(|child| (child, depth + 1)));
    }
    deepest
}
