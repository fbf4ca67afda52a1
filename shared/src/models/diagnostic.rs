//! Diagnostic data model.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticType {
    /// The failure itself.
    Error,
    /// A likely contributing problem.
    Warning,
    /// Informational hint.
    Info,
}

impl std::fmt::Display for DiagnosticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A human-actionable finding about a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    #[serde(rename = "type")]
    pub kind: DiagnosticType,

    /// Short title, e.g. "Rate Limit Exceeded".
    pub title: String,

    /// Explanation of what was detected.
    pub message: String,

    /// What the operator can do about it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic without a suggestion.
    #[must_use]
    pub fn new(kind: DiagnosticType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Attaches a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns true for error-type diagnostics.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticType::Error
    }
}
