//! Live event records.
//!
//! Defines the push-delivered [`EventRecord`] and its ingestion-time enrichment,
//! [`EnrichedEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity level of an event.
///
/// Parsed leniently from the wire: case is ignored, common aliases are accepted
/// and anything unknown is treated as [`LogLevel::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    /// Debug and trace output.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
}

impl From<String> for LogLevel {
    fn from(level: String) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" | "fatal" | "critical" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One push-delivered log or event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Record identifier.
    pub id: String,

    /// ISO-8601 time the event occurred.
    pub timestamp: String,

    /// Severity.
    #[serde(default)]
    pub level: LogLevel,

    /// Message text.
    pub message: String,

    /// Component that emitted the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Structured attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl EventRecord {
    /// Creates a record with a fresh id and the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            level,
            message: message.into(),
            source: None,
            metadata: None,
        }
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a metadata attribute.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.metadata.get_or_insert_with(Map::new).insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }

    /// Decodes a push frame.
    ///
    /// A frame that is not a valid record is kept as an opaque `info` record whose
    /// message is the frame text.
    #[must_use]
    pub fn from_frame(frame: &str) -> Self {
        serde_json::from_str(frame).unwrap_or_else(|_| Self::new(LogLevel::Info, frame))
    }

    /// Returns the metadata value for `key` rendered as text.
    #[must_use]
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        match self.metadata.as_ref()?.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// An [`EventRecord`] with precomputed search and display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEvent {
    /// The original record.
    #[serde(flatten)]
    pub record: EventRecord,

    /// Lower-cased message and source, for substring search.
    pub search_text: String,

    /// Time of day for display (`HH:MM:SS` UTC), or the raw timestamp if unparseable.
    pub display_time: String,
}

impl EnrichedEvent {
    /// Enriches a record.
    #[must_use]
    pub fn new(record: EventRecord) -> Self {
        let search_text = match &record.source {
            Some(source) => format!("{} {source}", record.message),
            None => record.message.clone(),
        }
        .to_lowercase();

        let display_time = DateTime::parse_from_rfc3339(&record.timestamp).map_or_else(
            |_| record.timestamp.clone(),
            |t| t.with_timezone(&Utc).format("%H:%M:%S").to_string(),
        );

        Self {
            record,
            search_text,
            display_time,
        }
    }

    /// Returns true if the lower-cased search text contains `needle` (case-insensitive).
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.search_text.contains(&needle.to_lowercase())
    }
}

impl From<EventRecord> for EnrichedEvent {
    fn from(record: EventRecord) -> Self {
        Self::new(record)
    }
}
