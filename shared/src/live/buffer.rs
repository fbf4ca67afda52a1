//! Bounded, flush-batched log buffer.
//!
//! Inbound records are enriched and appended to a staging queue. A periodic
//! [`LogBuffer::flush`] merges staging into the committed list so that only the
//! newest `capacity` records survive. The committed list is rebuilt on every
//! flush and handed out as an immutable snapshot.

use crate::models::{EnrichedEvent, EventRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum number of committed records.
pub const LOG_BUFFER_CAPACITY: usize = 1000;

/// Metadata key consulted by [`SourceFilter`] when none is given.
pub const DEFAULT_FILTER_KEY: &str = "service";

/// Restricts the buffer to records from one source.
///
/// A record matches if its `source` equals `value`, or if its metadata field
/// `metadata_key` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    /// Source name to keep.
    pub value: String,
    /// Metadata field compared against `value`.
    #[serde(default = "default_filter_key")]
    pub metadata_key: String,
}

fn default_filter_key() -> String {
    DEFAULT_FILTER_KEY.to_string()
}

impl SourceFilter {
    /// Creates a filter on `value` using the default metadata key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            metadata_key: default_filter_key(),
        }
    }

    /// Sets the metadata key compared against the filter value.
    #[must_use]
    pub fn with_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = key.into();
        self
    }

    /// Returns true if the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        record.source.as_deref() == Some(self.value.as_str())
            || record.metadata_text(&self.metadata_key).as_deref() == Some(self.value.as_str())
    }
}

/// What happened to an inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Enriched and staged for the next flush.
    Staged,
    /// Dropped because the consumer is paused or not visible.
    Suppressed,
    /// Dropped by the source filter.
    Filtered,
}

/// The generic live log buffer.
///
/// # Example
///
/// ```
/// use shared::live::LogBuffer;
/// use shared::models::{EventRecord, LogLevel};
///
/// let mut buffer = LogBuffer::new(2);
/// for i in 0..3 {
///     buffer.ingest(EventRecord::new(LogLevel::Info, format!("line {i}")));
/// }
/// buffer.flush();
///
/// let messages: Vec<_> = buffer.committed().iter().map(|e| e.record.message.clone()).collect();
/// assert_eq!(messages, vec!["line 1", "line 2"]);
/// ```
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    committed: Arc<Vec<EnrichedEvent>>,
    staging: Vec<EnrichedEvent>,
    paused: bool,
    visible: bool,
    filter: Option<SourceFilter>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_CAPACITY)
    }
}

impl LogBuffer {
    /// Creates an empty, visible, unpaused buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            committed: Arc::new(Vec::new()),
            staging: Vec::new(),
            paused: false,
            visible: true,
            filter: None,
        }
    }

    /// Stages a record unless it is suppressed or filtered out.
    pub fn ingest(&mut self, record: EventRecord) -> IngestOutcome {
        if self.paused || !self.visible {
            return IngestOutcome::Suppressed;
        }
        if let Some(filter) = &self.filter {
            if !filter.matches(&record) {
                return IngestOutcome::Filtered;
            }
        }
        self.staging.push(EnrichedEvent::new(record));
        IngestOutcome::Staged
    }

    /// Decodes a push frame and stages it; non-JSON frames become opaque records.
    pub fn ingest_frame(&mut self, frame: &str) -> IngestOutcome {
        self.ingest(EventRecord::from_frame(frame))
    }

    /// Merges staged records into the committed list.
    ///
    /// Returns false if nothing was staged.
    pub fn flush(&mut self) -> bool {
        if self.staging.is_empty() {
            return false;
        }
        let staged = std::mem::take(&mut self.staging);
        let committed = self.committed.as_slice();

        let merged: Vec<EnrichedEvent> = if committed.len() + staged.len() <= self.capacity {
            committed.iter().cloned().chain(staged).collect()
        } else if staged.len() > self.capacity {
            let skip = staged.len() - self.capacity;
            staged.into_iter().skip(skip).collect()
        } else {
            let keep = self.capacity - staged.len();
            committed[committed.len() - keep..]
                .iter()
                .cloned()
                .chain(staged)
                .collect()
        };

        self.committed = Arc::new(merged);
        true
    }

    /// Returns the committed records, oldest first.
    #[must_use]
    pub fn committed(&self) -> Arc<Vec<EnrichedEvent>> {
        Arc::clone(&self.committed)
    }

    /// Returns the number of staged records awaiting a flush.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staging.len()
    }

    /// Stops accepting records. Records arriving while paused are lost.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes accepting records.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Records whether the hosting view is visible. Hidden views drop records.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns true while the hosting view is visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Installs or removes the source filter.
    pub fn set_filter(&mut self, filter: Option<SourceFilter>) {
        self.filter = filter;
    }

    /// Returns the active source filter.
    #[must_use]
    pub fn filter(&self) -> Option<&SourceFilter> {
        self.filter.as_ref()
    }

    /// Discards committed and staged records.
    pub fn clear(&mut self) {
        self.committed = Arc::new(Vec::new());
        self.staging.clear();
    }
}

/// Returns the records whose search text contains `needle`, case-insensitively.
///
/// Results keep committed order; with a `limit`, only the newest matches are kept.
#[must_use]
pub fn search(events: &[EnrichedEvent], needle: &str, limit: Option<usize>) -> Vec<EnrichedEvent> {
    let needle = needle.to_lowercase();
    let mut hits: Vec<EnrichedEvent> = events
        .iter()
        .rev()
        .filter(|event| event.search_text.contains(&needle))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    hits.reverse();
    hits
}
