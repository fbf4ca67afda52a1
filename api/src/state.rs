//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::upstream::{EntrySource, InMemoryEntrySource};
use shared::assembler::TraceAssembler;
use shared::live::{InspectorFeedHandle, LogFeedHandle};
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Holds the entry source, the trace assembler and handles to the live feeds.
/// Feeds are optional: without a push endpoint the live routes answer 503.
#[derive(Clone)]
pub struct AppState {
    entries: Arc<dyn EntrySource>,
    assembler: Arc<TraceAssembler>,
    logs: Option<LogFeedHandle>,
    inspector: Option<InspectorFeedHandle>,
}

impl AppState {
    /// Creates a new application state without live feeds.
    pub fn new(entries: Arc<dyn EntrySource>, assembler: TraceAssembler) -> Self {
        Self {
            entries,
            assembler: Arc::new(assembler),
            logs: None,
            inspector: None,
        }
    }

    /// Creates a new application state backed by an empty in-memory source.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_source() -> Self {
        Self::new(
            Arc::new(InMemoryEntrySource::default()),
            TraceAssembler::default(),
        )
    }

    /// Attaches the live log feed.
    #[must_use]
    pub fn with_log_feed(mut self, handle: LogFeedHandle) -> Self {
        self.logs = Some(handle);
        self
    }

    /// Attaches the inspector feed.
    #[must_use]
    pub fn with_inspector_feed(mut self, handle: InspectorFeedHandle) -> Self {
        self.inspector = Some(handle);
        self
    }

    /// Returns the entry source.
    #[must_use]
    pub fn entries(&self) -> &dyn EntrySource {
        self.entries.as_ref()
    }

    /// Returns the trace assembler.
    #[must_use]
    pub fn assembler(&self) -> &TraceAssembler {
        &self.assembler
    }

    /// Returns the live log feed, if configured.
    #[must_use]
    pub fn logs(&self) -> Option<&LogFeedHandle> {
        self.logs.as_ref()
    }

    /// Returns the inspector feed, if configured.
    #[must_use]
    pub fn inspector(&self) -> Option<&InspectorFeedHandle> {
        self.inspector.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_source()
    }
}
