//! Access to captured gateway traffic.
//!
//! The gateway exposes its recent request log at `GET /debug/entries`. The
//! console never fails because of it: transport errors, error statuses and
//! undecodable bodies are logged and read as an empty list.

use async_trait::async_trait;
use serde_json::Value;
use shared::models::RawEntry;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Path of the debug entries endpoint on the gateway.
pub const ENTRIES_PATH: &str = "/debug/entries";

/// Errors talking to the gateway debug API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("Upstream returned error status: {status}")]
    Status {
        /// Returned status.
        status: reqwest::StatusCode,
    },
}

/// A supplier of captured gateway entries.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Returns up to `limit` entries; an unreachable source yields an empty list.
    async fn fetch_entries(&self, limit: Option<usize>) -> Vec<RawEntry>;

    /// Returns the entry with the given id, if the source still holds it.
    async fn find_entry(&self, id: &str) -> Option<RawEntry> {
        self.fetch_entries(None)
            .await
            .into_iter()
            .find(|entry| entry.id == id)
    }
}

/// Reads entries from the gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEntrySource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpEntrySource {
    /// Creates a source for the gateway at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn entries_url(&self) -> String {
        format!("{}{ENTRIES_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Fetches entries, surfacing transport and status errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success, or the
    /// body is not a JSON array.
    pub async fn try_fetch(&self, limit: Option<usize>) -> Result<Vec<RawEntry>, UpstreamError> {
        let mut request = self.client.get(self.entries_url()).timeout(self.timeout);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status { status });
        }

        let items: Vec<Value> = response.json().await?;
        Ok(decode_entries(items))
    }
}

#[async_trait]
impl EntrySource for HttpEntrySource {
    async fn fetch_entries(&self, limit: Option<usize>) -> Vec<RawEntry> {
        match self.try_fetch(limit).await {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "Fetched upstream entries");
                entries
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.entries_url(), "Failed to fetch upstream entries");
                Vec::new()
            }
        }
    }
}

/// Decodes entries one by one, skipping malformed elements.
fn decode_entries(items: Vec<Value>) -> Vec<RawEntry> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawEntry>(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed upstream entry");
                None
            }
        })
        .collect()
}

/// An in-memory entry source.
///
/// This is useful for development and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntrySource {
    entries: Arc<RwLock<Vec<RawEntry>>>,
}

impl InMemoryEntrySource {
    /// Creates a source holding `entries`.
    #[must_use]
    pub fn new(entries: Vec<RawEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Appends an entry.
    pub fn push(&self, entry: RawEntry) {
        match self.entries.write() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[async_trait]
impl EntrySource for InMemoryEntrySource {
    async fn fetch_entries(&self, limit: Option<usize>) -> Vec<RawEntry> {
        let Ok(entries) = self.entries.read() else {
            tracing::warn!("In-memory entry source lock poisoned");
            return Vec::new();
        };
        // Newest entries are at the end, like the gateway's own history.
        let skip = limit.map_or(0, |limit| entries.len().saturating_sub(limit));
        entries.iter().skip(skip).cloned().collect()
    }
}
