//! Live event feeds.
//!
//! A feed owns one push connection and one buffer. It runs as a tokio task
//! that multiplexes inbound frames, control commands and a periodic flush,
//! and publishes immutable snapshots to any number of readers.
//!
//! - [`buffer`] - flush-batched log buffer with pause, visibility and filters
//! - [`inspector`] - JSON-RPC call-protocol buffer and synthetic traffic
//! - [`connection`] - reconnecting connection state machine
//! - [`source`] - push transports
//! - [`log_feed`] / [`inspector_feed`] - the feed tasks and their handles

pub mod buffer;
pub mod connection;
pub mod inspector;
pub mod inspector_feed;
pub mod log_feed;
pub mod source;

pub use buffer::{search, IngestOutcome, LogBuffer, SourceFilter, LOG_BUFFER_CAPACITY};
pub use connection::{Connection, ConnectionEvent, ConnectionState, RECONNECT_DELAY};
pub use inspector::{
    InspectorBuffer, MessageKind, ProtocolMessage, SyntheticTraffic, INSPECTOR_CAPACITY,
};
pub use inspector_feed::{InspectorFeed, InspectorFeedHandle, InspectorStatus};
pub use log_feed::{FeedStatus, LogFeed, LogFeedHandle};
pub use source::{ChannelSource, PushSource, PushStream, WebSocketSource};

use std::time::Duration;
use thiserror::Error;

/// Interval between log buffer flushes.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Interval between synthetic inspector messages.
pub const SYNTHETIC_INTERVAL: Duration = Duration::from_secs(1);

/// Errors raised by push sources and feed handles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The push endpoint could not be reached.
    #[error("Failed to connect to {url}: {message}")]
    Connect {
        /// Endpoint address.
        url: String,
        /// Transport error text.
        message: String,
    },

    /// The connection failed after it was established.
    #[error("Push stream error: {0}")]
    Stream(String),

    /// The feed task has stopped and no longer accepts commands.
    #[error("Feed task is no longer running")]
    Stopped,
}

/// Timing parameters shared by both feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Maximum records retained.
    pub capacity: usize,
    /// Log buffer flush period.
    pub flush_interval: Duration,
    /// Delay before reconnecting after a close.
    pub reconnect_delay: Duration,
    /// Synthetic inspector traffic period.
    pub synthetic_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: LOG_BUFFER_CAPACITY,
            flush_interval: FLUSH_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            synthetic_interval: SYNTHETIC_INTERVAL,
        }
    }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
struct TaskGuard(Option<tokio::task::JoinHandle<()>>);

impl TaskGuard {
    fn new(handle: tokio::task::JoinHandle<()>) -> Self {
        Self(Some(handle))
    }

    /// Waits for the task to exit on its own.
    async fn join(mut self) {
        if let Some(handle) = self.0.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Feed task ended abnormally");
            }
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}
