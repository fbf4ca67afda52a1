//! Push transports.
//!
//! A [`PushSource`] opens one connection per call and yields its text frames as
//! a stream. The stream ending, or yielding an error, means the connection closed.

use super::FeedError;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Frames delivered by one open connection.
pub type PushStream = BoxStream<'static, Result<String, FeedError>>;

/// Opens push connections.
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Connect`] if the endpoint cannot be reached.
    async fn connect(&self) -> Result<PushStream, FeedError>;
}

/// WebSocket push endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketSource {
    url: String,
}

impl WebSocketSource {
    /// Creates a source for a `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushSource for WebSocketSource {
    async fn connect(&self) -> Result<PushStream, FeedError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(url = %self.url, "Push connection established");

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(FeedError::Stream(e.to_string()))),
            }
        });
        Ok(frames.boxed())
    }
}

/// In-process push source.
///
/// Each [`ChannelSource::offer`] queues one connection; `connect` hands them out
/// in order and fails when none is queued. Dropping the returned sender closes
/// that connection.
#[derive(Debug, Default)]
pub struct ChannelSource {
    pending: Mutex<VecDeque<mpsc::UnboundedReceiver<String>>>,
    attempts: AtomicUsize,
}

impl ChannelSource {
    /// Creates a source with no queued connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a connection and returns the sender that feeds it.
    #[must_use]
    pub fn offer(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.pending.lock() {
            Ok(mut pending) => pending.push_back(rx),
            Err(poisoned) => poisoned.into_inner().push_back(rx),
        }
        tx
    }

    /// Returns how many times `connect` has been called.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSource for ChannelSource {
    async fn connect(&self) -> Result<PushStream, FeedError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self
            .pending
            .lock()
            .map_err(|_| FeedError::Stream("channel source lock poisoned".to_string()))?
            .pop_front();

        let Some(rx) = next else {
            return Err(FeedError::Connect {
                url: "channel".to_string(),
                message: "no connection offered".to_string(),
            });
        };

        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (Ok(frame), rx))
        });
        Ok(frames.boxed())
    }
}

/// Source whose handshake takes a fixed time and whose connection stays idle.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct SlowSource {
    handshake: std::time::Duration,
    attempts: AtomicUsize,
}

#[cfg(test)]
impl SlowSource {
    pub(crate) fn new(handshake: std::time::Duration) -> Self {
        Self {
            handshake,
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl PushSource for SlowSource {
    async fn connect(&self) -> Result<PushStream, FeedError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.handshake).await;
        Ok(stream::pending().boxed())
    }
}
