//! Reconnecting push connection.
//!
//! ```text
//! Connecting --open--> Connected --close/error--> Disconnected
//!     ^                                               |
//!     +------------- after RECONNECT_DELAY -----------+
//!
//! any --suspend--> Suspended --resume--> Connecting
//! any --close----> Closed
//! ```

use super::source::{PushSource, PushStream};
use super::FeedError;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// A connection attempt is due or in flight.
    Connecting,
    /// Frames are flowing.
    Connected,
    /// Closed; a reconnect is scheduled.
    Disconnected,
    /// Closed on request until resumed.
    Suspended,
    /// Closed for good.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Suspended => write!(f, "suspended"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// What [`Connection::next_event`] observed.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection was established.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The connection closed or could not be opened; a reconnect is scheduled.
    Closed(Option<FeedError>),
}

type ConnectAttempt = BoxFuture<'static, Result<PushStream, FeedError>>;

enum Phase {
    /// Holds the in-flight attempt so a dropped poll resumes it.
    Connecting(Option<ConnectAttempt>),
    Connected(PushStream),
    Disconnected { retry_at: Instant },
    Suspended,
    Closed,
}

/// A push connection that reconnects forever.
///
/// [`Connection::next_event`] drives the state machine. It is cancel safe, so it
/// can be polled from a `tokio::select!` loop alongside other work.
pub struct Connection {
    source: Arc<dyn PushSource>,
    phase: Phase,
    reconnect_delay: Duration,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a connection that will connect on the first poll.
    #[must_use]
    pub fn new(source: Arc<dyn PushSource>) -> Self {
        Self {
            source,
            phase: Phase::Connecting(None),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Overrides the reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.phase {
            Phase::Connecting(_) => ConnectionState::Connecting,
            Phase::Connected(_) => ConnectionState::Connected,
            Phase::Disconnected { .. } => ConnectionState::Disconnected,
            Phase::Suspended => ConnectionState::Suspended,
            Phase::Closed => ConnectionState::Closed,
        }
    }

    /// Waits for the next connection event.
    ///
    /// Never resolves while suspended or closed.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            match &mut self.phase {
                Phase::Suspended | Phase::Closed => std::future::pending::<()>().await,
                Phase::Disconnected { retry_at } => {
                    let retry_at = *retry_at;
                    tokio::time::sleep_until(retry_at).await;
                    tracing::debug!("Reconnecting push source");
                    self.phase = Phase::Connecting(None);
                }
                Phase::Connecting(pending) => {
                    let attempt = pending.get_or_insert_with(|| {
                        let source = Arc::clone(&self.source);
                        Box::pin(async move { source.connect().await })
                    });
                    let result = attempt.await;
                    return match result {
                        Ok(stream) => {
                            self.phase = Phase::Connected(stream);
                            ConnectionEvent::Opened
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Push connection failed");
                            self.schedule_reconnect();
                            ConnectionEvent::Closed(Some(e))
                        }
                    };
                }
                Phase::Connected(stream) => {
                    let next = stream.next().await;
                    return match next {
                        Some(Ok(frame)) => ConnectionEvent::Message(frame),
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Push connection lost");
                            self.schedule_reconnect();
                            ConnectionEvent::Closed(Some(e))
                        }
                        None => {
                            tracing::info!("Push connection closed");
                            self.schedule_reconnect();
                            ConnectionEvent::Closed(None)
                        }
                    };
                }
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        self.phase = Phase::Disconnected {
            retry_at: Instant::now() + self.reconnect_delay,
        };
    }

    /// Closes any live connection until [`Connection::resume`] is called.
    pub fn suspend(&mut self) {
        if !matches!(self.phase, Phase::Closed) {
            self.phase = Phase::Suspended;
        }
    }

    /// Leaves the suspended state and connects on the next poll.
    pub fn resume(&mut self) {
        if matches!(self.phase, Phase::Suspended) {
            self.phase = Phase::Connecting(None);
        }
    }

    /// Closes the connection permanently.
    pub fn close(&mut self) {
        self.phase = Phase::Closed;
    }
}
