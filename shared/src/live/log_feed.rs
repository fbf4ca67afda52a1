//! The generic live log feed.
//!
//! [`LogFeed::spawn`] starts a task that owns a [`Connection`] and a
//! [`LogBuffer`]. Frames are staged as they arrive and committed on every flush
//! tick; each flush publishes a new snapshot through a `watch` channel.

use super::buffer::{LogBuffer, SourceFilter};
use super::connection::{Connection, ConnectionEvent, ConnectionState};
use super::source::PushSource;
use super::{FeedConfig, FeedError, TaskGuard};
use crate::models::EnrichedEvent;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Observable state of a log feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Whether ingestion is paused.
    pub paused: bool,
    /// Whether the consuming view is visible.
    pub visible: bool,
    /// Active source filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SourceFilter>,
    /// Number of committed records.
    pub committed: usize,
}

#[derive(Debug)]
enum Command {
    Pause,
    Resume,
    SetVisible(bool),
    SetFilter(Option<SourceFilter>),
    Clear,
    Shutdown,
}

/// Cloneable control and read handle for a running [`LogFeed`].
#[derive(Debug, Clone)]
pub struct LogFeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Arc<Vec<EnrichedEvent>>>,
    status: watch::Receiver<FeedStatus>,
}

impl LogFeedHandle {
    fn send(&self, command: Command) -> Result<(), FeedError> {
        self.commands.send(command).map_err(|_| FeedError::Stopped)
    }

    /// Stops ingesting. Records received while paused are lost.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn pause(&self) -> Result<(), FeedError> {
        self.send(Command::Pause)
    }

    /// Resumes ingesting.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn resume(&self) -> Result<(), FeedError> {
        self.send(Command::Resume)
    }

    /// Reports whether the consuming view is visible.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn set_visible(&self, visible: bool) -> Result<(), FeedError> {
        self.send(Command::SetVisible(visible))
    }

    /// Installs or removes the source filter.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn set_filter(&self, filter: Option<SourceFilter>) -> Result<(), FeedError> {
        self.send(Command::SetFilter(filter))
    }

    /// Discards all buffered records.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn clear(&self) -> Result<(), FeedError> {
        self.send(Command::Clear)
    }

    /// Returns the most recently committed records, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<EnrichedEvent>> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Returns the current feed status.
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<EnrichedEvent>>> {
        self.snapshot.clone()
    }
}

/// A running log feed. Dropping it aborts the task.
#[derive(Debug)]
pub struct LogFeed {
    handle: LogFeedHandle,
    task: TaskGuard,
}

impl LogFeed {
    /// Spawns the feed task on the current tokio runtime.
    #[must_use]
    pub fn spawn(source: Arc<dyn PushSource>, config: FeedConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let buffer = LogBuffer::new(config.capacity);
        let connection = Connection::new(source).with_reconnect_delay(config.reconnect_delay);
        let (snapshot_tx, snapshot_rx) = watch::channel(buffer.committed());
        let (status_tx, status_rx) = watch::channel(status_of(&buffer, &connection));

        let task = FeedTask {
            buffer,
            connection,
            commands: commands_rx,
            snapshot: snapshot_tx,
            status: status_tx,
        };
        let join = tokio::spawn(task.run(config));

        Self {
            handle: LogFeedHandle {
                commands: commands_tx,
                snapshot: snapshot_rx,
                status: status_rx,
            },
            task: TaskGuard::new(join),
        }
    }

    /// Returns a handle for controlling and reading the feed.
    #[must_use]
    pub fn handle(&self) -> LogFeedHandle {
        self.handle.clone()
    }

    /// Closes the connection, stops the flush timer and waits for the task to exit.
    pub async fn teardown(self) {
        let _ = self.handle.send(Command::Shutdown);
        self.task.join().await;
    }
}

fn status_of(buffer: &LogBuffer, connection: &Connection) -> FeedStatus {
    FeedStatus {
        state: connection.state(),
        paused: buffer.is_paused(),
        visible: buffer.is_visible(),
        filter: buffer.filter().cloned(),
        committed: buffer.committed().len(),
    }
}

struct FeedTask {
    buffer: LogBuffer,
    connection: Connection,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<Arc<Vec<EnrichedEvent>>>,
    status: watch::Sender<FeedStatus>,
}

impl FeedTask {
    async fn run(mut self, config: FeedConfig) {
        let mut flush = tokio::time::interval(config.flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Log feed started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                _ = flush.tick() => {
                    if self.buffer.flush() {
                        self.snapshot.send_replace(self.buffer.committed());
                        self.publish_status();
                    }
                },
                event = self.connection.next_event() => self.on_event(event),
            }
        }

        self.connection.close();
        self.publish_status();
        tracing::info!("Log feed stopped");
    }

    fn apply(&mut self, command: Command) {
        tracing::debug!(?command, "Log feed command");
        match command {
            Command::Pause => self.buffer.pause(),
            Command::Resume => self.buffer.resume(),
            Command::SetVisible(visible) => self.buffer.set_visible(visible),
            Command::SetFilter(filter) => self.buffer.set_filter(filter),
            Command::Clear => {
                self.buffer.clear();
                self.snapshot.send_replace(self.buffer.committed());
            }
            Command::Shutdown => {}
        }
        self.publish_status();
    }

    fn on_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Message(frame) => {
                let outcome = self.buffer.ingest_frame(&frame);
                tracing::trace!(?outcome, "Log frame received");
            }
            ConnectionEvent::Opened | ConnectionEvent::Closed(_) => self.publish_status(),
        }
    }

    fn publish_status(&self) {
        self.status
            .send_replace(status_of(&self.buffer, &self.connection));
    }
}
