//! The call-protocol inspector feed.
//!
//! Same task shape as [`super::log_feed`]. Accepted messages land in the buffer
//! right away and the snapshot is republished at most once per flush tick. While
//! synthetic traffic is on, the live connection is suspended and a generator emits
//! one message per tick.

use super::connection::{Connection, ConnectionEvent, ConnectionState};
use super::inspector::{InspectorBuffer, ProtocolMessage, SyntheticTraffic};
use super::source::PushSource;
use super::{FeedConfig, FeedError, TaskGuard};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Observable state of the inspector feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectorStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Whether synthetic traffic replaces the live connection.
    pub synthetic: bool,
    /// Number of retained messages.
    pub messages: usize,
}

#[derive(Debug)]
enum Command {
    StartSynthetic,
    StopSynthetic,
    Clear,
    Shutdown,
}

type Snapshot = Arc<Vec<Arc<ProtocolMessage>>>;

/// Cloneable control and read handle for a running [`InspectorFeed`].
#[derive(Debug, Clone)]
pub struct InspectorFeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Snapshot>,
    status: watch::Receiver<InspectorStatus>,
}

impl InspectorFeedHandle {
    fn send(&self, command: Command) -> Result<(), FeedError> {
        self.commands.send(command).map_err(|_| FeedError::Stopped)
    }

    /// Suspends the live connection and starts generating synthetic traffic.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn start_synthetic(&self) -> Result<(), FeedError> {
        self.send(Command::StartSynthetic)
    }

    /// Stops synthetic traffic and reconnects the live source.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn stop_synthetic(&self) -> Result<(), FeedError> {
        self.send(Command::StopSynthetic)
    }

    /// Discards all retained messages.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stopped`] if the feed has shut down.
    pub fn clear(&self) -> Result<(), FeedError> {
        self.send(Command::Clear)
    }

    /// Returns the retained messages, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Returns the current feed status.
    #[must_use]
    pub fn status(&self) -> InspectorStatus {
        self.status.borrow().clone()
    }
}

/// A running inspector feed. Dropping it aborts the task.
#[derive(Debug)]
pub struct InspectorFeed {
    handle: InspectorFeedHandle,
    task: TaskGuard,
}

impl InspectorFeed {
    /// Spawns the feed task on the current tokio runtime.
    #[must_use]
    pub fn spawn(source: Arc<dyn PushSource>, config: FeedConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let connection = Connection::new(source).with_reconnect_delay(config.reconnect_delay);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Vec::new()));
        let (status_tx, status_rx) = watch::channel(InspectorStatus {
            state: connection.state(),
            synthetic: false,
            messages: 0,
        });

        let task = FeedTask {
            buffer: InspectorBuffer::new(config.capacity),
            connection,
            synthetic: None,
            synthetic_interval: config.synthetic_interval,
            flush_interval: config.flush_interval,
            dirty: false,
            commands: commands_rx,
            snapshot: snapshot_tx,
            status: status_tx,
        };
        let join = tokio::spawn(task.run());

        Self {
            handle: InspectorFeedHandle {
                commands: commands_tx,
                snapshot: snapshot_rx,
                status: status_rx,
            },
            task: TaskGuard::new(join),
        }
    }

    /// Returns a handle for controlling and reading the feed.
    #[must_use]
    pub fn handle(&self) -> InspectorFeedHandle {
        self.handle.clone()
    }

    /// Closes the connection, stops any generator and waits for the task to exit.
    pub async fn teardown(self) {
        let _ = self.handle.send(Command::Shutdown);
        self.task.join().await;
    }
}

struct Synthetic {
    traffic: SyntheticTraffic,
    ticker: Interval,
}

async fn next_synthetic(synthetic: &mut Option<Synthetic>) -> crate::models::EventRecord {
    match synthetic {
        Some(synthetic) => {
            synthetic.ticker.tick().await;
            synthetic.traffic.next_record()
        }
        None => std::future::pending().await,
    }
}

struct FeedTask {
    buffer: InspectorBuffer,
    connection: Connection,
    synthetic: Option<Synthetic>,
    synthetic_interval: Duration,
    flush_interval: Duration,
    /// Buffer changed since the last published snapshot.
    dirty: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<Snapshot>,
    status: watch::Sender<InspectorStatus>,
}

impl FeedTask {
    async fn run(mut self) {
        let mut flush = tokio::time::interval(self.flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Inspector feed started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                _ = flush.tick() => {
                    if self.dirty {
                        self.publish();
                    }
                },
                record = next_synthetic(&mut self.synthetic) => {
                    self.dirty |= self.buffer.ingest(&record);
                },
                event = self.connection.next_event() => match event {
                    ConnectionEvent::Message(frame) => {
                        self.dirty |= self.buffer.ingest_frame(&frame);
                    }
                    ConnectionEvent::Opened | ConnectionEvent::Closed(_) => self.publish_status(),
                },
            }
        }

        self.synthetic = None;
        self.connection.close();
        if self.dirty {
            self.publish();
        }
        self.publish_status();
        tracing::info!("Inspector feed stopped");
    }

    fn apply(&mut self, command: Command) {
        tracing::debug!(?command, "Inspector feed command");
        match command {
            Command::StartSynthetic => {
                if self.synthetic.is_none() {
                    self.connection.suspend();
                    let period = self.synthetic_interval;
                    self.synthetic = Some(Synthetic {
                        traffic: SyntheticTraffic::new(),
                        ticker: tokio::time::interval_at(Instant::now() + period, period),
                    });
                }
            }
            Command::StopSynthetic => {
                if self.synthetic.take().is_some() {
                    self.connection.resume();
                }
            }
            Command::Clear => {
                self.buffer.clear();
                self.publish();
            }
            Command::Shutdown => {}
        }
        self.publish_status();
    }

    fn publish(&mut self) {
        self.dirty = false;
        self.snapshot.send_replace(Arc::new(self.buffer.snapshot()));
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status.send_replace(InspectorStatus {
            state: self.connection.state(),
            synthetic: self.synthetic.is_some(),
            messages: self.buffer.len(),
        });
    }
}
