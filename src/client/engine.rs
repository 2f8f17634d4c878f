//! The sync engine actor: session registry plus reconciliation ticker.
//!
//! One engine task runs per hub connection. It owns every
//! [`FileSession`] on that connection and processes caller commands, inbound
//! transport events, and ticker ticks as non-overlapping steps of a single
//! `select!` loop — no session state is ever touched from two places at once.
//! The one-outstanding-message rule inside each session is the only other
//! concurrency discipline the protocol needs.
//!
//! # Event Handling
//!
//! | Input | Effect |
//! |-------|--------|
//! | `Opened` | Every session issues a catch-up fetch; ticking resumes |
//! | `Closed` | Ticking suspends; sessions are retained for reconnect |
//! | `Message` | Routed to the owning session by file name |
//! | Tick | `reconcile()` on every session, only while open |
//! | `Subscribe` / `Edit` / `Unsubscribe` / `Close` | Caller commands |

use crate::algebra::OtAlgebra;
use crate::client::config::ClientConfig;
use crate::client::handle::FileHandle;
use crate::client::subscription::Subscription;
use crate::client::transport::{Transport, TransportEvent};
use crate::error::{Result, SyncError};
use crate::protocol::{constants, FileUpdate};
use crate::session::FileSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

/// Commands the engine actor accepts from [`SyncClient`] and [`FileHandle`].
pub(crate) enum Command<A: OtAlgebra> {
    Subscribe {
        file: String,
        base: A::Doc,
        reply: oneshot::Sender<Subscription<A::Doc>>,
    },
    Edit {
        file: String,
        op: Option<A::Op>,
    },
    Unsubscribe {
        file: String,
    },
    Close,
}

/// Handle to a running sync engine, one per hub connection.
///
/// Cheap to clone; all clones drive the same engine task. Dropping every
/// clone (and every [`FileHandle`]) shuts the engine down.
///
/// # Examples
///
/// ```ignore
/// let (transport, wire) = ChannelTransport::pair();
/// let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
///
/// let client = SyncClient::connect(
///     ClientConfig::new("design-team"),
///     Arc::new(SpliceAlgebra),
///     transport,
///     event_rx,
/// )?;
///
/// let (handle, mut snapshots) = client
///     .subscribe("shared.ipynb", Notebook::with_cells(5))
///     .await?;
/// handle.submit_edit(cell_edit(&SpliceAlgebra, 0, "", "hi", 2, 2))?;
/// ```
pub struct SyncClient<A: OtAlgebra> {
    commands: mpsc::UnboundedSender<Command<A>>,
}

impl<A: OtAlgebra> Clone for SyncClient<A> {
    fn clone(&self) -> Self {
        SyncClient {
            commands: self.commands.clone(),
        }
    }
}

impl<A: OtAlgebra> SyncClient<A> {
    /// Validate `config`, spawn the engine task, and return a handle to it.
    ///
    /// `transport` is the outbound half of the hub connection; `events` is the
    /// inbound half. Fails fast with [`SyncError::Misconfigured`] when hub or
    /// interval are unset.
    pub fn connect<T: Transport>(
        config: ClientConfig,
        algebra: Arc<A>,
        transport: T,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tracing::info!(hub = %config.hub, interval = ?config.tick_interval, "sync engine started");
        let engine = Engine {
            open: transport.is_open(),
            algebra,
            transport,
            sessions: HashMap::new(),
            commands: cmd_rx,
            events,
            config,
        };
        tokio::spawn(engine.run());
        Ok(SyncClient { commands: cmd_tx })
    }

    /// Subscribe to `file`, starting from the document `base`.
    ///
    /// Returns an edit handle and the snapshot stream. The session fetches
    /// remote commits immediately if the connection is already open, and again
    /// on every reconnect. Re-subscribing to an already-subscribed file
    /// replaces the previous session and closes its snapshot stream.
    pub async fn subscribe(
        &self,
        file: impl Into<String>,
        base: A::Doc,
    ) -> Result<(FileHandle<A>, Subscription<A::Doc>)> {
        let file = file.into();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Subscribe {
                file: file.clone(),
                base,
                reply: reply_tx,
            })
            .map_err(|_| SyncError::EngineClosed)?;
        let subscription = reply_rx.await.map_err(|_| SyncError::EngineClosed)?;
        Ok((
            FileHandle::new(file, self.commands.clone()),
            subscription,
        ))
    }

    /// Shut the engine down, dropping all sessions and their buffers.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

/// The engine task state. Owned entirely by one spawned task.
struct Engine<A: OtAlgebra, T: Transport> {
    config: ClientConfig,
    algebra: Arc<A>,
    transport: T,
    sessions: HashMap<String, FileSession<A>>,
    open: bool,
    commands: mpsc::UnboundedReceiver<Command<A>>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<A: OtAlgebra, T: Transport> Engine<A, T> {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events_done = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.open {
                        tracing::trace!(hub = %self.config.hub, "reconciliation interval");
                        for session in self.sessions.values_mut() {
                            session.reconcile(&mut self.transport);
                        }
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Subscribe { file, base, reply }) => {
                        self.handle_subscribe(file, base, reply);
                    }
                    Some(Command::Edit { file, op }) => match self.sessions.get_mut(&file) {
                        Some(session) => session.enqueue_local_edit(op),
                        None => tracing::warn!(file = %file, "edit for unsubscribed file dropped"),
                    },
                    Some(Command::Unsubscribe { file }) => {
                        tracing::debug!(file = %file, "unsubscribed");
                        self.sessions.remove(&file);
                    }
                    Some(Command::Close) | None => break,
                },
                event = self.events.recv(), if !events_done => match event {
                    Some(TransportEvent::Opened) => {
                        tracing::info!(hub = %self.config.hub, "transport connected");
                        self.open = true;
                        for session in self.sessions.values_mut() {
                            session.fetch_remote_commits(&mut self.transport);
                        }
                    }
                    Some(TransportEvent::Message(frame)) => self.route_frame(frame),
                    Some(TransportEvent::Closed) => {
                        tracing::info!(hub = %self.config.hub, "transport closed");
                        self.open = false;
                    }
                    None => {
                        tracing::debug!(hub = %self.config.hub, "transport event stream ended");
                        self.open = false;
                        events_done = true;
                    }
                },
            }
        }
        tracing::info!(hub = %self.config.hub, "sync engine stopped");
    }

    fn handle_subscribe(
        &mut self,
        file: String,
        base: A::Doc,
        reply: oneshot::Sender<Subscription<A::Doc>>,
    ) {
        if self.sessions.contains_key(&file) {
            tracing::warn!(file = %file, "re-subscribing replaces the existing session");
        }
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let mut session = FileSession::new(file.clone(), base, self.algebra.clone(), snapshot_tx);
        if self.open {
            session.fetch_remote_commits(&mut self.transport);
        }
        self.sessions.insert(file, session);
        let _ = reply.send(Subscription::new(snapshot_rx));
    }

    fn route_frame(&mut self, frame: FileUpdate) {
        if frame.endpoint != constants::ENDPOINT_FILE_UPDATE {
            tracing::debug!(endpoint = %frame.endpoint, "unsupported endpoint dropped");
            return;
        }
        match self.sessions.get_mut(&frame.file) {
            Some(session) => {
                if let Err(e) = session.receive_message(&frame) {
                    tracing::error!(file = %frame.file, error = %e, "message rejected");
                }
            }
            None => tracing::debug!(file = %frame.file, "frame for unsubscribed file dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::SpliceAlgebra;
    use crate::client::transport::ChannelTransport;
    use crate::types::Notebook;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_frame(wire: &mut mpsc::UnboundedReceiver<FileUpdate>) -> FileUpdate {
        timeout(Duration::from_secs(2), wire.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("wire closed")
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_hub() {
        let (transport, _wire) = ChannelTransport::pair();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let result = SyncClient::<SpliceAlgebra>::connect(
            ClientConfig::new(""),
            Arc::new(SpliceAlgebra),
            transport,
            event_rx,
        );
        assert!(matches!(result, Err(SyncError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn test_subscribe_fetches_when_open() {
        let (transport, mut wire) = ChannelTransport::pair();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let client = SyncClient::connect(
            ClientConfig::new("hub").tick_interval(Duration::from_millis(10)),
            Arc::new(SpliceAlgebra),
            transport,
            event_rx,
        )
        .unwrap();

        let (_handle, _snapshots) = client
            .subscribe("a.ipynb", Notebook::with_cells(1))
            .await
            .unwrap();

        let fetch = next_frame(&mut wire).await;
        assert_eq!(fetch.file, "a.ipynb");
        assert_eq!(fetch.index, -1);
        assert!(fetch.operations.is_empty());
    }

    #[tokio::test]
    async fn test_open_event_triggers_catch_up_fetch() {
        let (transport, mut wire) = ChannelTransport::pair();
        transport.set_open(false);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = SyncClient::connect(
            ClientConfig::new("hub").tick_interval(Duration::from_millis(10)),
            Arc::new(SpliceAlgebra),
            transport.clone(),
            event_rx,
        )
        .unwrap();

        let (_handle, _snapshots) = client
            .subscribe("a.ipynb", Notebook::with_cells(1))
            .await
            .unwrap();

        // Closed transport: no fetch yet.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(wire.try_recv().is_err());

        transport.set_open(true);
        event_tx.send(TransportEvent::Opened).unwrap();
        let fetch = next_frame(&mut wire).await;
        assert_eq!(fetch.index, -1);
    }

    #[tokio::test]
    async fn test_edit_for_unknown_file_is_dropped() {
        let (transport, mut wire) = ChannelTransport::pair();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let client = SyncClient::connect(
            ClientConfig::new("hub").tick_interval(Duration::from_millis(10)),
            Arc::new(SpliceAlgebra),
            transport,
            event_rx,
        )
        .unwrap();

        let (handle, _snapshots) = client
            .subscribe("a.ipynb", Notebook::with_cells(1))
            .await
            .unwrap();
        let _fetch = next_frame(&mut wire).await;

        // A handle whose file was unsubscribed: edits log and drop.
        handle.clone().unsubscribe().unwrap();
        handle
            .submit_edit(Some(SpliceAlgebra.splice(0, 0, 0, "x")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(wire.try_recv().is_err());
    }
}
