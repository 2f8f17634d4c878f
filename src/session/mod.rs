//! Per-file synchronization sessions.
//!
//! A [`FileSession`] owns everything the client knows about one shared file:
//! the committed document (the last state client and hub agree on), the local
//! and remote operation buffers, and the outstanding-message slot. The
//! reconciliation state machine lives here.
//!
//! # State Machine
//!
//! The outstanding slot is a tagged state rather than a pair of sentinel
//! fields:
//!
//! ```text
//!                 send ok                    uid echoed, not committed
//!   Idle ────────────────────► AwaitingAck ────────────────────► Rejected
//!    ▲                             │                                │
//!    │                             │ uid echoed + OP_COMMITTED      │ tick folds op
//!    │        tick applies op      ▼                                │ back into the
//!    └───────────────────────  Confirmed                            │ local buffer
//!    ▲                                                              │
//!    └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `AwaitingAck` enforces the engine's single concurrency discipline: **at most
//! one outstanding message per session**. The reconciliation tick is a no-op
//! while a message is in flight, and any further send attempt is rejected, not
//! queued.
//!
//! # Ordering
//!
//! The hub is the single source of truth for operation order. A session never
//! folds an operation into its committed document except by consuming a
//! status-bearing hub frame; purely local edits live in the local buffer (and
//! the display snapshot) until confirmed.

use crate::algebra::OtAlgebra;
use crate::client::transport::Transport;
use crate::error::{Result, SyncError};
use crate::protocol::{FileUpdate, UpdateStatus};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The outstanding-message slot of a [`FileSession`].
#[derive(Debug)]
pub enum Outstanding<Op> {
    /// No message in flight.
    Idle,
    /// One message awaiting its hub acknowledgment. `op` is `None` for the
    /// initial catch-up fetch, which carries no operation.
    AwaitingAck {
        /// Uid of the in-flight message.
        uid: String,
        /// The operation the message carried, if any.
        op: Option<Op>,
    },
    /// The hub answered but did not commit the operation (or the send itself
    /// failed). The next tick folds the operation back into the local buffer.
    Rejected {
        /// The unconfirmed operation.
        op: Op,
    },
    /// The hub confirmed the operation landed. The next tick folds it into the
    /// committed document.
    Confirmed {
        /// The confirmed operation.
        op: Op,
    },
}

impl<Op> Outstanding<Op> {
    /// Whether a message is currently awaiting acknowledgment.
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Outstanding::AwaitingAck { .. })
    }
}

/// Synchronization state for one shared file.
///
/// Sessions are driven from a single task: local edits arrive through
/// [`enqueue_local_edit`](Self::enqueue_local_edit), hub frames through
/// [`receive_message`](Self::receive_message), and the periodic
/// [`reconcile`](Self::reconcile) tick merges the two sides and talks to the
/// hub. Display snapshots are pushed on the session's snapshot channel.
pub struct FileSession<A: OtAlgebra> {
    file: String,
    algebra: Arc<A>,
    committed_doc: A::Doc,
    committed_index: i64,
    outstanding: Outstanding<A::Op>,
    local_buffer: Option<A::Op>,
    remote_buffer: Option<A::Op>,
    remote_index: i64,
    snapshots: mpsc::UnboundedSender<A::Doc>,
}

impl<A: OtAlgebra> FileSession<A> {
    /// Create a session for `file` starting from the document `base`.
    ///
    /// `committed_index` starts at -1: no operations have been folded in yet.
    /// Display snapshots are delivered on `snapshots`.
    pub fn new(
        file: impl Into<String>,
        base: A::Doc,
        algebra: Arc<A>,
        snapshots: mpsc::UnboundedSender<A::Doc>,
    ) -> Self {
        FileSession {
            file: file.into(),
            algebra,
            committed_doc: base,
            committed_index: -1,
            outstanding: Outstanding::Idle,
            local_buffer: None,
            remote_buffer: None,
            remote_index: -1,
            snapshots,
        }
    }

    /// The file this session synchronizes.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The committed-operation count folded into the committed document.
    pub fn committed_index(&self) -> i64 {
        self.committed_index
    }

    /// The highest operation index received from the hub, committed or
    /// buffered.
    pub fn remote_index(&self) -> i64 {
        self.remote_index
    }

    /// The last document state client and hub agree on.
    pub fn committed_doc(&self) -> &A::Doc {
        &self.committed_doc
    }

    /// Whether a message is currently awaiting acknowledgment.
    pub fn is_awaiting_ack(&self) -> bool {
        self.outstanding.is_awaiting()
    }

    /// Queue a local edit. `None` (a no-op edit) is ignored.
    ///
    /// The edit is composed onto the local buffer and the display snapshot is
    /// refreshed immediately — local echo never waits for the network.
    pub fn enqueue_local_edit(&mut self, op: Option<A::Op>) {
        let Some(op) = op else { return };
        self.local_buffer = Some(match self.local_buffer.take() {
            Some(buffered) => self.algebra.compose(buffered, op),
            None => op,
        });
        if let Some(local) = &self.local_buffer {
            let display = self.algebra.apply(local, &self.committed_doc);
            self.emit_snapshot(display);
        }
    }

    /// Ask the hub for everything committed past our index: an empty batch at
    /// `committed_index`. Called on session creation and on transport open.
    pub fn fetch_remote_commits(&mut self, transport: &mut dyn Transport) {
        let frame = FileUpdate::catch_up_request(&self.file, self.committed_index);
        if let Err(e) = self.send_message(transport, frame, None) {
            tracing::error!(file = %self.file, error = %e, "catch-up fetch not sent");
        }
    }

    /// One reconciliation step. No-op while a message is outstanding.
    ///
    /// In order: fold an unconfirmed outstanding op back into the local
    /// buffer; rebase the local buffer over buffered remote operations; fold a
    /// confirmed outstanding op and then the remote buffer into the committed
    /// document; finally send the local buffer (becoming the new outstanding
    /// message) and refresh the display snapshot.
    pub fn reconcile(&mut self, transport: &mut dyn Transport) {
        if self.outstanding.is_awaiting() {
            return;
        }
        tracing::trace!(file = %self.file, "reconciliation step");

        let mut committed_changed = false;

        // An op the hub answered without committing becomes local state again.
        match std::mem::replace(&mut self.outstanding, Outstanding::Idle) {
            Outstanding::Rejected { op } => {
                self.local_buffer = Some(match self.local_buffer.take() {
                    Some(buffered) => self.algebra.compose(op, buffered),
                    None => op,
                });
            }
            other => self.outstanding = other,
        }

        // The local edit is transformed to apply after the remote edit lands;
        // it may be subsumed entirely.
        if let Some(remote) = &self.remote_buffer {
            if let Some(local) = self.local_buffer.take() {
                self.local_buffer = self.algebra.rebase(local, remote);
            }
        }

        if let Outstanding::Confirmed { op } =
            std::mem::replace(&mut self.outstanding, Outstanding::Idle)
        {
            tracing::debug!(
                file = %self.file,
                from = self.committed_index + 1,
                to = self.remote_index,
                "commit self op"
            );
            self.committed_doc = self.algebra.apply(&op, &self.committed_doc);
            self.committed_index = self.remote_index;
            committed_changed = true;
        }

        if let Some(remote) = self.remote_buffer.take() {
            tracing::debug!(
                file = %self.file,
                from = self.committed_index + 1,
                to = self.remote_index,
                "commit remote op"
            );
            self.committed_doc = self.algebra.apply(&remote, &self.committed_doc);
            self.committed_index = self.remote_index;
            committed_changed = true;
        }

        if let Some(local) = self.local_buffer.take() {
            let display = self.algebra.apply(&local, &self.committed_doc);
            let frame = FileUpdate::commit_request(
                &self.file,
                self.committed_index + 1,
                self.algebra.serialize(&local),
            );
            tracing::debug!(file = %self.file, index = frame.index, "send local op");
            if let Err(e) = self.send_message(transport, frame, Some(local)) {
                tracing::error!(file = %self.file, error = %e, "local op not sent, kept buffered");
            }
            self.emit_snapshot(display);
        } else if committed_changed {
            self.emit_snapshot(self.committed_doc.clone());
        }
    }

    /// Handle a hub frame addressed to this session.
    ///
    /// Protocol violations are reported through the returned error; the
    /// session keeps its current state and continues.
    pub fn receive_message(&mut self, message: &FileUpdate) -> Result<()> {
        if message.file != self.file {
            return Err(SyncError::FileMismatch {
                got: message.file.clone(),
                expected: self.file.clone(),
            });
        }

        // A frame echoing our outstanding uid is the response to our own
        // request; clear the slot. Whether the op actually committed is
        // decided by the status below.
        let resp = matches!(
            &self.outstanding,
            Outstanding::AwaitingAck { uid, .. } if *uid == message.uid
        );
        if resp {
            tracing::debug!(file = %self.file, uid = %message.uid, "outstanding message cleared");
            self.outstanding = match std::mem::replace(&mut self.outstanding, Outstanding::Idle) {
                Outstanding::AwaitingAck { op: Some(op), .. } => Outstanding::Rejected { op },
                _ => Outstanding::Idle,
            };
        }

        if message.index - self.remote_index > 1 {
            // Reported but not auto-recovered: the hub never skips indices on
            // the happy path, so a gap means this session lost a frame.
            tracing::error!(
                file = %self.file,
                remote = message.index,
                local = self.remote_index,
                "index mismatch"
            );
        }

        let status = message
            .parsed_status()
            .unwrap_or(UpdateStatus::Unknown(String::new()));
        match status {
            UpdateStatus::Committed => {
                if message.index - self.remote_index != 1 {
                    return Err(SyncError::IndexMismatch {
                        remote: message.index,
                        local: self.remote_index,
                    });
                }
                if resp {
                    self.handle_self_commits(message)
                } else {
                    self.handle_remote_commits(message)
                }
            }
            UpdateStatus::TooOld => self.handle_remote_commits(message),
            other => Err(SyncError::UnknownStatus(other.as_str().to_string())),
        }
    }

    /// Fold a batch of other clients' operations into the remote buffer.
    fn handle_remote_commits(&mut self, message: &FileUpdate) -> Result<()> {
        tracing::debug!(
            file = %self.file,
            count = message.operations.len(),
            "received remote ops"
        );
        if let Some(remote_op) = self.merge_remote_operations(message.index, &message.operations)? {
            self.remote_buffer = Some(match self.remote_buffer.take() {
                Some(buffered) => self.algebra.compose(buffered, remote_op),
                None => remote_op,
            });
        }
        self.advance_remote_index(message);
        Ok(())
    }

    /// The hub confirmed our own batch landed at a known index.
    fn handle_self_commits(&mut self, message: &FileUpdate) -> Result<()> {
        tracing::debug!(
            file = %self.file,
            count = message.operations.len(),
            "own op confirmed"
        );
        match std::mem::replace(&mut self.outstanding, Outstanding::Idle) {
            Outstanding::Rejected { op } => {
                self.outstanding = Outstanding::Confirmed { op };
            }
            other => {
                // A confirmed catch-up fetch carries no op; only the index
                // advances.
                self.outstanding = other;
            }
        }
        self.advance_remote_index(message);
        Ok(())
    }

    /// The subset of `operations` not already reflected locally, composed into
    /// one operation. `None` when the batch brings nothing new or does not
    /// apply at our index.
    fn merge_remote_operations(
        &self,
        remote_index: i64,
        operations: &[String],
    ) -> Result<Option<A::Op>> {
        // The batch spans [remote_index, remote_index + len); we already hold
        // everything up to self.remote_index.
        let skip = self.remote_index - remote_index + 1;
        if skip < 0 {
            return Ok(None);
        }
        let mut op: Option<A::Op> = None;
        for raw in operations.iter().skip(skip as usize) {
            let next = self.algebra.deserialize(raw)?;
            op = Some(match op {
                Some(acc) => self.algebra.compose(acc, next),
                None => next,
            });
        }
        Ok(op)
    }

    fn advance_remote_index(&mut self, message: &FileUpdate) {
        self.remote_index = message.index + message.operations.len() as i64 - 1;
    }

    /// Send a frame, enforcing the single-outstanding-message rule and the
    /// transport readiness check. On failure an operation-bearing frame is
    /// parked in `Rejected` so the next tick refolds it — nothing is lost.
    fn send_message(
        &mut self,
        transport: &mut dyn Transport,
        frame: FileUpdate,
        op: Option<A::Op>,
    ) -> Result<()> {
        if let Outstanding::AwaitingAck { uid, .. } = &self.outstanding {
            return Err(SyncError::OutstandingMessage(uid.clone()));
        }
        if !transport.is_open() {
            if let Some(op) = op {
                self.outstanding = Outstanding::Rejected { op };
            }
            return Err(SyncError::NotConnected);
        }
        let uid = frame.uid.clone();
        match transport.send(frame) {
            Ok(()) => {
                self.outstanding = Outstanding::AwaitingAck { uid, op };
                Ok(())
            }
            Err(e) => {
                if let Some(op) = op {
                    self.outstanding = Outstanding::Rejected { op };
                }
                Err(e)
            }
        }
    }

    fn emit_snapshot(&self, doc: A::Doc) {
        if self.snapshots.send(doc).is_err() {
            tracing::debug!(file = %self.file, "snapshot receiver dropped");
        }
    }
}
