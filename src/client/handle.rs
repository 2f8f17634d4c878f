//! Per-file edit handles.

use crate::algebra::OtAlgebra;
use crate::client::engine::Command;
use crate::error::{Result, SyncError};
use tokio::sync::mpsc;

/// Handle for submitting edits to one subscribed file.
///
/// Obtained from [`SyncClient::subscribe`](crate::client::SyncClient::subscribe).
/// Cheap to clone; all clones address the same session.
pub struct FileHandle<A: OtAlgebra> {
    file: String,
    commands: mpsc::UnboundedSender<Command<A>>,
}

impl<A: OtAlgebra> Clone for FileHandle<A> {
    fn clone(&self) -> Self {
        FileHandle {
            file: self.file.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<A: OtAlgebra> FileHandle<A> {
    pub(crate) fn new(file: String, commands: mpsc::UnboundedSender<Command<A>>) -> Self {
        FileHandle { file, commands }
    }

    /// The file this handle edits.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Queue a local edit operation, typically produced by
    /// [`diff::cell_edit`](crate::diff::cell_edit). `None` (a no-op edit) is
    /// accepted and ignored, so callers can pass a diff result through
    /// unconditionally.
    ///
    /// The edit shows up in the snapshot stream immediately (local echo) and
    /// is sent to the hub on a following reconciliation tick.
    pub fn submit_edit(&self, op: Option<A::Op>) -> Result<()> {
        self.commands
            .send(Command::Edit {
                file: self.file.clone(),
                op,
            })
            .map_err(|_| SyncError::EngineClosed)
    }

    /// Stop synchronizing this file. The session is removed from the registry
    /// and its buffers are discarded; pending local edits are not flushed.
    pub fn unsubscribe(self) -> Result<()> {
        self.commands
            .send(Command::Unsubscribe { file: self.file })
            .map_err(|_| SyncError::EngineClosed)
    }
}
