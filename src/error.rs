//! Error types and result handling.
//!
//! All fallible operations in this crate return [`Result`], an alias for
//! `std::result::Result<T, SyncError>`.
//!
//! # Error Philosophy
//!
//! Protocol violations (index gaps, unknown statuses, mismatched file names) are
//! *reported*, not fatal: the session that observes them logs the condition and
//! keeps its current state rather than aborting. The error values exist so that
//! embedders can observe these conditions and layer their own recovery (for
//! example, forcing a fresh catch-up fetch) on top of the engine.
//!
//! Only [`SyncError::Misconfigured`] indicates programmer error and should be
//! treated as fatal at startup.

use thiserror::Error;

/// Result type alias using [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors produced by the synchronization engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A send was attempted while another message was still awaiting its
    /// acknowledgment. At most one message may be outstanding per session.
    #[error("only one outstanding message can be sent at a time (in flight: {0})")]
    OutstandingMessage(String),

    /// A send was attempted while the transport was not open. The operation
    /// stays buffered and is retried on a later reconciliation tick.
    #[error("transport is not open")]
    NotConnected,

    /// A message arrived for a file this session is not subscribed to.
    #[error("received file name: {got} does not match the file: {expected}")]
    FileMismatch {
        /// File name carried by the message.
        got: String,
        /// File name this session is subscribed to.
        expected: String,
    },

    /// The message index is not continuous with the locally tracked remote
    /// index. Operations can only be committed in continuous sequence.
    #[error("index mismatch, remote index: {remote} local index: {local}")]
    IndexMismatch {
        /// Index claimed by the incoming message.
        remote: i64,
        /// Remote index currently tracked by the session.
        local: i64,
    },

    /// The relay returned a status this client does not understand.
    #[error("wrong file update return status: {0}")]
    UnknownStatus(String),

    /// A serialized operation in a message could not be decoded.
    #[error("failed to deserialize operation: {0}")]
    OpDeserialize(String),

    /// A wire frame could not be encoded or decoded as JSON.
    #[error("invalid wire frame: {0}")]
    WireFormat(#[from] serde_json::Error),

    /// The engine task has shut down and no longer accepts commands.
    #[error("sync engine is closed")]
    EngineClosed,

    /// The client was constructed with invalid configuration. This is a
    /// programming error and fails fast.
    #[error("client misconfigured: {0}")]
    Misconfigured(String),
}

impl SyncError {
    /// Whether this error is a protocol violation (reported, non-fatal) as
    /// opposed to a resource or configuration problem.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            SyncError::OutstandingMessage(_)
                | SyncError::FileMismatch { .. }
                | SyncError::IndexMismatch { .. }
                | SyncError::UnknownStatus(_)
                | SyncError::OpDeserialize(_)
        )
    }
}
