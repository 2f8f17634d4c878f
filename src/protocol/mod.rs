//! Wire protocol constants and message types.
//!
//! Clients and the relay hub exchange JSON frames over a single duplex channel.
//! Every frame carries an `endpoint` discriminator; this engine only speaks the
//! `FILE_UPDATE` endpoint, which moves batches of serialized operations between
//! a client and the hub.
//!
//! # Frame Shape
//!
//! ```json
//! {
//!   "uid": "550e8400-e29b-41d4-a716-446655440000",
//!   "endpoint": "FILE_UPDATE",
//!   "file": "notes/shared.ipynb",
//!   "index": 4,
//!   "operations": ["..."],
//!   "status": "OP_COMMITTED"
//! }
//! ```
//!
//! `index` is the committed-operation count the sender believes is true;
//! `operations` is the batch needed to catch the receiver up to
//! `index + operations.len()`. `status` appears only on hub→client frames.
//!
//! # Statuses
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `OP_COMMITTED` | The batch landed at the claimed index; broadcast to all clients |
//! | `OP_TOO_OLD` | The claimed index was stale; frame carries a catch-up batch |
//! | `OP_TOO_NEW` | The claimed index is ahead of the hub's log |
//! | `OP_COMMIT_ERR` | The hub failed to persist the batch |

pub mod message;

pub use message::{FileUpdate, UpdateStatus};

/// Protocol constants shared between client and hub.
pub mod constants {
    /// Endpoint discriminator for operation-batch frames.
    pub const ENDPOINT_FILE_UPDATE: &str = "FILE_UPDATE";

    /// The batch was committed at the claimed index.
    pub const STATUS_OP_COMMITTED: &str = "OP_COMMITTED";

    /// The claimed index was stale; the frame carries a catch-up batch.
    pub const STATUS_OP_TOO_OLD: &str = "OP_TOO_OLD";

    /// The claimed index is ahead of the hub's operation log.
    pub const STATUS_OP_TOO_NEW: &str = "OP_TOO_NEW";

    /// The hub failed to persist the batch.
    pub const STATUS_OP_COMMIT_ERR: &str = "OP_COMMIT_ERR";
}
