#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Collab-Sync: client-side OT synchronization
//!
//! This crate implements the client half of a real-time co-editing protocol:
//! multiple clients edit a shared notebook of text cells through a relay hub,
//! reconciled with operational transformation instead of locking.
//!
//! ## Overview
//!
//! The engine is built from three pieces:
//!
//! 1. **Text diffing** - one textarea mutation becomes one minimal structured
//!    edit operation
//! 2. **Reconciliation** - a per-file state machine merges local edits with
//!    remote broadcasts while keeping a single consistent committed document
//! 3. **Protocol** - `FILE_UPDATE` frames carry operation batches to and from
//!    the hub, with a strict one-outstanding-message discipline per file
//!
//! The operation algebra itself is a seam: the engine consumes any
//! [`OtAlgebra`] implementation and ships a minimal cell-splice algebra for
//! tests and simple deployments.
//!
//! ## Data Flow
//!
//! ```text
//! keystroke ──► diff::cell_edit ──► FileHandle::submit_edit
//!                                         │
//!                                         ▼
//!                    ┌── engine actor (one per connection) ──┐
//!                    │  FileSession: local buffer, remote    │
//!                    │  buffer, committed doc, outstanding   │
//!                    │  slot; reconciled every tick          │
//!                    └──────┬──────────────────▲─────────────┘
//!                           │ send (≤1 open)   │ broadcast
//!                           ▼                  │
//!                         relay hub (source of truth for order)
//! ```
//!
//! ## Consistency Rules
//!
//! - The hub alone decides operation order; the committed document only
//!   advances by consuming status-bearing hub frames.
//! - At most one message is outstanding per file session at any time.
//! - Operation indices are continuous; a gap is reported, never papered over.
//! - Unconfirmed operations fold back into the local buffer — no edit is
//!   silently lost.
//!
//! ## Module Structure
//!
//! - **[types]** - Notebook and cell document values
//! - **[error]** - Error types and result handling
//! - **[protocol]** - Wire constants and the `FileUpdate` frame
//! - **[algebra]** - The `OtAlgebra` seam and the built-in splice algebra
//! - **[diff]** - Keystroke-level text diffing
//! - **[session]** - Per-file reconciliation state machine
//! - **[client]** - Engine actor, transport contract, caller API

pub mod algebra;
pub mod client;
pub mod diff;
pub mod error;
pub mod protocol;
pub mod session;
pub mod types;

pub use algebra::{OtAlgebra, SpliceAlgebra, SpliceOp};
pub use client::{ClientConfig, FileHandle, Subscription, SyncClient, Transport, TransportEvent};
pub use error::{Result, SyncError};
pub use protocol::{FileUpdate, UpdateStatus};
pub use session::FileSession;
pub use types::{Cell, Notebook};

#[cfg(test)]
mod tests;
