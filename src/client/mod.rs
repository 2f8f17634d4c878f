//! The client engine: session registry, ticker, and caller-facing API.
//!
//! This module wires the per-file [`FileSession`](crate::session::FileSession)
//! state machines to one hub connection and one reconciliation ticker, and
//! exposes the surface callers use:
//!
//! ```text
//! client/
//! ├── engine       - SyncClient and the engine actor (registry + ticker)
//! ├── handle       - FileHandle for submitting edits
//! ├── subscription - Snapshot stream delivered to callers
//! ├── transport    - Transport contract and in-memory implementation
//! └── config       - Client configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SyncClient`] | Handle to the engine actor for one hub connection |
//! | [`ClientConfig`] | Hub name and reconciliation interval |
//! | [`FileHandle`] | Edit handle for one subscribed file |
//! | [`Subscription`] | Stream of display snapshots |
//! | [`Transport`] | Outbound half of the hub connection |
//! | [`TransportEvent`] | Inbound connection events |
//!
//! # Examples
//!
//! ```ignore
//! use collab_sync::algebra::SpliceAlgebra;
//! use collab_sync::client::{ClientConfig, SyncClient};
//! use collab_sync::diff;
//! use collab_sync::types::Notebook;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = SyncClient::connect(
//!     ClientConfig::new("design-team").tick_interval(Duration::from_millis(500)),
//!     Arc::new(SpliceAlgebra),
//!     transport,
//!     events,
//! )?;
//!
//! let (handle, mut snapshots) = client
//!     .subscribe("notes/shared.ipynb", Notebook::with_cells(5))
//!     .await?;
//!
//! // One keystroke in cell 0: diff it and submit.
//! handle.submit_edit(diff::cell_edit(&SpliceAlgebra, 0, "helo", "hello", 4, 4))?;
//!
//! while let Some(doc) = snapshots.next().await {
//!     render(&doc);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod handle;
pub mod subscription;
pub mod transport;

pub use config::ClientConfig;
pub use engine::SyncClient;
pub use handle::FileHandle;
pub use subscription::Subscription;
pub use transport::{ChannelTransport, Transport, TransportEvent};
