//! The transport contract.
//!
//! The engine talks to the hub over one duplex channel per connection. The
//! outbound half is the [`Transport`] trait — a readiness predicate plus a
//! non-blocking frame send. The inbound half is a stream of
//! [`TransportEvent`]s fed to the engine: open/close notifications and decoded
//! frames.
//!
//! Reconnection policy, socket libraries, and hub discovery all live outside
//! this crate; a websocket integration only has to pump frames between its
//! socket and these two halves. [`ChannelTransport`] is the in-memory
//! reference implementation, used by the test suite and by loopback setups.

use crate::error::{Result, SyncError};
use crate::protocol::FileUpdate;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of a duplex connection to the hub.
pub trait Transport: Send + 'static {
    /// Whether the connection is currently open. The engine checks this
    /// before every send.
    fn is_open(&self) -> bool;

    /// Hand a frame to the connection. Must not block: implementations queue
    /// the frame for an I/O task. Fails with [`SyncError::NotConnected`] when
    /// the connection is down.
    fn send(&mut self, frame: FileUpdate) -> Result<()>;
}

/// Inbound connection events delivered to the engine.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is (re)established. Sessions issue catch-up fetches and
    /// ticking resumes.
    Opened,
    /// A decoded frame from the hub.
    Message(FileUpdate),
    /// The connection dropped. Ticking suspends; sessions are retained.
    Closed,
}

/// In-memory [`Transport`] backed by an unbounded channel.
///
/// Frames sent through it appear on the paired receiver; an explicit open flag
/// models connection state. Cloning yields another handle to the same channel
/// and flag, so a test hub can flip connectivity out from under the engine.
///
/// # Examples
///
/// ```
/// use collab_sync::client::transport::{ChannelTransport, Transport};
/// use collab_sync::protocol::FileUpdate;
///
/// let (mut transport, mut wire) = ChannelTransport::pair();
/// transport.send(FileUpdate::catch_up_request("a.ipynb", -1)).unwrap();
/// assert_eq!(wire.try_recv().unwrap().file, "a.ipynb");
///
/// transport.set_open(false);
/// assert!(transport.send(FileUpdate::catch_up_request("a.ipynb", -1)).is_err());
/// ```
#[derive(Clone)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<FileUpdate>,
    open: Arc<RwLock<bool>>,
}

impl ChannelTransport {
    /// Create a connected transport and the receiver for its outbound frames.
    /// Starts open.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<FileUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                outbound: tx,
                open: Arc::new(RwLock::new(true)),
            },
            rx,
        )
    }

    /// Flip the connection state seen by `is_open` and `send`.
    pub fn set_open(&self, open: bool) {
        *self.open.write() = open;
    }
}

impl Transport for ChannelTransport {
    fn is_open(&self) -> bool {
        *self.open.read()
    }

    fn send(&mut self, frame: FileUpdate) -> Result<()> {
        if !self.is_open() {
            return Err(SyncError::NotConnected);
        }
        self.outbound
            .send(frame)
            .map_err(|_| SyncError::NotConnected)
    }
}
