//! Document snapshot subscriptions.
//!
//! Subscribing to a file yields a [`Subscription`]: a stream of display
//! snapshots. The engine pushes a snapshot whenever the caller-visible
//! document changes — on local echo, and whenever reconciliation advances the
//! committed document. Each snapshot is a complete document value; the latest
//! one is always the state to display.
//!
//! # Examples
//!
//! ```ignore
//! let (handle, mut snapshots) = client.subscribe("shared.ipynb", base).await?;
//!
//! while let Some(doc) = snapshots.next().await {
//!     render(&doc);
//! }
//! // None: the subscription ended (unsubscribed or engine closed).
//! ```

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A stream of display snapshots for one subscribed file.
///
/// Delivered asynchronously through [`next`](Self::next), or through the
/// [`Stream`] impl for use with `StreamExt` combinators. The stream ends when
/// the file is unsubscribed or the engine shuts down.
pub struct Subscription<D> {
    receiver: UnboundedReceiverStream<D>,
}

impl<D> Subscription<D> {
    /// Wrap a snapshot channel. Called by the engine on subscribe.
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<D>) -> Self {
        Subscription {
            receiver: UnboundedReceiverStream::new(receiver),
        }
    }

    /// Receive the next display snapshot.
    ///
    /// Returns `None` once the subscription is closed. Snapshots are complete
    /// document values; slow consumers may skip ahead by draining and keeping
    /// only the last.
    pub async fn next(&mut self) -> Option<D> {
        use futures::StreamExt;
        StreamExt::next(&mut self.receiver).await
    }
}

impl<D> Stream for Subscription<D> {
    type Item = D;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
