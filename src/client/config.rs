//! Client configuration.

use crate::error::{Result, SyncError};
use std::time::Duration;

/// Configuration for a [`SyncClient`](crate::client::SyncClient).
///
/// The hub name and the reconciliation interval have no meaningful defaults;
/// both must be set before a client can be built. Construction fails fast on
/// an unconfigured client rather than silently doing nothing.
///
/// # Examples
///
/// ```
/// use collab_sync::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("design-team")
///     .tick_interval(Duration::from_millis(500));
/// assert!(config.validate().is_ok());
///
/// let config = ClientConfig::new("");
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name of the hub this connection belongs to.
    pub hub: String,

    /// How often the reconciliation ticker runs while the connection is open.
    pub tick_interval: Duration,
}

impl ClientConfig {
    /// Configuration for `hub` with the default 500ms tick interval.
    pub fn new(hub: impl Into<String>) -> Self {
        ClientConfig {
            hub: hub.into(),
            tick_interval: Duration::from_millis(500),
        }
    }

    /// Set the reconciliation tick interval.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Check that hub and interval are set. Called by
    /// [`SyncClient::connect`](crate::client::SyncClient::connect).
    pub fn validate(&self) -> Result<()> {
        if self.hub.is_empty() {
            return Err(SyncError::Misconfigured(
                "hub name must be set before subscribing to files".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(SyncError::Misconfigured(
                "tick interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
