//! The `FileUpdate` wire message.
//!
//! A `FileUpdate` is the single unit of exchange on the `FILE_UPDATE` endpoint.
//! Client→hub frames are either *commit requests* (one serialized operation,
//! `index = committed + 1`) or *catch-up requests* (empty operation list,
//! `index = committed`). Hub→client frames add a `status` describing the
//! outcome.
//!
//! # Examples
//!
//! ```
//! use collab_sync::protocol::{FileUpdate, UpdateStatus};
//!
//! let req = FileUpdate::catch_up_request("shared.ipynb", -1);
//! assert_eq!(req.index, -1);
//! assert!(req.operations.is_empty());
//! assert_eq!(req.parsed_status(), None);
//!
//! let json = req.to_json().unwrap();
//! let back = FileUpdate::from_json(&json).unwrap();
//! assert_eq!(back.file, "shared.ipynb");
//! ```

use crate::error::Result;
use crate::protocol::constants;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hub response status for a `FILE_UPDATE` frame, in parsed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The operation batch was committed in continuous sequence.
    Committed,
    /// The sender's claimed index was stale; the frame is a catch-up batch.
    TooOld,
    /// The sender's claimed index is ahead of the hub's log.
    TooNew,
    /// The hub failed to persist the batch.
    CommitError,
    /// A status string this client does not recognize.
    Unknown(String),
}

impl UpdateStatus {
    /// Parse a raw status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            constants::STATUS_OP_COMMITTED => UpdateStatus::Committed,
            constants::STATUS_OP_TOO_OLD => UpdateStatus::TooOld,
            constants::STATUS_OP_TOO_NEW => UpdateStatus::TooNew,
            constants::STATUS_OP_COMMIT_ERR => UpdateStatus::CommitError,
            other => UpdateStatus::Unknown(other.to_string()),
        }
    }

    /// The wire representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            UpdateStatus::Committed => constants::STATUS_OP_COMMITTED,
            UpdateStatus::TooOld => constants::STATUS_OP_TOO_OLD,
            UpdateStatus::TooNew => constants::STATUS_OP_TOO_NEW,
            UpdateStatus::CommitError => constants::STATUS_OP_COMMIT_ERR,
            UpdateStatus::Unknown(s) => s,
        }
    }
}

/// A `FILE_UPDATE` frame exchanged between a client and the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUpdate {
    /// Unique id for this frame. A hub response to a request echoes the
    /// request's uid, which is how a client recognizes its own round trip.
    pub uid: String,

    /// Endpoint discriminator; always `FILE_UPDATE` for this type.
    pub endpoint: String,

    /// The file this frame applies to.
    pub file: String,

    /// The committed-operation count the sender believes is true.
    pub index: i64,

    /// Serialized operations catching the receiver up to
    /// `index + operations.len()`.
    #[serde(default)]
    pub operations: Vec<String>,

    /// Outcome status; present only on hub→client frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl FileUpdate {
    /// Build a commit request carrying one serialized operation.
    ///
    /// `index` must be the sender's committed index plus one — the index the
    /// operation would land at if the sender is up to date.
    pub fn commit_request(file: impl Into<String>, index: i64, operation: String) -> Self {
        FileUpdate {
            uid: Uuid::new_v4().to_string(),
            endpoint: constants::ENDPOINT_FILE_UPDATE.to_string(),
            file: file.into(),
            index,
            operations: vec![operation],
            status: None,
        }
    }

    /// Build a catch-up request: an empty batch at the sender's committed
    /// index, prompting the hub to respond with everything the sender lacks.
    pub fn catch_up_request(file: impl Into<String>, index: i64) -> Self {
        FileUpdate {
            uid: Uuid::new_v4().to_string(),
            endpoint: constants::ENDPOINT_FILE_UPDATE.to_string(),
            file: file.into(),
            index,
            operations: Vec::new(),
            status: None,
        }
    }

    /// The frame's status in parsed form, or `None` for client→hub requests.
    pub fn parsed_status(&self) -> Option<UpdateStatus> {
        self.status.as_deref().map(UpdateStatus::parse)
    }

    /// Encode this frame as a JSON string for the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a frame from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_request_shape() {
        let req = FileUpdate::commit_request("a.ipynb", 3, "op".to_string());
        assert_eq!(req.endpoint, constants::ENDPOINT_FILE_UPDATE);
        assert_eq!(req.operations, vec!["op".to_string()]);
        assert!(req.status.is_none());
        assert!(!req.uid.is_empty());
    }

    #[test]
    fn test_uids_are_unique() {
        let a = FileUpdate::catch_up_request("a", -1);
        let b = FileUpdate::catch_up_request("a", -1);
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(UpdateStatus::parse("OP_COMMITTED"), UpdateStatus::Committed);
        assert_eq!(UpdateStatus::parse("OP_TOO_OLD"), UpdateStatus::TooOld);
        assert_eq!(
            UpdateStatus::parse("SOMETHING_ELSE"),
            UpdateStatus::Unknown("SOMETHING_ELSE".to_string())
        );
    }

    #[test]
    fn test_status_omitted_from_requests() {
        let req = FileUpdate::catch_up_request("a.ipynb", -1);
        let json = req.to_json().unwrap();
        assert!(!json.contains("status"));
    }

    #[test]
    fn test_missing_operations_field_defaults_empty() {
        let raw = r#"{"uid":"u","endpoint":"FILE_UPDATE","file":"f","index":0}"#;
        let frame = FileUpdate::from_json(raw).unwrap();
        assert!(frame.operations.is_empty());
    }
}
