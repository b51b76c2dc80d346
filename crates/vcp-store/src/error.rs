use std::path::PathBuf;

use vcp_types::ObjectId;

/// Errors from object store and repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Stored bytes do not hash to the id they are filed under.
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A record that is not `"<type> <len>\0<content>"`.
    #[error("malformed object record: {0}")]
    MalformedRecord(String),

    /// HEAD holds something other than a commit hash.
    #[error("invalid HEAD value {0:?}")]
    InvalidHead(String),

    /// No `.vcp/tracker.txt` under the given root.
    #[error("not a VCP project: {0}")]
    NotARepository(PathBuf),

    /// `init` on a directory that already has a tracker.
    #[error("project already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    /// An author or committer that would not fit on one header line.
    #[error("invalid {field} {value:?}: must be a single line")]
    InvalidSignature { field: &'static str, value: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
