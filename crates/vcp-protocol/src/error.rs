use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("invalid project name {name:?}: {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("unsafe path {path:?}: {reason}")]
    UnsafePath { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors from the file streaming engine.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source could not be opened. Nothing was written to the stream.
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// The destination could not be written. The declared bytes were still
    /// consumed from the stream, so the connection remains usable.
    #[error("cannot write {path}: {source}")]
    Storage { path: PathBuf, source: io::Error },

    /// Reading the source failed after the size header was sent.
    #[error("reading {path} failed mid-stream: {source}")]
    Source { path: PathBuf, source: io::Error },

    /// The source ended before the size announced in the header.
    #[error("{path} ended after {sent} of {expected} bytes")]
    SourceTruncated {
        path: PathBuf,
        sent: u64,
        expected: u64,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransferError {
    /// Whether the stream is left in an unknown position and the connection
    /// must be torn down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Open { .. } | Self::Storage { .. })
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_connection_closed() {
        let err: ProtocolError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[test]
    fn other_io_errors_are_kept() {
        let err: ProtocolError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn fatality() {
        let open = TransferError::Open {
            path: "a".into(),
            source: io::ErrorKind::NotFound.into(),
        };
        let storage = TransferError::Storage {
            path: "a".into(),
            source: io::ErrorKind::PermissionDenied.into(),
        };
        let truncated = TransferError::SourceTruncated {
            path: "a".into(),
            sent: 1,
            expected: 2,
        };
        assert!(!open.is_fatal());
        assert!(!storage.is_fatal());
        assert!(truncated.is_fatal());
        assert!(TransferError::from(ProtocolError::ConnectionClosed).is_fatal());
    }
}
