//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur while staging.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The path to stage does not exist.
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// The path to stage is not inside the project.
    #[error("{0} is outside the project")]
    OutsideProject(PathBuf),

    /// Neither a regular file nor a directory.
    #[error("unsupported file type: {0}")]
    UnsupportedType(PathBuf),

    /// A file that staging never records, such as an executable.
    #[error("refusing to stage {path}: {reason}")]
    Unstageable { path: PathBuf, reason: &'static str },

    /// The ignore file could not be parsed.
    #[error("invalid ignore file: {0}")]
    IgnoreFile(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] vcp_store::StoreError),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
