//! Error types for staged filesystem operations

use std::path::PathBuf;

/// Result type for transaction log operations
pub type Result<T> = std::result::Result<T, FileError>;

/// Errors that can occur while staging or undoing filesystem mutations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Permission denied for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A path that must be a directory is occupied by something else
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A path that must be a regular file is a directory
    #[error("Is a directory: {0}")]
    IsADirectory(PathBuf),

    /// The log was already committed or rolled back
    #[error("Transaction is closed ({0})")]
    TransactionClosed(String),

    /// Any other I/O failure, with the path it happened on
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Wraps an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path),
            _ => FileError::Io { path, source },
        }
    }
}
