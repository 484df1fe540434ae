//! Error types for the pipeline orchestrator

use std::fmt;

use harvest_files::FileError;
use harvest_refactoring::RefactoringError;
use harvest_sources::SourceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can stop a harvest run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Parsing or rewriting the header failed
    #[error(transparent)]
    Refactoring(#[from] RefactoringError),

    /// Staging a filesystem mutation failed
    #[error(transparent)]
    File(#[from] FileError),

    /// The manifest failed pre-flight validation
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// The run configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// An extraction worker panicked or was cancelled
    #[error("Extraction worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Classify this error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Source(e) => match e {
                SourceError::RevisionNotFound { .. } => ErrorKind::RevisionNotFound,
                SourceError::PathNotFoundAtRevision { .. } => ErrorKind::PathNotFoundAtRevision,
                SourceError::ArchiveNotFound { .. } => ErrorKind::ArchiveNotFound,
                SourceError::AmbiguousArchive { .. } => ErrorKind::AmbiguousArchive,
                SourceError::PathNotFoundInArchive { .. } => ErrorKind::PathNotFoundInArchive,
                SourceError::UnsafeEntryPath { .. } => ErrorKind::UnsafeEntryPath,
                SourceError::SourceUnavailable { .. }
                | SourceError::CorruptArchive { .. }
                | SourceError::Git(_)
                | SourceError::Io { .. } => ErrorKind::SourceUnavailable,
            },
            PipelineError::Refactoring(e) => match e {
                RefactoringError::HeaderParseError { .. } => ErrorKind::HeaderParseError,
                RefactoringError::NamespaceMismatch { .. } => ErrorKind::NamespaceMismatch,
                RefactoringError::InvalidMapping(_) => ErrorKind::InvalidMapping,
            },
            PipelineError::File(_) => ErrorKind::FileSystemError,
            PipelineError::InvalidManifest(_) => ErrorKind::InvalidManifest,
            PipelineError::Config(_) => ErrorKind::InvalidConfiguration,
            PipelineError::Worker(_) => ErrorKind::WorkerFailed,
        }
    }
}

/// Reportable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RevisionNotFound,
    PathNotFoundAtRevision,
    ArchiveNotFound,
    AmbiguousArchive,
    PathNotFoundInArchive,
    UnsafeEntryPath,
    SourceUnavailable,
    HeaderParseError,
    NamespaceMismatch,
    InvalidMapping,
    InvalidManifest,
    InvalidConfiguration,
    FileSystemError,
    WorkerFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_source_errors_keep_their_kind() {
        let error: PipelineError = SourceError::AmbiguousArchive {
            revision: "abc".to_string(),
            candidates: vec![PathBuf::from("a-abc.zip"), PathBuf::from("b-abc.zip")],
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::AmbiguousArchive);
        assert!(error.to_string().contains("a-abc.zip"));
    }

    #[test]
    fn test_backend_failures_are_source_unavailable() {
        let error: PipelineError = SourceError::CorruptArchive {
            archive: PathBuf::from("p-1.zip"),
            message: "bad header".to_string(),
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_refactoring_errors_keep_their_kind() {
        let error: PipelineError = RefactoringError::NamespaceMismatch {
            expected: "com.old".to_string(),
            found: "`com.other`".to_string(),
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::NamespaceMismatch);
    }

    #[test]
    fn test_file_errors_are_filesystem_errors() {
        let error: PipelineError = FileError::IsADirectory(PathBuf::from("out")).into();
        assert_eq!(error.kind(), ErrorKind::FileSystemError);
        assert_eq!(ErrorKind::FileSystemError.to_string(), "FileSystemError");
    }
}
