//! Error types for source extraction

use std::path::PathBuf;

use thiserror::Error;

/// Result type for source extraction
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors that can occur while resolving a file at a revision
#[derive(Debug, Error)]
pub enum SourceError {
    /// No commit matches the requested revision
    #[error("Revision not found: {revision}")]
    RevisionNotFound { revision: String },

    /// The commit exists but has no file at the requested path
    #[error("Path {path} not found at revision {revision}")]
    PathNotFoundAtRevision { revision: String, path: String },

    /// No archive in the source directory carries the requested revision
    #[error("No archive for revision {revision} in {root}")]
    ArchiveNotFound { revision: String, root: PathBuf },

    /// More than one archive carries the requested revision
    #[error("Revision {revision} matches {} archives: {}", candidates.len(), display_paths(candidates))]
    AmbiguousArchive {
        revision: String,
        candidates: Vec<PathBuf>,
    },

    /// The matched archive has no entry at the requested path
    #[error("Path {path} not found in archive {archive}")]
    PathNotFoundInArchive { archive: PathBuf, path: String },

    /// An archive entry (or requested path) would escape the archive root
    #[error("Unsafe entry path {entry} in {archive}")]
    UnsafeEntryPath { archive: PathBuf, entry: String },

    /// The backend root cannot be opened
    #[error("Source unavailable at {root}: {message}")]
    SourceUnavailable { root: PathBuf, message: String },

    /// The archive exists but cannot be read
    #[error("Failed to read archive {archive}: {message}")]
    CorruptArchive { archive: PathBuf, message: String },

    /// Git repository error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// IO error
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
