//! Backend selection

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::{archive::ArchiveSource, error::Result, git::HistorySource};

/// Which kind of store a manifest's `sourceRoot` points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A git repository
    History,
    /// A directory of per-revision snapshot archives
    Archive,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::History => write!(f, "history"),
            SourceKind::Archive => write!(f, "archive"),
        }
    }
}

/// Resolves `(revision, path)` to the bytes that path held at that revision
///
/// Implementations are read-only and safe to call from several worker
/// threads at once.
pub trait SourceExtractor: Send + Sync {
    /// Fetch the content of `source_path` at `revision`
    fn resolve(&self, revision: &str, source_path: &Path) -> Result<Vec<u8>>;
}

/// The configured source backend
#[derive(Debug, Clone)]
pub enum SourceBackend {
    History(HistorySource),
    Archive(ArchiveSource),
}

impl SourceBackend {
    /// Open the backend of the given kind rooted at `root`
    pub fn open<P: AsRef<Path>>(kind: SourceKind, root: P) -> Result<Self> {
        match kind {
            SourceKind::History => Ok(Self::History(HistorySource::open(root)?)),
            SourceKind::Archive => Ok(Self::Archive(ArchiveSource::open(root)?)),
        }
    }

    /// Kind of this backend
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::History(_) => SourceKind::History,
            Self::Archive(_) => SourceKind::Archive,
        }
    }
}

impl SourceExtractor for SourceBackend {
    fn resolve(&self, revision: &str, source_path: &Path) -> Result<Vec<u8>> {
        match self {
            Self::History(source) => source.resolve(revision, source_path),
            Self::Archive(source) => source.resolve(revision, source_path),
        }
    }
}
