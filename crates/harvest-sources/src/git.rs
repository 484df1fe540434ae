//! Git history backend

use std::path::{Path, PathBuf};

use git2::{ErrorCode, ObjectType, Oid, Repository as Git2Repository};
use tracing::debug;

use crate::{
    backend::SourceExtractor,
    error::{Result, SourceError},
    repository::RevisionStore,
    sanitize::normalize_entry_path,
};

/// Revision store backed by a git repository on disk
///
/// `git2::Repository` is not `Sync`, so the store keeps only the repository
/// path and opens a handle per lookup. That keeps concurrent extraction
/// workers independent of each other.
#[derive(Debug, Clone)]
pub struct GitRevisionStore {
    root: PathBuf,
}

impl GitRevisionStore {
    /// Open the git repository at `path` (working tree or bare)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        debug!("Opening Git repository at: {}", root.display());

        Git2Repository::open(&root).map_err(|e| {
            debug!("Failed to open repository: {}", e);
            SourceError::SourceUnavailable {
                root: root.clone(),
                message: e.message().to_string(),
            }
        })?;

        Ok(Self { root })
    }

    /// Repository path this store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repository(&self) -> Result<Git2Repository> {
        Git2Repository::open(&self.root).map_err(|e| SourceError::SourceUnavailable {
            root: self.root.clone(),
            message: e.message().to_string(),
        })
    }
}

impl RevisionStore for GitRevisionStore {
    fn resolve_revision(&self, revision: &str) -> Result<String> {
        let repo = self.repository()?;

        let commit = repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| {
                debug!("Failed to resolve revision {}: {}", revision, e);
                SourceError::RevisionNotFound {
                    revision: revision.to_string(),
                }
            })?;

        let id = commit.id().to_string();
        debug!("Resolved revision {} to commit {}", revision, id);
        Ok(id)
    }

    fn read_path_at_revision(&self, commit_id: &str, path: &Path) -> Result<Vec<u8>> {
        let not_found = || SourceError::PathNotFoundAtRevision {
            revision: commit_id.to_string(),
            path: path.display().to_string(),
        };

        let normalized = match normalize_entry_path(&path.to_string_lossy()) {
            Some(normalized) if !normalized.is_empty() => normalized,
            _ => return Err(not_found()),
        };

        let repo = self.repository()?;
        let oid = Oid::from_str(commit_id).map_err(|_| SourceError::RevisionNotFound {
            revision: commit_id.to_string(),
        })?;
        let commit = repo
            .find_commit(oid)
            .map_err(|_| SourceError::RevisionNotFound {
                revision: commit_id.to_string(),
            })?;
        let tree = commit.tree()?;

        let entry = match tree.get_path(Path::new(&normalized)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        if entry.kind() != Some(ObjectType::Blob) {
            debug!("{} at {} is not a file", normalized, commit_id);
            return Err(not_found());
        }

        let blob = repo.find_blob(entry.id())?;
        debug!(
            "Read {} bytes from {} at {}",
            blob.content().len(),
            normalized,
            commit_id
        );
        Ok(blob.content().to_vec())
    }
}

/// History backend: resolves the revision, then reads the path from its tree
#[derive(Debug, Clone)]
pub struct HistorySource<S = GitRevisionStore> {
    store: S,
}

impl HistorySource<GitRevisionStore> {
    /// Open a history source over the git repository at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(GitRevisionStore::open(path)?))
    }
}

impl<S: RevisionStore> HistorySource<S> {
    /// Create a history source over any revision store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying revision store
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RevisionStore> SourceExtractor for HistorySource<S> {
    fn resolve(&self, revision: &str, source_path: &Path) -> Result<Vec<u8>> {
        let commit = self.store.resolve_revision(revision)?;
        self.store
            .read_path_at_revision(&commit, source_path)
            .map_err(|e| match e {
                // Report the revision the caller asked for, not the resolved id
                SourceError::PathNotFoundAtRevision { path, .. } => {
                    SourceError::PathNotFoundAtRevision {
                        revision: revision.to_string(),
                        path,
                    }
                }
                other => other,
            })
    }
}
