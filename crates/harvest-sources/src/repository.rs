//! Revision store abstraction
//!
//! The history backend only needs two read-only capabilities from a version
//! control system: resolving a revision string to a commit, and reading one
//! path out of that commit's tree. Keeping them behind a trait lets the
//! history source run against any store that can answer both.

use std::path::Path;

use crate::error::Result;

/// Read-only access to files as they existed at a revision
///
/// # Examples
///
/// ```ignore
/// use harvest_sources::{GitRevisionStore, RevisionStore};
///
/// let store = GitRevisionStore::open("/path/to/repo")?;
/// let commit = store.resolve_revision("v1.2.0")?;
/// let bytes = store.read_path_at_revision(&commit, "README.md".as_ref())?;
/// ```
pub trait RevisionStore: Send + Sync {
    /// Resolve a revision (full or abbreviated hash, tag, branch) to a
    /// full commit id
    fn resolve_revision(&self, revision: &str) -> Result<String>;

    /// Read the bytes of `path` in the tree of the given commit id
    fn read_path_at_revision(&self, commit_id: &str, path: &Path) -> Result<Vec<u8>>;
}
