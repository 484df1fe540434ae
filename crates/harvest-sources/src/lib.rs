//! Harvest source extraction
//!
//! Resolves a `(revision, path)` pair to the exact bytes that path held at
//! that revision. Two interchangeable, read-only backends are provided:
//!
//! - **History**: a git repository, read through `git2`
//! - **Archive**: a directory of snapshot archives named
//!   `{project}-{revision}.{zip|tar.gz|tgz|tar}`
//!
//! # Examples
//!
//! ```ignore
//! use harvest_sources::{SourceBackend, SourceExtractor, SourceKind};
//!
//! let backend = SourceBackend::open(SourceKind::History, "/path/to/repo")?;
//! let bytes = backend.resolve("4f2a9c1", "src/main/java/com/old/model/Foo.java".as_ref())?;
//! ```

pub mod archive;
pub mod backend;
pub mod error;
pub mod git;
pub mod repository;
pub mod sanitize;

pub use archive::{ArchiveEntry, ArchiveFormat, ArchiveName, ArchiveReader, ArchiveSource};
pub use backend::{SourceBackend, SourceExtractor, SourceKind};
pub use error::{Result, SourceError};
pub use git::{GitRevisionStore, HistorySource};
pub use repository::RevisionStore;
