//! Snapshot archive backend
//!
//! The source root is a flat directory of archives, one per revision,
//! named `{project}-{revisionId}.{zip|tar.gz|tgz|tar}`. An archive carries a
//! revision when its stem ends with `-{revision}` and a non-empty project
//! name remains, so revision ids may themselves contain `-` (`proj-v1-2.zip`
//! carries `v1-2`).
//! Archives commonly wrap their content in a single top-level folder; when
//! every entry shares the first entry's leading segment, that segment is
//! stripped before matching.

mod format;

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

pub use format::{ArchiveEntry, ArchiveFormat, ArchiveReader};

use crate::{
    backend::SourceExtractor,
    error::{Result, SourceError},
    sanitize::{normalize_entry_path, strip_root_folder},
};

/// Parsed archive file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub project: String,
    pub revision: String,
    pub format: ArchiveFormat,
}

impl ArchiveName {
    /// Parse `{project}-{revisionId}.{ext}`; anything else yields `None`
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, format) = ArchiveFormat::split_file_name(file_name)?;
        let (project, revision) = stem.rsplit_once('-')?;
        if project.is_empty() || revision.is_empty() {
            return None;
        }
        Some(Self {
            project: project.to_string(),
            revision: revision.to_string(),
            format,
        })
    }

    /// Parse `file_name` as an archive of exactly `revision`
    ///
    /// Unlike [`parse`](ArchiveName::parse), the split point comes from the
    /// requested revision, so ids containing `-` are matched whole.
    pub fn for_revision(file_name: &str, revision: &str) -> Option<Self> {
        if revision.is_empty() {
            return None;
        }
        let (stem, format) = ArchiveFormat::split_file_name(file_name)?;
        let project = stem.strip_suffix(revision)?.strip_suffix('-')?;
        if project.is_empty() {
            return None;
        }
        Some(Self {
            project: project.to_string(),
            revision: revision.to_string(),
            format,
        })
    }
}

/// Archive backend over a directory of per-revision snapshots
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    root: PathBuf,
}

impl ArchiveSource {
    /// Open an archive source rooted at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SourceError::SourceUnavailable {
                root,
                message: "archive root is not a directory".to_string(),
            });
        }
        debug!("Opened archive source at: {}", root.display());
        Ok(Self { root })
    }

    /// Directory holding the archives
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the single archive whose revision id equals `revision`
    pub fn find_archive(&self, revision: &str) -> Result<(PathBuf, ArchiveName)> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| SourceError::io(&self.root, e))?;

        let mut candidates = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| SourceError::io(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(name) = ArchiveName::for_revision(file_name, revision) else {
                continue;
            };
            if entry.path().is_file() {
                candidates.push((entry.path(), name));
            }
        }

        match candidates.len() {
            0 => Err(SourceError::ArchiveNotFound {
                revision: revision.to_string(),
                root: self.root.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => {
                let mut paths: Vec<PathBuf> = candidates.into_iter().map(|(p, _)| p).collect();
                paths.sort();
                Err(SourceError::AmbiguousArchive {
                    revision: revision.to_string(),
                    candidates: paths,
                })
            }
        }
    }
}

/// Leading folder shared by every entry, if any
///
/// The candidate is the first segment of the first entry. A lone file at
/// the top level never counts as a root folder.
pub fn detect_root_folder(entries: &[ArchiveEntry]) -> Option<String> {
    let first = entries.first()?;
    let (candidate, rest) = match first.name.split_once('/') {
        Some((candidate, rest)) => (candidate, Some(rest)),
        None => (first.name.as_str(), None),
    };
    if candidate.is_empty() || matches!(candidate, "." | "..") {
        return None;
    }
    if rest.is_none() && !first.is_dir {
        return None;
    }

    let shared = entries.iter().all(|entry| match strip_root_folder(&entry.name, candidate) {
        Some("") => entry.is_dir || entry.name.ends_with('/'),
        Some(_) => true,
        None => false,
    });
    shared.then(|| candidate.to_string())
}

impl SourceExtractor for ArchiveSource {
    fn resolve(&self, revision: &str, source_path: &Path) -> Result<Vec<u8>> {
        let (archive_path, name) = self.find_archive(revision)?;
        debug!(
            "Revision {} resolved to archive {}",
            revision,
            archive_path.display()
        );

        let requested = source_path.to_string_lossy();
        let wanted = match normalize_entry_path(&requested) {
            Some(wanted) if !wanted.is_empty() => wanted,
            _ => {
                return Err(SourceError::UnsafeEntryPath {
                    archive: archive_path,
                    entry: requested.into_owned(),
                })
            }
        };

        let mut reader = name.format.open(&archive_path)?;
        let entries = reader.entries()?;
        let root_folder = detect_root_folder(&entries);
        if let Some(root) = &root_folder {
            debug!("Stripping root folder {} from {}", root, archive_path.display());
        }

        // Every entry is checked, so a hostile archive fails even when the
        // requested file itself is benign
        let mut matched: Option<&str> = None;
        for entry in &entries {
            let relative = match &root_folder {
                Some(root) => strip_root_folder(&entry.name, root).unwrap_or(&entry.name),
                None => entry.name.as_str(),
            };
            if relative.is_empty() {
                debug!("Skipping root folder entry: {}", entry.name);
                continue;
            }
            let Some(normalized) = normalize_entry_path(relative) else {
                return Err(SourceError::UnsafeEntryPath {
                    archive: archive_path,
                    entry: entry.name.clone(),
                });
            };
            if !entry.is_dir && matched.is_none() && normalized == wanted {
                matched = Some(&entry.name);
            }
        }

        let Some(entry_name) = matched else {
            return Err(SourceError::PathNotFoundInArchive {
                archive: archive_path,
                path: wanted,
            });
        };

        let content = reader.read_entry(entry_name)?;
        debug!(
            "Read {} bytes from {} in {}",
            content.len(),
            entry_name,
            archive_path.display()
        );
        Ok(content)
    }
}
