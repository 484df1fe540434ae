//! Run manifest: which files to harvest, from where, to where

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use harvest_sources::SourceKind;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One file to harvest
///
/// Manifest order is the processing order, and the reverse of the order in
/// which a failed run is undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Revision the source file is read at
    pub revision: String,
    /// Path of the file inside the source tree at that revision
    pub source_path: PathBuf,
    /// Path relative to the destination root the rewritten file lands at
    pub destination_path: PathBuf,
}

impl ManifestEntry {
    /// Create an entry
    pub fn new(
        revision: impl Into<String>,
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            revision: revision.into(),
            source_path: source_path.into(),
            destination_path: destination_path.into(),
        }
    }
}

/// The files of one run and the source they come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Git repository or archive directory
    pub source_root: PathBuf,
    /// How `source_root` is read
    pub source_kind: SourceKind,
    /// Files to harvest, in processing order
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest over the given source
    pub fn new(source_root: impl Into<PathBuf>, source_kind: SourceKind) -> Self {
        Self {
            source_root: source_root.into(),
            source_kind,
            entries: Vec::new(),
        }
    }

    /// Append an entry, builder style
    pub fn with_entry(mut self, entry: ManifestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there is nothing to harvest
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pre-flight checks that need no I/O
    ///
    /// Every entry needs a revision and a source path; destination paths
    /// must be relative, stay inside the destination root and be unique
    /// once normalized.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<PathBuf, usize> = HashMap::new();

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.revision.trim().is_empty() {
                return Err(invalid(index, "revision is empty"));
            }
            if entry.source_path.as_os_str().is_empty() {
                return Err(invalid(index, "source path is empty"));
            }

            let destination = normalize_destination(&entry.destination_path).ok_or_else(|| {
                invalid(
                    index,
                    format!(
                        "destination {} must be a relative path inside the destination root",
                        entry.destination_path.display()
                    ),
                )
            })?;

            if let Some(first) = seen.insert(destination, index) {
                return Err(invalid(
                    index,
                    format!(
                        "destination {} is already used by entry {}",
                        entry.destination_path.display(),
                        first
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Normalize a destination path, rejecting anything that is absolute,
/// names the root itself or climbs out of it
pub fn normalize_destination(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!normalized.as_os_str().is_empty()).then_some(normalized)
}

fn invalid(index: usize, message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidManifest(format!("entry {}: {}", index, message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entries: Vec<ManifestEntry>) -> Manifest {
        Manifest {
            source_root: PathBuf::from("/repo"),
            source_kind: SourceKind::History,
            entries,
        }
    }

    #[test]
    fn test_valid_manifest() {
        let manifest = manifest(vec![
            ManifestEntry::new("abc", "src/A.java", "src/main/java/A.java"),
            ManifestEntry::new("abc", "src/B.java", "src/main/java/B.java"),
        ]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        assert!(manifest(vec![]).validate().is_ok());
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let manifest = manifest(vec![
            ManifestEntry::new("abc", "src/A.java", "out/A.java"),
            ManifestEntry::new("def", "src/A.java", "out/./x/../A.java"),
        ]);
        let error = manifest.validate().unwrap_err();
        assert!(matches!(error, PipelineError::InvalidManifest(_)));
        assert!(error.to_string().contains("entry 1"));
    }

    #[test]
    fn test_absolute_destination_rejected() {
        let manifest = manifest(vec![ManifestEntry::new("abc", "A.java", "/etc/A.java")]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_escaping_destination_rejected() {
        let manifest = manifest(vec![ManifestEntry::new("abc", "A.java", "out/../../A.java")]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_missing_revision_rejected() {
        let manifest = manifest(vec![ManifestEntry::new(" ", "A.java", "A.java")]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(
            normalize_destination(Path::new("./a/b/../c.java")),
            Some(PathBuf::from("a/c.java"))
        );
        assert_eq!(normalize_destination(Path::new(".")), None);
        assert_eq!(normalize_destination(Path::new("..")), None);
    }

    #[test]
    fn test_manifest_deserializes_camel_case() {
        let json = r#"{
            "sourceRoot": "/snapshots",
            "sourceKind": "archive",
            "entries": [
                {"revision": "a1b2", "sourcePath": "src/A.java", "destinationPath": "A.java"}
            ]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.source_kind, SourceKind::Archive);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries[0].source_path, PathBuf::from("src/A.java"));
    }
}
