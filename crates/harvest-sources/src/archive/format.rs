//! Archive container formats

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;

use crate::error::{Result, SourceError};

/// Supported snapshot container formats, detected from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Extensions in match order; `.tar.gz` must be tried before `.tar`
    const EXTENSIONS: [(&'static str, ArchiveFormat); 4] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar", ArchiveFormat::Tar),
        (".zip", ArchiveFormat::Zip),
    ];

    /// Split a file name into its stem and format
    pub fn split_file_name(file_name: &str) -> Option<(&str, ArchiveFormat)> {
        Self::EXTENSIONS.iter().find_map(|(ext, format)| {
            file_name
                .strip_suffix(ext)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, *format))
        })
    }

    /// Open a reader for the archive at `path`
    pub fn open(self, path: &Path) -> Result<Box<dyn ArchiveReader>> {
        match self {
            ArchiveFormat::Zip => Ok(Box::new(ZipReader::open(path)?)),
            ArchiveFormat::TarGz => Ok(Box::new(TarReader::new(path, true))),
            ArchiveFormat::Tar => Ok(Box::new(TarReader::new(path, false))),
        }
    }
}

/// A single archive member as recorded in the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Raw entry name, unnormalized
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Random access to the members of an archive
pub trait ArchiveReader: Send {
    /// List every entry in container order
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    /// Read the full content of the entry with the given raw name
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;
}

struct ZipReader {
    path: PathBuf,
    archive: zip::ZipArchive<BufReader<File>>,
}

impl ZipReader {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SourceError::io(path, e))?;
        let archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| corrupt(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }
}

impl ArchiveReader for ZipReader {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(index)
                .map_err(|e| corrupt(&self.path, e))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| corrupt(&self.path, e))?;
        let mut content = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut content)
            .map_err(|e| corrupt(&self.path, e))?;
        Ok(content)
    }
}

/// Tar readers are streaming, so each call reopens the file and walks the
/// entries from the start
struct TarReader {
    path: PathBuf,
    gzip: bool,
}

impl TarReader {
    fn new(path: &Path, gzip: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            gzip,
        }
    }

    fn archive(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let file = File::open(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        let reader: Box<dyn Read> = if self.gzip {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(tar::Archive::new(reader))
    }
}

impl ArchiveReader for TarReader {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.archive()?;
        let mut entries = Vec::new();
        for entry in archive.entries().map_err(|e| corrupt(&self.path, e))? {
            let entry = entry.map_err(|e| corrupt(&self.path, e))?;
            entries.push(ArchiveEntry {
                name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                is_dir: entry.header().entry_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive()?;
        for entry in archive.entries().map_err(|e| corrupt(&self.path, e))? {
            let mut entry = entry.map_err(|e| corrupt(&self.path, e))?;
            if String::from_utf8_lossy(&entry.path_bytes()) != name {
                continue;
            }
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| corrupt(&self.path, e))?;
            return Ok(content);
        }
        Err(SourceError::PathNotFoundInArchive {
            archive: self.path.clone(),
            path: name.to_string(),
        })
    }
}

/// Upper bound on memory reserved up front from a size the archive declares
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Header sizes are untrusted, so they only seed the buffer up to a cap
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

fn corrupt(path: &Path, error: impl std::fmt::Display) -> SourceError {
    SourceError::CorruptArchive {
        archive: path.to_path_buf(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_hint_is_capped() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(4096), 4096);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATION as usize);
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            ArchiveFormat::split_file_name("proj-abc.tar.gz"),
            Some(("proj-abc", ArchiveFormat::TarGz))
        );
        assert_eq!(
            ArchiveFormat::split_file_name("proj-abc.tgz"),
            Some(("proj-abc", ArchiveFormat::TarGz))
        );
        assert_eq!(
            ArchiveFormat::split_file_name("proj-abc.tar"),
            Some(("proj-abc", ArchiveFormat::Tar))
        );
        assert_eq!(
            ArchiveFormat::split_file_name("proj-abc.zip"),
            Some(("proj-abc", ArchiveFormat::Zip))
        );
        assert_eq!(ArchiveFormat::split_file_name("proj-abc.rar"), None);
        assert_eq!(ArchiveFormat::split_file_name(".zip"), None);
    }
}
