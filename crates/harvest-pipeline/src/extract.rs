//! Bounded extraction prefetch
//!
//! Extraction is blocking I/O (git object lookups, archive decompression),
//! so each lookup runs on the blocking pool. Up to `depth` lookups are in
//! flight at once; results are handed out strictly in manifest order.

use std::{collections::VecDeque, sync::Arc};

use harvest_sources::SourceExtractor;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{
    error::{PipelineError, Result},
    manifest::ManifestEntry,
};

/// Bytes read for one manifest entry, before refactoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub entry: ManifestEntry,
    pub content: Vec<u8>,
}

type Pending = JoinHandle<std::result::Result<ExtractedFile, harvest_sources::SourceError>>;

pub(crate) struct Prefetcher {
    extractor: Arc<dyn SourceExtractor>,
    upcoming: std::vec::IntoIter<ManifestEntry>,
    pending: VecDeque<Pending>,
    depth: usize,
}

impl Prefetcher {
    pub(crate) fn new(
        extractor: Arc<dyn SourceExtractor>,
        entries: Vec<ManifestEntry>,
        depth: usize,
    ) -> Self {
        Self {
            extractor,
            upcoming: entries.into_iter(),
            pending: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    fn fill(&mut self) {
        while self.pending.len() < self.depth {
            let Some(entry) = self.upcoming.next() else {
                break;
            };
            let extractor = Arc::clone(&self.extractor);
            debug!(
                "Scheduling extraction of {} at {}",
                entry.source_path.display(),
                entry.revision
            );
            self.pending.push_back(tokio::task::spawn_blocking(move || {
                let content = extractor.resolve(&entry.revision, &entry.source_path)?;
                Ok(ExtractedFile { entry, content })
            }));
        }
    }

    /// Next extraction in manifest order; `None` once every entry was handed out
    ///
    /// Refills the window before waiting, never after, so a depth of 1 keeps
    /// exactly one lookup in flight and nothing runs ahead of the caller.
    pub(crate) async fn next(&mut self) -> Option<Result<ExtractedFile>> {
        self.fill();
        let handle = self.pending.pop_front()?;
        let result = match handle.await {
            Ok(Ok(file)) => Ok(file),
            Ok(Err(e)) => Err(PipelineError::Source(e)),
            Err(e) => Err(PipelineError::Worker(e.to_string())),
        };
        Some(result)
    }

    /// Lookups currently in flight
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
