//! Property: a run either lands every file or leaves the destination exactly
//! as it found it

mod support;

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};

use harvest_pipeline::{
    Manifest, ManifestEntry, Pipeline, PipelineOptions, RefactorMapping, RunOutcome, SourceKind,
};
use harvest_sources::{SourceError, SourceExtractor};
use proptest::prelude::*;
use tempfile::TempDir;

use support::list_tree;

const DESTINATIONS: [&str; 6] = [
    "A.java",
    "pkg/B.java",
    "pkg/deep/C.java",
    "other/D.java",
    "pkg/E.java",
    "F.java",
];

#[derive(Debug, Clone)]
enum Source {
    Good,
    Mismatch,
    Unparseable,
    Missing,
}

struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl SourceExtractor for MemorySource {
    fn resolve(&self, revision: &str, source_path: &Path) -> harvest_sources::Result<Vec<u8>> {
        self.files
            .get(source_path)
            .cloned()
            .ok_or_else(|| SourceError::PathNotFoundAtRevision {
                revision: revision.to_string(),
                path: source_path.display().to_string(),
            })
    }
}

fn content_for(source: &Source, index: usize) -> Option<Vec<u8>> {
    let body = format!("\nclass File{} {{}}\n", index);
    match source {
        Source::Good => Some(format!("package com.old;\nimport com.old.Base;{}", body).into_bytes()),
        Source::Mismatch => Some(format!("package org.other;{}", body).into_bytes()),
        Source::Unparseable => Some(body.into_bytes()),
        Source::Missing => None,
    }
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    list_tree(root)
        .into_iter()
        .map(|relative| {
            let full = root.join(&relative);
            let content = if full.is_dir() {
                None
            } else {
                Some(std::fs::read(&full).unwrap())
            };
            (relative, content)
        })
        .collect()
}

fn arb_source() -> impl Strategy<Value = Source> {
    prop_oneof![
        6 => Just(Source::Good),
        1 => Just(Source::Mismatch),
        1 => Just(Source::Unparseable),
        1 => Just(Source::Missing),
    ]
}

fn arb_run() -> impl Strategy<Value = (Vec<(usize, Source)>, Vec<usize>, usize)> {
    (
        proptest::sample::subsequence((0..DESTINATIONS.len()).collect::<Vec<_>>(), 1..=DESTINATIONS.len())
            .prop_shuffle()
            .prop_flat_map(|destinations| {
                let n = destinations.len();
                (Just(destinations), prop::collection::vec(arb_source(), n))
            })
            .prop_map(|(destinations, sources)| destinations.into_iter().zip(sources).collect::<Vec<_>>()),
        proptest::sample::subsequence((0..DESTINATIONS.len()).collect::<Vec<_>>(), 0..=3),
        1usize..=4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_run_is_all_or_nothing((plan, existing, depth) in arb_run()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dest = TempDir::new().unwrap();

        for index in &existing {
            let path = dest.path().join(DESTINATIONS[*index]);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, format!("pre-existing {}", index)).unwrap();
        }
        let before = snapshot(dest.path());

        let mut files = HashMap::new();
        let mut entries = Vec::new();
        for (position, (destination, source)) in plan.iter().enumerate() {
            let source_path = PathBuf::from(format!("src/File{}.java", position));
            if let Some(content) = content_for(source, position) {
                files.insert(source_path.clone(), content);
            }
            entries.push(ManifestEntry::new("r1", source_path, DESTINATIONS[*destination]));
        }
        let manifest = Manifest {
            source_root: PathBuf::from("/unused"),
            source_kind: SourceKind::History,
            entries,
        };

        let pipeline = Pipeline::new(
            RefactorMapping::new("com.old", "com.new"),
            dest.path(),
            PipelineOptions { dry_run: false, prefetch_depth: depth },
        ).unwrap();
        let report = rt.block_on(pipeline.run_with(&manifest, Arc::new(MemorySource { files })));

        let all_good = plan.iter().all(|(_, source)| matches!(source, Source::Good));
        if all_good {
            prop_assert_eq!(report.outcome, RunOutcome::Committed);
            for (position, (destination, _)) in plan.iter().enumerate() {
                let written = std::fs::read(dest.path().join(DESTINATIONS[*destination])).unwrap();
                let expected = format!(
                    "package com.new;\nimport com.new.Base;\nclass File{} {{}}\n",
                    position
                );
                prop_assert_eq!(written, expected.into_bytes());
            }
        } else {
            prop_assert_eq!(report.outcome, RunOutcome::RolledBack);
            prop_assert!(report.rollback_warnings.is_empty());
            prop_assert_eq!(snapshot(dest.path()), before);
        }
    }
}
