//! Property-based tests for rollback completeness
//!
//! For any sequence of staged operations followed by `rollback()`, the
//! filesystem state of every touched path equals its state immediately before
//! staging began.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use harvest_files::{TransactionLog, TransactionStatus};
use proptest::prelude::*;
use tempfile::TempDir;

const PATHS: &[&str] = &[
    "a.txt",
    "d1/b.txt",
    "d1/d2/c.txt",
    "e.txt",
    "n1/x.txt",
    "n1/n2/y.txt",
    "n3/n4/n5/z.bin",
];

const DIRS: &[&str] = &["d1/d2/extra", "n6", "n1/n7/n8"];

#[derive(Debug, Clone)]
enum Step {
    Write(usize, Vec<u8>),
    Mkdir(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..PATHS.len(), prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(i, bytes)| Step::Write(i, bytes)),
        1 => (0..DIRS.len()).prop_map(Step::Mkdir),
    ]
}

/// Pre-existing content for the first four paths
fn arb_initial() -> impl Strategy<Value = Vec<Option<Vec<u8>>>> {
    prop::collection::vec(
        prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
        4,
    )
}

/// Relative path -> file bytes, or `None` for a directory
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Option<Vec<u8>>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            if path.is_dir() {
                out.insert(relative, None);
                walk(root, &path, out);
            } else {
                out.insert(relative, Some(std::fs::read(&path).unwrap()));
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn seed(root: &Path, initial: &[Option<Vec<u8>>]) {
    for (path, content) in PATHS.iter().zip(initial) {
        if let Some(content) = content {
            let full = root.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Rollback returns every touched path to its pre-run state
    #[test]
    fn prop_rollback_restores_pre_run_state(
        initial in arb_initial(),
        steps in prop::collection::vec(arb_step(), 1..12),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        seed(root, &initial);
        let before = snapshot(root);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let outcome = rt.block_on(async {
            let mut log = TransactionLog::new();
            for step in &steps {
                match step {
                    Step::Write(i, bytes) => {
                        log.stage_write_file(&root.join(PATHS[*i]), bytes).await.unwrap();
                    }
                    Step::Mkdir(i) => {
                        log.stage_create_directory(&root.join(DIRS[*i])).await.unwrap();
                    }
                }
            }
            let outcome = log.rollback().await.unwrap();
            assert_eq!(log.status(), TransactionStatus::RolledBack);
            outcome
        });

        prop_assert!(outcome.is_clean());
        prop_assert_eq!(snapshot(root), before);
    }

    /// Commit leaves the last written bytes of every path on disk
    #[test]
    fn prop_commit_keeps_last_write(
        initial in arb_initial(),
        steps in prop::collection::vec(arb_step(), 1..12),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        seed(root, &initial);

        let mut expected: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut log = TransactionLog::new();
            for step in &steps {
                match step {
                    Step::Write(i, bytes) => {
                        log.stage_write_file(&root.join(PATHS[*i]), bytes).await.unwrap();
                        expected.insert(*i, bytes.clone());
                    }
                    Step::Mkdir(i) => {
                        log.stage_create_directory(&root.join(DIRS[*i])).await.unwrap();
                    }
                }
            }
            log.commit().await.unwrap();
        });

        for (i, bytes) in expected {
            prop_assert_eq!(std::fs::read(root.join(PATHS[i])).unwrap(), bytes);
        }
    }
}
