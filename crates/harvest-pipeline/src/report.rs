//! Run report

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use harvest_files::RollbackWarning;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ErrorKind, manifest::ManifestEntry, state::PipelineState};

/// What happened to one manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum EntryOutcome {
    /// Rewritten content is in place at `path`
    Written { path: PathBuf },
    /// Dry run: extraction and refactoring succeeded
    Validated,
    /// The file was staged at `path` and later undone
    RolledBack { path: PathBuf },
    /// The run stopped on this entry
    Failed { kind: ErrorKind, message: String },
    /// The run stopped before reaching this entry
    Skipped,
}

/// Per-entry line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    /// Position in the manifest
    pub index: usize,
    /// The manifest entry itself
    pub entry: ManifestEntry,
    /// Outcome
    #[serde(flatten)]
    pub outcome: EntryOutcome,
}

/// How the run as a whole ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every entry written and the transaction committed
    Committed,
    /// Dry run passed for every entry
    Validated,
    /// An entry failed and staged changes were undone
    RolledBack,
    /// The manifest or backend was rejected before any work started
    PreflightFailed,
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Committed | RunOutcome::Validated => 0,
            RunOutcome::RolledBack => 1,
            RunOutcome::PreflightFailed => 2,
        }
    }
}

/// The error that stopped a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Manifest index of the failing entry; `None` for pre-flight failures
    pub entry_index: Option<usize>,
    pub kind: ErrorKind,
    pub message: String,
}

/// Complete account of one run
///
/// Always produced, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Terminal state of the run
    pub state: PipelineState,
    /// Every state the run passed through
    pub state_history: Vec<PipelineState>,
    pub outcome: RunOutcome,
    pub success: bool,
    pub entries: Vec<EntryReport>,
    /// The primary failure, when there was one
    pub failure: Option<FailureReport>,
    /// Inverses that could not be applied during rollback
    pub rollback_warnings: Vec<RollbackWarning>,
}

impl PipelineReport {
    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Entries whose content is now on disk
    pub fn written_paths(&self) -> Vec<&PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                EntryOutcome::Written { path } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Number of entries with the given outcome variant
    pub fn count_where(&self, predicate: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }

    /// Serialize the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, entries: Vec<EntryReport>) -> PipelineReport {
        let now = Utc::now();
        PipelineReport {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            dry_run: false,
            state: PipelineState::Committed,
            state_history: vec![PipelineState::Init, PipelineState::Committed],
            outcome,
            success: outcome.exit_code() == 0,
            entries,
            failure: None,
            rollback_warnings: Vec::new(),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Committed.exit_code(), 0);
        assert_eq!(RunOutcome::Validated.exit_code(), 0);
        assert_eq!(RunOutcome::RolledBack.exit_code(), 1);
        assert_eq!(RunOutcome::PreflightFailed.exit_code(), 2);
    }

    #[test]
    fn test_written_paths() {
        let report = report(
            RunOutcome::Committed,
            vec![
                EntryReport {
                    index: 0,
                    entry: ManifestEntry::new("a", "A.java", "A.java"),
                    outcome: EntryOutcome::Written {
                        path: PathBuf::from("/out/A.java"),
                    },
                },
                EntryReport {
                    index: 1,
                    entry: ManifestEntry::new("a", "B.java", "B.java"),
                    outcome: EntryOutcome::Skipped,
                },
            ],
        );
        assert_eq!(report.written_paths(), vec![&PathBuf::from("/out/A.java")]);
        assert_eq!(
            report.count_where(|o| matches!(o, EntryOutcome::Skipped)),
            1
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = report(
            RunOutcome::RolledBack,
            vec![EntryReport {
                index: 0,
                entry: ManifestEntry::new("a", "A.java", "A.java"),
                outcome: EntryOutcome::Failed {
                    kind: ErrorKind::HeaderParseError,
                    message: "no header".to_string(),
                },
            }],
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcome"], "RolledBack");
        assert_eq!(json["entries"][0]["outcome"], "failed");
        assert_eq!(json["entries"][0]["kind"], "HeaderParseError");
        assert_eq!(json["entries"][0]["entry"]["sourcePath"], "A.java");
    }
}
