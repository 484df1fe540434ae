//! Harvest-Refactor-Write orchestration

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use harvest_files::{RollbackOutcome, TransactionLog};
use harvest_refactoring::{RefactorMapping, RefactoringEngine};
use harvest_sources::{SourceBackend, SourceExtractor};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::{HarvestConfig, PipelineOptions},
    error::{PipelineError, Result},
    extract::Prefetcher,
    manifest::{normalize_destination, Manifest},
    report::{EntryOutcome, EntryReport, FailureReport, PipelineReport, RunOutcome},
    state::{PipelineState, StateTracker},
};

/// Runs manifests through extraction, refactoring and transactional writing
///
/// # Examples
///
/// ```ignore
/// use harvest_pipeline::{ConfigLoader, Pipeline};
///
/// let config = ConfigLoader::load("harvest.yaml".as_ref())?;
/// let pipeline = Pipeline::from_config(&config)?;
/// let report = pipeline.run(&config.manifest(entries)).await;
/// std::process::exit(report.exit_code());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    engine: RefactoringEngine,
    destination_root: PathBuf,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline writing into `destination_root`
    pub fn new(
        mapping: RefactorMapping,
        destination_root: impl Into<PathBuf>,
        options: PipelineOptions,
    ) -> Result<Self> {
        Ok(Self {
            engine: RefactoringEngine::new(mapping)?,
            destination_root: destination_root.into(),
            options,
        })
    }

    /// Create a pipeline from a loaded configuration
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        Self::new(
            config.mapping.clone(),
            config.destination_root.clone(),
            config.options.clone(),
        )
    }

    /// Destination root
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Run options
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run a manifest against the backend its source fields describe
    pub async fn run(&self, manifest: &Manifest) -> PipelineReport {
        let mut run = RunRecorder::start(manifest, self.options.dry_run);

        if let Err(e) = manifest.validate() {
            return run.preflight_failed(e);
        }

        let backend = match SourceBackend::open(manifest.source_kind, &manifest.source_root) {
            Ok(backend) => backend,
            Err(e) => return run.preflight_failed(e.into()),
        };

        self.execute(manifest, Arc::new(backend), run).await
    }

    /// Run a manifest against an explicit extractor, ignoring the
    /// manifest's source fields
    pub async fn run_with(
        &self,
        manifest: &Manifest,
        extractor: Arc<dyn SourceExtractor>,
    ) -> PipelineReport {
        let run = RunRecorder::start(manifest, self.options.dry_run);

        if let Err(e) = manifest.validate() {
            return run.preflight_failed(e);
        }

        self.execute(manifest, extractor, run).await
    }

    async fn execute(
        &self,
        manifest: &Manifest,
        extractor: Arc<dyn SourceExtractor>,
        mut run: RunRecorder,
    ) -> PipelineReport {
        info!(
            "Starting harvest run {} ({} entries, dry run: {})",
            run.run_id,
            manifest.len(),
            self.options.dry_run
        );

        let mut prefetch = Prefetcher::new(
            extractor,
            manifest.entries.clone(),
            self.options.prefetch_depth,
        );
        let mut log = TransactionLog::new();

        for index in 0..manifest.len() {
            if let Err(e) = self.process_entry(index, &mut prefetch, &mut log, &mut run).await {
                return self.abort(index, e, log, run).await;
            }
        }

        if self.options.dry_run {
            run.states.advance(PipelineState::Validated);
            info!("Harvest run {} validated {} entries", run.run_id, manifest.len());
            return run.finish(RunOutcome::Validated);
        }

        if let Err(e) = log.commit().await {
            return self.abort(manifest.len(), e.into(), log, run).await;
        }
        run.states.advance(PipelineState::Committed);
        info!("Harvest run {} committed {} files", run.run_id, manifest.len());
        run.finish(RunOutcome::Committed)
    }

    async fn process_entry(
        &self,
        index: usize,
        prefetch: &mut Prefetcher,
        log: &mut TransactionLog,
        run: &mut RunRecorder,
    ) -> Result<()> {
        run.states.advance(PipelineState::Extracting);
        let extracted = match prefetch.next().await {
            Some(result) => result?,
            None => {
                return Err(PipelineError::Worker(format!(
                    "no extraction scheduled for entry {}",
                    index
                )))
            }
        };
        debug!(
            "Extracted {} bytes for {} at {}",
            extracted.content.len(),
            extracted.entry.source_path.display(),
            extracted.entry.revision
        );

        run.states.advance(PipelineState::Refactoring);
        let rewritten = self.engine.refactor(&extracted.content)?;

        if self.options.dry_run {
            run.set_outcome(index, EntryOutcome::Validated);
            return Ok(());
        }

        run.states.advance(PipelineState::Writing);
        let relative = normalize_destination(&extracted.entry.destination_path).ok_or_else(|| {
            PipelineError::InvalidManifest(format!(
                "entry {}: destination {} escapes the destination root",
                index,
                extracted.entry.destination_path.display()
            ))
        })?;
        let destination = self.destination_root.join(relative);
        log.stage_write_file(&destination, &rewritten).await?;
        debug!("Staged {}", destination.display());
        run.set_outcome(index, EntryOutcome::Written { path: destination });
        Ok(())
    }

    async fn abort(
        &self,
        index: usize,
        failure: PipelineError,
        mut log: TransactionLog,
        mut run: RunRecorder,
    ) -> PipelineReport {
        let kind = failure.kind();
        let message = failure.to_string();
        error!("Harvest run {} failed at entry {}: {}", run.run_id, index, message);

        run.states.advance(PipelineState::Failed);
        if index < run.entries.len() {
            run.set_outcome(
                index,
                EntryOutcome::Failed {
                    kind,
                    message: message.clone(),
                },
            );
        }
        run.failure = Some(FailureReport {
            entry_index: (index < run.entries.len()).then_some(index),
            kind,
            message,
        });

        let outcome = match log.rollback().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Rollback could not start: {}", e);
                RollbackOutcome::default()
            }
        };
        for warning in &outcome.warnings {
            warn!(
                "Rollback warning on {} {}: {}",
                warning.operation,
                warning.path.display(),
                warning.message
            );
        }
        info!(
            "Harvest run {} rolled back {} operations",
            run.run_id, outcome.undone
        );

        run.mark_rolled_back();
        run.rollback_warnings = outcome.warnings;
        run.states.advance(PipelineState::RolledBack);
        run.finish(RunOutcome::RolledBack)
    }
}

/// Accumulates the report while a run is in progress
struct RunRecorder {
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    dry_run: bool,
    states: StateTracker,
    entries: Vec<EntryReport>,
    failure: Option<FailureReport>,
    rollback_warnings: Vec<harvest_files::RollbackWarning>,
}

impl RunRecorder {
    fn start(manifest: &Manifest, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            dry_run,
            states: StateTracker::new(),
            entries: manifest
                .entries
                .iter()
                .enumerate()
                .map(|(index, entry)| EntryReport {
                    index,
                    entry: entry.clone(),
                    outcome: EntryOutcome::Skipped,
                })
                .collect(),
            failure: None,
            rollback_warnings: Vec::new(),
        }
    }

    fn set_outcome(&mut self, index: usize, outcome: EntryOutcome) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.outcome = outcome;
        }
    }

    fn mark_rolled_back(&mut self) {
        for entry in &mut self.entries {
            if let EntryOutcome::Written { path } = &entry.outcome {
                entry.outcome = EntryOutcome::RolledBack { path: path.clone() };
            }
        }
    }

    fn preflight_failed(mut self, failure: PipelineError) -> PipelineReport {
        error!("Harvest run {} rejected before start: {}", self.run_id, failure);
        self.failure = Some(FailureReport {
            entry_index: None,
            kind: failure.kind(),
            message: failure.to_string(),
        });
        self.finish(RunOutcome::PreflightFailed)
    }

    fn finish(self, outcome: RunOutcome) -> PipelineReport {
        let state = self.states.current();
        PipelineReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            state,
            state_history: self.states.into_history(),
            outcome,
            success: matches!(outcome, RunOutcome::Committed | RunOutcome::Validated),
            entries: self.entries,
            failure: self.failure,
            rollback_warnings: self.rollback_warnings,
        }
    }
}
