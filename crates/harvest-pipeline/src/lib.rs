//! Harvest pipeline
//!
//! Pulls individual files out of a historical snapshot, rewrites their
//! namespace header and writes them into a project skeleton as one
//! transaction: either every file lands, or every filesystem change made by
//! the run is undone.
//!
//! A run moves through [`PipelineState`]s and always ends with a complete
//! [`PipelineReport`], whether it committed, validated (dry run), rolled back
//! or was rejected before touching anything.

pub mod config;
pub mod error;
mod extract;
pub mod manifest;
pub mod orchestrator;
pub mod report;
pub mod state;

pub use config::{ConfigLoader, HarvestConfig, PipelineOptions, DEFAULT_PREFETCH_DEPTH};
pub use error::{ErrorKind, PipelineError, Result};
pub use extract::ExtractedFile;
pub use manifest::{Manifest, ManifestEntry};
pub use orchestrator::Pipeline;
pub use report::{EntryOutcome, EntryReport, FailureReport, PipelineReport, RunOutcome};
pub use state::PipelineState;

pub use harvest_refactoring::RefactorMapping;
pub use harvest_sources::{SourceBackend, SourceExtractor, SourceKind};
