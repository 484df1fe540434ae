//! Run configuration

use std::path::{Path, PathBuf};

use harvest_refactoring::RefactorMapping;
use harvest_sources::SourceKind;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PipelineError, Result},
    manifest::{Manifest, ManifestEntry},
};

/// Default number of extractions allowed to run ahead of the writer
pub const DEFAULT_PREFETCH_DEPTH: usize = 4;

/// Everything a run needs besides its manifest entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Git repository or archive directory
    pub source_root: PathBuf,
    /// How `source_root` is read
    pub source_kind: SourceKind,
    /// Project skeleton the rewritten files are written into
    pub destination_root: PathBuf,
    /// Namespace rename applied to every file
    pub mapping: RefactorMapping,
    /// Run options
    #[serde(default)]
    pub options: PipelineOptions,
}

impl HarvestConfig {
    /// Build a manifest over this configuration's source
    pub fn manifest(&self, entries: Vec<ManifestEntry>) -> Manifest {
        Manifest {
            source_root: self.source_root.clone(),
            source_kind: self.source_kind,
            entries,
        }
    }
}

/// Tunables for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Extract and refactor every entry but stage nothing
    #[serde(default)]
    pub dry_run: bool,
    /// Extractions allowed in flight at once; 1 disables lookahead
    #[serde(default = "default_prefetch_depth")]
    pub prefetch_depth: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            prefetch_depth: DEFAULT_PREFETCH_DEPTH,
        }
    }
}

fn default_prefetch_depth() -> usize {
    DEFAULT_PREFETCH_DEPTH
}

/// Loads run configuration from files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub fn load_from_yaml(path: &Path) -> Result<HarvestConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file: {}", e))
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn load_from_json(path: &Path) -> Result<HarvestConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Load configuration from a file (auto-detect format)
    pub fn load(path: &Path) -> Result<HarvestConfig> {
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::load_from_yaml(path)?,
            Some("json") => Self::load_from_json(path)?,
            _ => {
                return Err(PipelineError::Config(
                    "Unsupported configuration file format".to_string(),
                ))
            }
        };
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(config: &HarvestConfig) -> Result<()> {
        if config.source_root.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "Source root cannot be empty".to_string(),
            ));
        }

        if config.destination_root.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "Destination root cannot be empty".to_string(),
            ));
        }

        if config.options.prefetch_depth == 0 {
            return Err(PipelineError::Config(
                "Prefetch depth must be at least 1".to_string(),
            ));
        }

        config.mapping.validate()?;
        Ok(())
    }
}
