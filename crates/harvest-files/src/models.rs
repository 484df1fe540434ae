//! Data models for staged filesystem operations

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A filesystem mutation recorded together with what is needed to undo it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSystemOperation {
    /// A directory that did not exist and was created by the run
    CreateDirectory {
        /// Directory path
        path: PathBuf,
    },
    /// A file that did not exist and was created by the run
    CreateFile {
        /// File path
        path: PathBuf,
    },
    /// A file that existed and was overwritten by the run
    OverwriteFile {
        /// File path
        path: PathBuf,
        /// Bytes the file held before it was overwritten
        previous_content: Vec<u8>,
    },
}

impl FileSystemOperation {
    /// Path touched by this operation
    pub fn path(&self) -> &Path {
        match self {
            FileSystemOperation::CreateDirectory { path }
            | FileSystemOperation::CreateFile { path }
            | FileSystemOperation::OverwriteFile { path, .. } => path,
        }
    }

    /// Short name of the operation, used in logs and warnings
    pub fn label(&self) -> &'static str {
        match self {
            FileSystemOperation::CreateDirectory { .. } => "create-directory",
            FileSystemOperation::CreateFile { .. } => "create-file",
            FileSystemOperation::OverwriteFile { .. } => "overwrite-file",
        }
    }
}

/// Lifecycle of a transaction log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Mutations may still be staged
    Pending,
    /// All staged mutations were made permanent
    Committed,
    /// All staged mutations were undone
    RolledBack,
}

/// A secondary failure hit while undoing one staged operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackWarning {
    /// Operation whose inverse failed
    pub operation: String,
    /// Path the inverse was acting on
    pub path: PathBuf,
    /// What went wrong
    pub message: String,
}

/// Result of replaying the undo stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// Inverses that completed
    pub undone: usize,
    /// Inverses that failed, in the order they were attempted
    pub warnings: Vec<RollbackWarning>,
}

impl RollbackOutcome {
    /// True when every inverse completed
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
