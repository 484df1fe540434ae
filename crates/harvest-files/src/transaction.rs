//! Transaction log with reverse-order rollback

use std::fs::Permissions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FileError, Result};
use crate::models::{FileSystemOperation, RollbackOutcome, RollbackWarning, TransactionStatus};

/// Records every filesystem mutation of one run so the run can be undone
///
/// Each `stage_*` call pushes the inverse of its mutation onto an undo stack
/// before performing it. The stack is owned by exactly one run: it is cleared
/// by [`commit`](TransactionLog::commit) and consumed by
/// [`rollback`](TransactionLog::rollback).
#[derive(Debug)]
pub struct TransactionLog {
    id: Uuid,
    undo_stack: Vec<FileSystemOperation>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl TransactionLog {
    /// Creates an empty, pending transaction log
    pub fn new() -> Self {
        TransactionLog {
            id: Uuid::new_v4(),
            undo_stack: Vec::new(),
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Unique id of this log
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// When the log was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Staged operations, oldest first
    pub fn operations(&self) -> &[FileSystemOperation] {
        &self.undo_stack
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    /// True when nothing has been staged
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    fn ensure_pending(&self) -> Result<()> {
        match self.status {
            TransactionStatus::Pending => Ok(()),
            TransactionStatus::Committed => {
                Err(FileError::TransactionClosed("already committed".to_string()))
            }
            TransactionStatus::RolledBack => {
                Err(FileError::TransactionClosed("already rolled back".to_string()))
            }
        }
    }

    /// Creates `path` and any missing ancestors
    ///
    /// One `CreateDirectory` is recorded per directory this call actually
    /// created. Directories that already exist are left alone and get no
    /// inverse.
    ///
    /// # Returns
    ///
    /// The number of directories created
    pub async fn stage_create_directory(&mut self, path: &Path) -> Result<usize> {
        self.ensure_pending()?;

        let mut missing = Vec::new();
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            match fs::metadata(dir).await {
                Ok(meta) if meta.is_dir() => break,
                Ok(_) => return Err(FileError::NotADirectory(dir.to_path_buf())),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    missing.push(dir.to_path_buf());
                    current = dir.parent();
                }
                Err(e) => return Err(FileError::io(dir, e)),
            }
        }

        let mut created = 0;
        for dir in missing.into_iter().rev() {
            self.undo_stack
                .push(FileSystemOperation::CreateDirectory { path: dir.clone() });

            match fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!("Staged directory {}", dir.display());
                    created += 1;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => {
                    // Appeared concurrently; not ours to remove.
                    self.undo_stack.pop();
                }
                Err(e) => {
                    self.undo_stack.pop();
                    return Err(FileError::io(&dir, e));
                }
            }
        }

        Ok(created)
    }

    /// Writes `content` to `path`, creating parent directories as needed
    ///
    /// A new file records `CreateFile`; an existing file records
    /// `OverwriteFile` with its current bytes. The write goes through a
    /// temporary sibling and a rename, so a failed write never leaves the
    /// target half-written and records nothing.
    pub async fn stage_write_file(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        self.ensure_pending()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.stage_create_directory(parent).await?;
            }
        }

        let (inverse, permissions) = match fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => return Err(FileError::IsADirectory(path.to_path_buf())),
            Ok(meta) => {
                let previous_content = fs::read(path)
                    .await
                    .map_err(|e| FileError::io(path, e))?;
                (
                    FileSystemOperation::OverwriteFile {
                        path: path.to_path_buf(),
                        previous_content,
                    },
                    Some(meta.permissions()),
                )
            }
            Err(e) if e.kind() == ErrorKind::NotFound => (
                FileSystemOperation::CreateFile {
                    path: path.to_path_buf(),
                },
                None,
            ),
            Err(e) => return Err(FileError::io(path, e)),
        };

        let label = inverse.label();
        self.undo_stack.push(inverse);

        if let Err(e) = write_atomic(path, content, permissions).await {
            self.undo_stack.pop();
            return Err(e);
        }

        debug!("Staged {} {} ({} bytes)", label, path.display(), content.len());
        Ok(())
    }

    /// Makes every staged mutation permanent and discards the undo stack
    ///
    /// # Returns
    ///
    /// The number of operations that were committed
    pub async fn commit(&mut self) -> Result<usize> {
        self.ensure_pending()?;

        let count = self.undo_stack.len();
        self.undo_stack.clear();
        self.status = TransactionStatus::Committed;

        info!("Transaction {} committed ({} operations)", self.id, count);
        Ok(count)
    }

    /// Undoes every staged mutation, last staged first
    ///
    /// Each inverse is best-effort: a failure is recorded as a
    /// [`RollbackWarning`] and the remaining inverses still run.
    pub async fn rollback(&mut self) -> Result<RollbackOutcome> {
        self.ensure_pending()?;

        let mut outcome = RollbackOutcome::default();
        while let Some(op) = self.undo_stack.pop() {
            match undo(&op).await {
                Ok(()) => {
                    debug!("Undid {} {}", op.label(), op.path().display());
                    outcome.undone += 1;
                }
                Err(e) => {
                    warn!("Failed to undo {} {}: {}", op.label(), op.path().display(), e);
                    outcome.warnings.push(RollbackWarning {
                        operation: op.label().to_string(),
                        path: op.path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.status = TransactionStatus::RolledBack;
        info!(
            "Transaction {} rolled back ({} undone, {} warnings)",
            self.id,
            outcome.undone,
            outcome.warnings.len()
        );
        Ok(outcome)
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransactionLog {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Pending && !self.undo_stack.is_empty() {
            warn!(
                "Transaction {} dropped with {} staged operations left on disk",
                self.id,
                self.undo_stack.len()
            );
        }
    }
}

/// Executes the inverse of one staged operation
async fn undo(op: &FileSystemOperation) -> Result<()> {
    match op {
        FileSystemOperation::CreateDirectory { path } => match fs::remove_dir(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::io(path, e)),
        },
        FileSystemOperation::CreateFile { path } => match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::io(path, e)),
        },
        FileSystemOperation::OverwriteFile {
            path,
            previous_content,
        } => fs::write(path, previous_content)
            .await
            .map_err(|e| FileError::io(path, e)),
    }
}

/// Writes to a temporary sibling and renames it over `path`
async fn write_atomic(path: &Path, content: &[u8], permissions: Option<Permissions>) -> Result<()> {
    let temp = temp_path(path);

    let result = async {
        fs::write(&temp, content)
            .await
            .map_err(|e| FileError::io(&temp, e))?;
        if let Some(permissions) = permissions {
            fs::set_permissions(&temp, permissions)
                .await
                .map_err(|e| FileError::io(&temp, e))?;
        }
        fs::rename(&temp, path)
            .await
            .map_err(|e| FileError::io(path, e))
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp).await;
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = format!(
        ".tmp-{}-{}",
        Uuid::new_v4(),
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
    );
    path.with_file_name(file_name)
}
