#![warn(missing_docs)]

//! Staged filesystem mutations with all-or-nothing semantics for harvest runs
//!
//! Every mutation made through a [`TransactionLog`] first records the action
//! that undoes it. A run either commits the log (all mutations become
//! permanent) or rolls it back (inverses replay last-staged-first-undone).

pub mod error;
pub mod models;
pub mod transaction;

// Re-export public API
pub use error::{FileError, Result};
pub use models::{FileSystemOperation, RollbackOutcome, RollbackWarning, TransactionStatus};
pub use transaction::TransactionLog;
