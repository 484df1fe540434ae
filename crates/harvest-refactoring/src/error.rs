//! Error types for the refactoring engine

use thiserror::Error;

/// Result type for refactoring operations
pub type Result<T> = std::result::Result<T, RefactoringError>;

/// Errors that can occur while parsing or rewriting a namespace header
#[derive(Debug, Error)]
pub enum RefactoringError {
    /// No recognizable namespace/import header could be located
    #[error("Header parse error at byte {offset}: {message}")]
    HeaderParseError {
        /// Byte offset where parsing gave up
        offset: usize,
        /// What was expected
        message: String,
    },

    /// The file declares a namespace other than the one being renamed
    #[error("Namespace mismatch: expected `{expected}`, file declares {found}")]
    NamespaceMismatch {
        /// Namespace the mapping renames
        expected: String,
        /// Namespace found in the file, rendered for display
        found: String,
    },

    /// The mapping itself is malformed
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),
}

impl RefactoringError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::HeaderParseError {
            offset,
            message: message.into(),
        }
    }
}
