//! Harvest Refactoring Engine
//!
//! Rewrites the namespace header of a source file (its `package` declaration
//! and `import` statements) from one namespace to another without touching a
//! single byte outside that header.
//!
//! # Example
//!
//! ```ignore
//! use harvest_refactoring::{RefactorMapping, RefactoringEngine};
//!
//! let engine = RefactoringEngine::new(RefactorMapping::new("com.old.model", "com.new.model"))?;
//! let rewritten = engine.refactor(b"package com.old.model;\n\nclass Foo {}\n")?;
//! assert_eq!(rewritten, b"package com.new.model;\n\nclass Foo {}\n");
//! ```

pub mod error;
pub mod header;
pub mod rewrite;

pub use error::{RefactoringError, Result};
pub use header::{parse_header, ImportedName, NamespaceDeclaration, ParsedHeader};
pub use rewrite::{rewrite, RefactorMapping};

/// Applies one [`RefactorMapping`] to any number of files
#[derive(Debug, Clone)]
pub struct RefactoringEngine {
    mapping: RefactorMapping,
}

impl RefactoringEngine {
    /// Create an engine for a validated mapping
    pub fn new(mapping: RefactorMapping) -> Result<Self> {
        mapping.validate()?;
        Ok(Self { mapping })
    }

    /// Get the mapping this engine applies
    pub fn mapping(&self) -> &RefactorMapping {
        &self.mapping
    }

    /// Parse and rewrite `content` in one step
    pub fn refactor(&self, content: &[u8]) -> Result<Vec<u8>> {
        let parsed = parse_header(content)?;
        rewrite(&parsed, &self.mapping)
    }

    /// Verify that `content` would refactor cleanly, without producing output
    pub fn check(&self, content: &[u8]) -> Result<ParsedHeader> {
        let parsed = parse_header(content)?;
        rewrite::ensure_namespace_matches(&parsed, &self.mapping)?;
        Ok(parsed)
    }
}
