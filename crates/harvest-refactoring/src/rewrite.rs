//! Namespace rewriting over a parsed header

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RefactoringError, Result};
use crate::header::{is_dotted_identifier, ParsedHeader};

/// Rename of one namespace to another, supplied per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorMapping {
    /// Namespace files are expected to declare
    pub old_namespace: String,
    /// Namespace they are moved to
    pub new_namespace: String,
}

impl RefactorMapping {
    /// Create a mapping from `old_namespace` to `new_namespace`
    pub fn new(old_namespace: impl Into<String>, new_namespace: impl Into<String>) -> Self {
        Self {
            old_namespace: old_namespace.into(),
            new_namespace: new_namespace.into(),
        }
    }

    /// True when the mapping renames nothing
    pub fn is_identity(&self) -> bool {
        self.old_namespace == self.new_namespace
    }

    /// Check that both sides are dotted identifiers
    pub fn validate(&self) -> Result<()> {
        for (side, value) in [("old", &self.old_namespace), ("new", &self.new_namespace)] {
            if !is_dotted_identifier(value) {
                return Err(RefactoringError::InvalidMapping(format!(
                    "{} namespace `{}` is not a dotted identifier",
                    side, value
                )));
            }
        }
        Ok(())
    }

    /// Project roots the mapping moves between
    ///
    /// Trailing segments shared by both namespaces are dropped, keeping at
    /// least one segment on each side: `com.old.model -> com.new.model` has
    /// the roots `com.old -> com.new`. Imports are rewritten relative to these
    /// roots, so sibling packages of the declared namespace follow it.
    pub fn roots(&self) -> (String, String) {
        let mut old: Vec<&str> = self.old_namespace.split('.').collect();
        let mut new: Vec<&str> = self.new_namespace.split('.').collect();

        while old.len() > 1 && new.len() > 1 && old.last() == new.last() {
            old.pop();
            new.pop();
        }

        (old.join("."), new.join("."))
    }

    /// Renamed form of an imported name, or `None` if it lies outside the
    /// mapped root
    pub fn map_import(&self, name: &str) -> Option<String> {
        let (old_root, new_root) = self.roots();
        replace_prefix(name, &old_root, &new_root)
    }
}

/// Replaces `old` with `new` when `name` equals `old` or starts with `old.`
fn replace_prefix(name: &str, old: &str, new: &str) -> Option<String> {
    let suffix = name.strip_prefix(old)?;
    if suffix.is_empty() || suffix.starts_with('.') {
        Some(format!("{}{}", new, suffix))
    } else {
        None
    }
}

/// Fails with `NamespaceMismatch` unless the file declares exactly the old
/// namespace of `mapping`
pub(crate) fn ensure_namespace_matches(
    parsed: &ParsedHeader,
    mapping: &RefactorMapping,
) -> Result<()> {
    match parsed.namespace() {
        Some(declared) if declared == mapping.old_namespace => Ok(()),
        declared => Err(RefactoringError::NamespaceMismatch {
            expected: mapping.old_namespace.clone(),
            found: declared
                .map(|ns| format!("`{}`", ns))
                .unwrap_or_else(|| "no package".to_string()),
        }),
    }
}

/// Rewrites the header of `parsed` according to `mapping`
///
/// The declared namespace must equal `mapping.old_namespace` exactly. It is
/// replaced by `mapping.new_namespace`, and every import inside the mapped
/// root has its prefix swapped with the suffix (including any `.*`) kept
/// verbatim. Only identifier bytes are replaced: the prefix, the whitespace
/// and comments inside the header, and the remainder come back unchanged.
///
/// # Errors
///
/// [`RefactoringError::NamespaceMismatch`] if the declared namespace differs;
/// no bytes are produced in that case.
pub fn rewrite(parsed: &ParsedHeader, mapping: &RefactorMapping) -> Result<Vec<u8>> {
    ensure_namespace_matches(parsed, mapping)?;

    if mapping.is_identity() {
        return Ok(parsed.source().to_vec());
    }

    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    if let Some(declaration) = parsed.namespace_declaration() {
        replacements.push((declaration.span.clone(), mapping.new_namespace.clone()));
    }

    let (old_root, new_root) = mapping.roots();
    for import in parsed.imports() {
        if let Some(renamed) = replace_prefix(&import.name, &old_root, &new_root) {
            replacements.push((import.span.clone(), renamed));
        }
    }

    let source = parsed.source();
    let mut output = Vec::with_capacity(source.len() + replacements.len() * 8);
    let mut cursor = 0;
    for (span, text) in &replacements {
        output.extend_from_slice(&source[cursor..span.start]);
        output.extend_from_slice(text.as_bytes());
        cursor = span.end;
    }
    output.extend_from_slice(&source[cursor..]);

    debug!(
        "Rewrote {} -> {} ({} identifiers replaced)",
        mapping.old_namespace,
        mapping.new_namespace,
        replacements.len()
    );
    Ok(output)
}
