//! Namespace header parsing
//!
//! The header is the `package` declaration plus the `import` statements that
//! follow it. Everything before it (licence comments, a BOM, blank lines) and
//! everything after it is kept as opaque bytes.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{RefactoringError, Result};

const IDENT: &str = r"(?:[A-Za-z_$]|(?-u:[\x80-\xFF]))(?:[A-Za-z0-9_$]|(?-u:[\x80-\xFF]))*";

const BOM: &[u8] = b"\xEF\xBB\xBF";

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\Apackage[ \t]+({id}(?:\.{id})*)[ \t]*(;)?",
        id = IDENT
    ))
    .expect("package pattern is valid")
});

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\Aimport[ \t]+(static[ \t]+)?({id}(?:\.{id})*)(\.\*)?(?:[ \t]+as[ \t]+{id})?[ \t]*(;)?",
        id = IDENT
    ))
    .expect("import pattern is valid")
});

static DOTTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\A{id}(?:\.{id})*\z", id = IDENT)).expect("dotted pattern is valid")
});

/// True if `name` is a dotted identifier such as `com.example.model`
pub fn is_dotted_identifier(name: &str) -> bool {
    DOTTED_RE.is_match(name.as_bytes())
}

/// The `package` declaration of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDeclaration {
    /// Declared dotted identifier
    pub name: String,
    /// Byte range of the identifier in the original content
    pub span: Range<usize>,
}

/// One `import` statement of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    /// Imported dotted identifier, without any `.*` suffix
    pub name: String,
    /// Whether the import ends in `.*`
    pub wildcard: bool,
    /// Whether this is an `import static`
    pub is_static: bool,
    /// Byte range of `name` in the original content
    pub span: Range<usize>,
}

impl ImportedName {
    /// The name as written, including any wildcard suffix
    pub fn display_name(&self) -> String {
        if self.wildcard {
            format!("{}.*", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A file split into prefix, header and remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    source: Vec<u8>,
    namespace: Option<NamespaceDeclaration>,
    imports: Vec<ImportedName>,
    header_range: Range<usize>,
}

impl ParsedHeader {
    /// Declared namespace, if the file has a `package` declaration
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_ref().map(|ns| ns.name.as_str())
    }

    /// Full namespace declaration including its location
    pub fn namespace_declaration(&self) -> Option<&NamespaceDeclaration> {
        self.namespace.as_ref()
    }

    /// Imports in source order
    pub fn imports(&self) -> &[ImportedName] {
        &self.imports
    }

    /// `[start, end)` of the header in the original content
    pub fn header_range(&self) -> Range<usize> {
        self.header_range.clone()
    }

    /// Bytes before the header
    pub fn prefix(&self) -> &[u8] {
        &self.source[..self.header_range.start]
    }

    /// Bytes of the header itself
    pub fn header(&self) -> &[u8] {
        &self.source[self.header_range.clone()]
    }

    /// Unparsed bytes after the header
    pub fn remainder(&self) -> &[u8] {
        &self.source[self.header_range.end..]
    }

    /// The complete original content
    pub fn source(&self) -> &[u8] {
        &self.source
    }
}

/// Locates the namespace header of `content`
///
/// Leading whitespace, a UTF-8 BOM and `//` or `/* */` comments are skipped.
/// The header starts at the `package` declaration (or the first `import` when
/// there is none) and ends after the last consecutive `import`. Statement
/// terminators are optional, so Kotlin and Groovy headers parse as well.
///
/// # Errors
///
/// [`RefactoringError::HeaderParseError`] if neither a package declaration nor
/// an import can be found, or a header statement is malformed.
pub fn parse_header(content: &[u8]) -> Result<ParsedHeader> {
    let start = skip_trivia(content, 0, false)?;
    let mut pos = start;
    let mut header_end = None;

    let namespace = match PACKAGE_RE.captures(&content[pos..]) {
        Some(caps) => {
            let (whole, name) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(name)) => (whole, name),
                _ => return Err(RefactoringError::parse(pos, "malformed package declaration")),
            };
            let end = pos + whole.end();
            check_terminated(content, &caps, 2, end, "package declaration")?;
            let declaration = NamespaceDeclaration {
                name: utf8(name.as_bytes(), pos + name.start())?,
                span: pos + name.start()..pos + name.end(),
            };
            pos = end;
            header_end = Some(end);
            Some(declaration)
        }
        None => None,
    };

    let mut imports = Vec::new();
    loop {
        let next = match skip_trivia(content, pos, namespace.is_some() || !imports.is_empty()) {
            Ok(next) => next,
            Err(e) if header_end.is_none() => return Err(e),
            Err(_) => break,
        };

        let caps = match IMPORT_RE.captures(&content[next..]) {
            Some(caps) => caps,
            None => break,
        };
        let (whole, name) = match (caps.get(0), caps.get(2)) {
            (Some(whole), Some(name)) => (whole, name),
            _ => break,
        };
        let end = next + whole.end();
        check_terminated(content, &caps, 4, end, "import statement")?;

        imports.push(ImportedName {
            name: utf8(name.as_bytes(), next + name.start())?,
            wildcard: caps.get(3).is_some(),
            is_static: caps.get(1).is_some(),
            span: next + name.start()..next + name.end(),
        });
        pos = end;
        header_end = Some(end);
    }

    let header_end = header_end.ok_or_else(|| {
        RefactoringError::parse(start, "expected a package declaration or import statement")
    })?;

    Ok(ParsedHeader {
        source: content.to_vec(),
        namespace,
        imports,
        header_range: start..header_end,
    })
}

/// A statement without `;` must be followed by a line break, a comment or EOF
fn check_terminated(
    content: &[u8],
    caps: &Captures<'_>,
    semicolon_group: usize,
    end: usize,
    what: &str,
) -> Result<()> {
    if caps.get(semicolon_group).is_some() {
        return Ok(());
    }
    match content.get(end) {
        None | Some(b'\n') | Some(b'\r') | Some(b'/') => Ok(()),
        Some(_) => Err(RefactoringError::parse(end, format!("malformed {}", what))),
    }
}

fn utf8(bytes: &[u8], offset: usize) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RefactoringError::parse(offset, "identifier is not valid UTF-8"))
}

/// Skips whitespace and comments starting at `pos`
///
/// Stray `;` between header statements is skipped when `in_header` is set.
fn skip_trivia(content: &[u8], mut pos: usize, in_header: bool) -> Result<usize> {
    if pos == 0 && content.starts_with(BOM) {
        pos = BOM.len();
    }

    loop {
        match content.get(pos) {
            Some(b) if b.is_ascii_whitespace() => pos += 1,
            Some(b';') if in_header => pos += 1,
            Some(b'/') => match content.get(pos + 1) {
                Some(b'/') => {
                    pos = content[pos..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(content.len(), |i| pos + i + 1);
                }
                Some(b'*') => {
                    let body = pos + 2;
                    let close = content[body..]
                        .windows(2)
                        .position(|w| w == b"*/")
                        .ok_or_else(|| RefactoringError::parse(pos, "unterminated block comment"))?;
                    pos = body + close + 2;
                }
                _ => return Ok(pos),
            },
            _ => return Ok(pos),
        }
    }
}
