//! Archive entry path normalization
//!
//! Entry names come from untrusted archives. Before an entry is matched
//! against a requested path, its name is reduced to a canonical relative
//! form; names that are absolute or climb out of the archive root are
//! rejected outright instead of being clamped.

/// Normalize a relative, `/`-separated path
///
/// Backslashes are treated as separators, empty and `.` segments are
/// dropped and `..` pops the previous segment. Returns `None` when the path
/// is absolute, carries a drive prefix, or climbs above its root. An empty
/// result means the path names the root itself.
pub fn normalize_entry_path(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");

    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}

/// Strip a leading root folder from an entry name
///
/// Returns the remainder without its separator, or an empty string when the
/// entry is the root folder itself. Entries outside `root` yield `None`.
pub fn strip_root_folder<'a>(name: &'a str, root: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(root)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/')
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_path() {
        assert_eq!(
            normalize_entry_path("src/main/Foo.java").as_deref(),
            Some("src/main/Foo.java")
        );
    }

    #[test]
    fn test_normalize_collapses_dots_and_separators() {
        assert_eq!(
            normalize_entry_path("./src//main/./x/../Foo.java").as_deref(),
            Some("src/main/Foo.java")
        );
        assert_eq!(
            normalize_entry_path("src\\main\\Foo.java").as_deref(),
            Some("src/main/Foo.java")
        );
    }

    #[test]
    fn test_normalize_rejects_escape() {
        assert_eq!(normalize_entry_path("../etc/passwd"), None);
        assert_eq!(normalize_entry_path("a/../../b"), None);
        assert_eq!(normalize_entry_path("..\\b"), None);
    }

    #[test]
    fn test_normalize_rejects_absolute() {
        assert_eq!(normalize_entry_path("/etc/passwd"), None);
        assert_eq!(normalize_entry_path("\\windows\\system32"), None);
        assert_eq!(normalize_entry_path("C:/windows"), None);
    }

    #[test]
    fn test_normalize_root_is_empty() {
        assert_eq!(normalize_entry_path("").as_deref(), Some(""));
        assert_eq!(normalize_entry_path("./").as_deref(), Some(""));
        assert_eq!(normalize_entry_path("a/..").as_deref(), Some(""));
    }

    #[test]
    fn test_strip_root_folder() {
        assert_eq!(strip_root_folder("proj/src/A.java", "proj"), Some("src/A.java"));
        assert_eq!(strip_root_folder("proj/", "proj"), Some(""));
        assert_eq!(strip_root_folder("proj", "proj"), Some(""));
        assert_eq!(strip_root_folder("project/A.java", "proj"), None);
        assert_eq!(strip_root_folder("other/A.java", "proj"), None);
    }
}
