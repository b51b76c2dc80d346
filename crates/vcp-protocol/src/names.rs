//! Validation of names and paths that arrive over the wire.
//!
//! Project names:
//! - 1 to 100 characters from `[A-Za-z0-9._-]`
//! - Must not consist only of dots (`.`, `..`, ...)
//!
//! Relative file paths:
//! - Must be non-empty and relative
//! - Must not contain `..`, NUL, or backslashes
//! - Components between slashes must be non-empty

use std::path::Path;

use crate::error::{ProtocolError, ProtocolResult};

/// Longest accepted project name.
pub const MAX_PROJECT_NAME_LEN: usize = 100;

/// Suffix of a file still being received.
pub const PARTIAL_SUFFIX: &str = ".vcp-part";

fn bad_name(name: &str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidProjectName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn unsafe_path(path: &str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::UnsafePath {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Validate a project name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use vcp_protocol::validate_project_name;
///
/// assert!(validate_project_name("my_project-1.0").is_ok());
/// assert!(validate_project_name("../etc").is_err());
/// assert!(validate_project_name("").is_err());
/// ```
pub fn validate_project_name(name: &str) -> ProtocolResult<()> {
    if name.is_empty() {
        return Err(bad_name(name, "must not be empty"));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(bad_name(
            name,
            format!("longer than {MAX_PROJECT_NAME_LEN} characters"),
        ));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(bad_name(name, format!("forbidden character {ch:?}")));
    }
    if name.chars().all(|c| c == '.') {
        return Err(bad_name(name, "must not consist only of dots"));
    }
    Ok(())
}

/// Validate a client-supplied path relative to a project root.
pub fn validate_relative_path(path: &str) -> ProtocolResult<()> {
    if path.is_empty() {
        return Err(unsafe_path(path, "must not be empty"));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(unsafe_path(path, "must be relative"));
    }
    // Drive prefixes such as `C:` are absolute on Windows peers.
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(unsafe_path(path, "must be relative"));
    }
    if path.contains("..") {
        return Err(unsafe_path(path, "must not contain '..'"));
    }
    if path.contains('\0') {
        return Err(unsafe_path(path, "must not contain NUL"));
    }
    if path.contains('\\') {
        return Err(unsafe_path(path, "must use '/' separators"));
    }
    if path.split('/').any(str::is_empty) {
        return Err(unsafe_path(path, "path components must not be empty"));
    }
    Ok(())
}

/// Whether a file name marks an in-progress receive.
pub fn is_partial_file(name: &str) -> bool {
    name.ends_with(PARTIAL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_project_names() {
        assert!(validate_project_name("my_project-1.0").is_ok());
        assert!(validate_project_name("demo").is_ok());
        assert!(validate_project_name("A").is_ok());
        assert!(validate_project_name(".hidden").is_ok());
        assert!(validate_project_name(&"x".repeat(MAX_PROJECT_NAME_LEN)).is_ok());
    }

    #[test]
    fn reject_bad_project_names() {
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("../etc").is_err());
        assert!(validate_project_name("a/b").is_err());
        assert!(validate_project_name("has space").is_err());
        assert!(validate_project_name("caf\u{e9}").is_err());
        assert!(validate_project_name(&"x".repeat(MAX_PROJECT_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn reject_dot_only_project_names() {
        assert!(validate_project_name(".").is_err());
        assert!(validate_project_name("..").is_err());
        assert!(validate_project_name("...").is_err());
    }

    #[test]
    fn valid_relative_paths() {
        assert!(validate_relative_path("a.txt").is_ok());
        assert!(validate_relative_path("src/main.rs").is_ok());
        assert!(validate_relative_path("deep/nested/dir/file").is_ok());
        assert!(validate_relative_path(".gitignore").is_ok());
    }

    #[test]
    fn reject_traversal() {
        assert!(validate_relative_path("../../etc/passwd").is_err());
        assert!(validate_relative_path("a/../b").is_err());
        assert!(validate_relative_path("..").is_err());
    }

    #[test]
    fn reject_absolute() {
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("\\windows").is_err());
        assert!(validate_relative_path("C:stuff").is_err());
    }

    #[test]
    fn reject_malformed_paths() {
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path("a//b").is_err());
        assert!(validate_relative_path("dir/").is_err());
        assert!(validate_relative_path("a\\b").is_err());
        assert!(validate_relative_path("a\0b").is_err());
    }

    #[test]
    fn partial_files() {
        assert!(is_partial_file("a.txt.vcp-part"));
        assert!(!is_partial_file("a.txt"));
    }
}
