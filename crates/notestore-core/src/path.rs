use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, Result};

const FORBIDDEN_CHARS: &[char] = &['\0', '<', '>', '"', '|', '?', '*'];

/// Checks that a storage path is non-empty, absolute and free of characters
/// no supported file system accepts.
///
/// # Errors
///
/// Returns `CoreError::EmptyPath` for blank input and `CoreError::InvalidPath`
/// for anything else that cannot name a storage root.
pub fn validate_path_syntax(path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        return Err(CoreError::EmptyPath);
    }

    if !path.is_absolute() {
        return Err(CoreError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path must be absolute".to_string(),
        });
    }

    if let Some(c) = raw.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(CoreError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("path contains forbidden character {c:?}"),
        });
    }

    Ok(())
}

/// Lexically normalizes a path: drops `.` components and resolves `..`
/// against preceding components without touching the file system.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Whether two storage roots name the same location.
///
/// Existing directories are compared by their canonical form so symlinked
/// mounts of the same folder compare equal; otherwise lexical normalization
/// is used.
#[must_use]
pub fn is_same_location(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => normalize_path(a) == normalize_path(b),
    }
}
