//! Safety checks applied when unpacking members to disk.
//!
//! Member names come straight from the archive and must never be allowed to
//! escape the output directory (zip-slip). Sizes are checked against a limit
//! as the data streams in, since many formats do not record them up front.

use crate::error::{SecurityError, UnpackError};
use crate::types::EntryKind;
use std::path::{Component, Path, PathBuf};

/// Validates and normalizes a member path so it stays inside the output directory.
///
/// This function performs the following checks:
/// - Rejects absolute paths
/// - Rejects paths containing ".." components (path traversal)
/// - Removes "." components and redundant separators
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use archive_stream::safety::validate_entry_path;
///
/// let safe_path = validate_entry_path(Path::new("./dir/file.txt")).unwrap();
/// assert_eq!(safe_path, Path::new("dir/file.txt"));
///
/// assert!(validate_entry_path(Path::new("../../etc/passwd")).is_err());
/// assert!(validate_entry_path(Path::new("/etc/passwd")).is_err());
/// ```
pub fn validate_entry_path(path: &Path) -> Result<PathBuf, SecurityError> {
    if path.is_absolute() {
        return Err(SecurityError::AbsolutePath(path.display().to_string()));
    }

    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => continue,
            Component::ParentDir => {
                return Err(SecurityError::PathTraversal(format!(
                    "Path contains '..' component: {}",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::AbsolutePath(path.display().to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(
            "Path normalizes to empty".to_string(),
        ));
    }

    Ok(normalized)
}

/// Checks the running byte total against an optional limit.
///
/// # Examples
///
/// ```
/// use archive_stream::safety::check_size_limits;
///
/// assert!(check_size_limits(1000, Some(2000)).is_ok());
/// assert!(check_size_limits(3000, Some(2000)).is_err());
/// assert!(check_size_limits(999_999_999, None).is_ok());
/// ```
pub fn check_size_limits(current_bytes: u64, limit: Option<u64>) -> Result<(), UnpackError> {
    match limit {
        Some(max_bytes) if current_bytes > max_bytes => Err(UnpackError::SizeLimitExceeded {
            current: current_bytes,
            limit: max_bytes,
        }),
        _ => Ok(()),
    }
}

/// Only regular files and directories are materialized on disk; links and
/// special files are refused.
pub fn check_entry_kind(path: &str, kind: EntryKind) -> Result<(), SecurityError> {
    match kind {
        EntryKind::File | EntryKind::Directory => Ok(()),
        EntryKind::Symlink => Err(SecurityError::UnsafeEntryType(format!(
            "symbolic link: {}",
            path
        ))),
        EntryKind::Other => Err(SecurityError::UnsafeEntryType(format!(
            "special file: {}",
            path
        ))),
    }
}
