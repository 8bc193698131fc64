// src/filesystem/path.rs

//! Path sanitization for archive entries and package directories
//!
//! Uploaded archives are untrusted. Entry names are normalised to relative
//! paths and anything that would climb out of the extraction root is refused.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a path taken from an archive entry
///
/// - Rejects `..` components
/// - Skips `.` components
/// - Strips leading slashes and drive prefixes so the result is relative
/// - Treats backslashes as separators (ZIPs built on Windows)
/// - Returns an error for empty paths
///
/// # Examples
///
/// ```
/// use cmspack::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_path("theme/style.css").unwrap(), PathBuf::from("theme/style.css"));
/// assert_eq!(sanitize_path("/theme/index.php").unwrap(), PathBuf::from("theme/index.php"));
/// assert!(sanitize_path("../etc/passwd").is_err());
/// ```
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().replace('\\', "/");
    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(path_str.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath("Empty path after sanitization".to_string()));
    }

    Ok(normalized)
}

/// Join an untrusted relative path onto `root`, refusing escapes
///
/// ```
/// use cmspack::filesystem::path::safe_join;
/// use std::path::{Path, PathBuf};
///
/// let root = Path::new("/tmp/scratch");
/// assert_eq!(
///     safe_join(root, "theme/index.html").unwrap(),
///     PathBuf::from("/tmp/scratch/theme/index.html")
/// );
/// assert!(safe_join(root, "../../etc/passwd").is_err());
/// ```
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let sanitized = sanitize_path(path.as_ref())?;
    let joined = root.join(&sanitized);

    // Symlinked parents could still point outside the root
    if let (Ok(canonical_root), Ok(canonical_joined)) =
        (root.canonicalize(), joined.canonicalize())
        && !canonical_joined.starts_with(&canonical_root)
    {
        return Err(Error::PathTraversal(format!(
            "Path {} escapes root {}",
            joined.display(),
            root.display()
        )));
    }

    Ok(joined)
}

/// Validate a single directory name such as a package slug
pub fn sanitize_dir_name(name: &str) -> Result<String> {
    if name.contains('/') || name.contains('\\') {
        return Err(Error::PathTraversal(format!(
            "Directory name contains path separator: {}",
            name
        )));
    }

    if name == ".." || name == "." {
        return Err(Error::PathTraversal(format!("Invalid directory name: {}", name)));
    }

    if name.is_empty() {
        return Err(Error::InvalidPath("Empty directory name".to_string()));
    }

    Ok(name.to_string())
}

/// Number of components between `root` and `path` (0 when equal)
pub fn relative_depth(root: &Path, path: &Path) -> Option<usize> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.components().count())
}
