// src/filesystem/tree.rs

//! Whole-tree copy and removal helpers

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Outcome of a best-effort tree removal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub failures: usize,
}

impl RemovalReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Copy every file under `source` into `dest`, preserving relative paths
///
/// Returns the number of files copied.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::InvalidPath(e.to_string()))?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        } else {
            debug!("Not copying special file {}", entry.path().display());
        }
    }

    Ok(copied)
}

/// Remove `root` and everything below it, deepest entries first
///
/// Individual failures are logged and counted, never raised.
pub fn remove_tree_best_effort(root: &Path) -> RemovalReport {
    let mut report = RemovalReport::default();
    if !root.exists() {
        return report;
    }

    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk {}: {}", root.display(), e);
                report.failures += 1;
                continue;
            }
        };

        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(path).map(|_| report.dirs_removed += 1)
        } else {
            fs::remove_file(path).map(|_| report.files_removed += 1)
        };

        if let Err(e) = result {
            warn!("Failed to remove {}: {}", path.display(), e);
            report.failures += 1;
        }
    }

    report
}
