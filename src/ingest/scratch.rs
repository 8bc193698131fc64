// src/ingest/scratch.rs

//! Per-run scratch workspace
//!
//! A scratch tree is owned by exactly one pipeline run. It is removed by
//! [`ScratchTree::cleanup`] and again, as a backstop, when dropped.

use crate::error::Result;
use crate::filesystem::{RemovalReport, remove_tree_best_effort};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct ScratchTree {
    root: PathBuf,
    cleaned: bool,
}

impl ScratchTree {
    /// Create `<base>/<prefix>_<uuid>` along with its `extracted/` and `staging/` areas
    pub fn create(base: &Path, prefix: &str) -> Result<Self> {
        let tree = Self {
            root: base.join(format!("{}_{}", prefix, Uuid::new_v4().simple())),
            cleaned: false,
        };
        // A half-created tree is removed by Drop on the error path
        std::fs::create_dir_all(tree.extract_dir())?;
        std::fs::create_dir_all(tree.staging_dir())?;
        debug!("Created scratch tree {}", tree.root.display());
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the archive is unpacked
    pub fn extract_dir(&self) -> PathBuf {
        self.root.join("extracted")
    }

    /// Where transformed files are assembled before install
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// Remove the whole tree, deepest entries first
    ///
    /// Never fails; problems are logged and reported. Calling it again after
    /// a clean removal is a no-op.
    pub fn cleanup(&mut self) -> RemovalReport {
        if self.cleaned {
            return RemovalReport::default();
        }

        let report = remove_tree_best_effort(&self.root);
        if report.is_clean() {
            self.cleaned = true;
            debug!(
                "Removed scratch tree {} ({} files, {} dirs)",
                self.root.display(),
                report.files_removed,
                report.dirs_removed
            );
        } else {
            warn!(
                "Scratch tree {} left behind after {} removal failures",
                self.root.display(),
                report.failures
            );
        }
        report
    }
}

impl Drop for ScratchTree {
    fn drop(&mut self) {
        self.cleanup();
    }
}
