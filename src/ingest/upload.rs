// src/ingest/upload.rs

//! Uploaded archive validation
//!
//! Size and extension are checked before anything is written to disk, so a
//! rejected upload never creates a scratch tree.

use crate::config::IngestConfig;
use crate::db::models::PackageType;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// An archive submitted by an admin
#[derive(Debug, Clone)]
pub struct UploadedPackage {
    /// Where the uploaded bytes currently live
    pub path: PathBuf,
    /// Client-supplied file name, used for extension checks
    pub file_name: String,
    /// Declared size in bytes
    pub size: u64,
}

impl UploadedPackage {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            size,
        }
    }

    /// Describe a file already on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::InvalidPath(format!("No file name in {}", path.display())))?;
        Ok(Self::new(path, file_name, metadata.len()))
    }

    /// Lowercased extension matched against `accepted`, longest match first
    ///
    /// `theme.tar.gz` matches `tar.gz` before `gz`.
    pub fn matching_extension<'a>(&self, accepted: &'a [String]) -> Option<&'a str> {
        let lower = self.file_name.to_ascii_lowercase();
        accepted
            .iter()
            .filter(|ext| lower.ends_with(&format!(".{}", ext.to_ascii_lowercase())))
            .max_by_key(|ext| ext.len())
            .map(|ext| ext.as_str())
    }

    /// Enforce the size ceiling and accepted formats for `package_type`
    pub fn validate(&self, config: &IngestConfig, package_type: PackageType) -> Result<()> {
        let limit = config.max_upload_bytes(package_type);
        if self.size > limit {
            return Err(Error::PackageTooLarge {
                size: self.size,
                limit,
            });
        }

        let accepted = config.accepted_extensions(package_type);
        if self.matching_extension(accepted).is_none() {
            return Err(Error::InvalidFormat(format!(
                "{} (accepted: {})",
                self.file_name,
                accepted.join(", ")
            )));
        }

        Ok(())
    }
}
