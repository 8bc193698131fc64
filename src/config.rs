// src/config.rs

//! Ingestion settings
//!
//! Loaded from `/etc/cmspack/cmspack.toml` (or `--config`). Every key is
//! optional; a missing file yields the built-in defaults.
//!
//! ```toml
//! packages_root = "/srv/cms/packages"
//! scratch_dir = "/var/tmp"
//! theme_max_upload_bytes = 104857600
//! plugin_max_upload_bytes = 52428800
//! theme_extensions = ["zip", "tar", "tar.gz", "tgz", "gz"]
//! plugin_extensions = ["zip"]
//! base_url = "/cms"
//! ```

use crate::db::models::PackageType;
use crate::db::paths;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default path for the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cmspack/cmspack.toml";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Directory holding `themes/` and `plugins/`; empty means next to the database
    pub packages_root: PathBuf,
    /// Parent directory for per-run scratch trees; empty means next to the database
    pub scratch_dir: PathBuf,
    pub theme_max_upload_bytes: u64,
    pub plugin_max_upload_bytes: u64,
    /// Accepted upload extensions for themes, lowercase, without the dot
    pub theme_extensions: Vec<String>,
    pub plugin_extensions: Vec<String>,
    /// URL path the CMS is served under; baked into generated preambles
    pub base_url: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            packages_root: PathBuf::new(),
            scratch_dir: PathBuf::new(),
            theme_max_upload_bytes: 100 * MIB,
            plugin_max_upload_bytes: 50 * MIB,
            theme_extensions: ["zip", "tar", "tar.gz", "tgz", "gz"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            plugin_extensions: vec!["zip".to_string()],
            base_url: "/cms".to_string(),
        }
    }
}

impl IngestConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.theme_max_upload_bytes == 0 || self.plugin_max_upload_bytes == 0 {
            return Err(Error::Config("Upload ceilings must be non-zero".to_string()));
        }
        if self.theme_extensions.is_empty() || self.plugin_extensions.is_empty() {
            return Err(Error::Config(
                "At least one archive extension must be accepted".to_string(),
            ));
        }
        if !self.base_url.is_empty() && !self.base_url.starts_with('/') {
            return Err(Error::Config(format!(
                "base_url must start with '/': {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Fill unset directories from the database location
    pub fn resolve_paths(mut self, db_path: &str) -> Self {
        if self.packages_root.as_os_str().is_empty() {
            self.packages_root = paths::packages_dir(db_path);
        }
        if self.scratch_dir.as_os_str().is_empty() {
            self.scratch_dir = paths::temp_dir(db_path);
        }
        self
    }

    /// Point both data directories under one root
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            packages_root: root.join("packages"),
            scratch_dir: root.join("tmp"),
            ..Self::default()
        }
    }

    pub fn max_upload_bytes(&self, package_type: PackageType) -> u64 {
        match package_type {
            PackageType::Theme => self.theme_max_upload_bytes,
            PackageType::Plugin => self.plugin_max_upload_bytes,
        }
    }

    pub fn accepted_extensions(&self, package_type: PackageType) -> &[String] {
        match package_type {
            PackageType::Theme => &self.theme_extensions,
            PackageType::Plugin => &self.plugin_extensions,
        }
    }

    /// Directory holding installed packages of one type
    pub fn type_dir(&self, package_type: PackageType) -> PathBuf {
        self.packages_root.join(package_type.dir_name())
    }
}
