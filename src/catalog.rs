// src/catalog.rs

//! Lifecycle operations on installed packages
//!
//! Activation, deactivation, deletion and config updates are single-row
//! updates, except theme activation which also clears every other active
//! theme inside the same transaction. Deleting a row never touches the
//! package's files.

use crate::auth::AuthContext;
use crate::config::IngestConfig;
use crate::db::{self, models::InstalledPackage, models::PackageType};
use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_dir_name;
use crate::ingest::metadata::PackageMetadata;
use crate::ingest::profile::PackageProfile;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A package directory found on disk
#[derive(Debug, Clone, Serialize)]
pub struct AvailablePackage {
    pub package_type: PackageType,
    pub slug: String,
    pub metadata: PackageMetadata,
    pub main_file: String,
    pub path: PathBuf,
    /// Whether the catalog already has a row for this slug
    pub registered: bool,
}

pub struct Catalog<'a> {
    conn: &'a mut Connection,
    config: &'a IngestConfig,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a mut Connection, config: &'a IngestConfig) -> Self {
        Self { conn, config }
    }

    pub fn list(&self, package_type: PackageType) -> Result<Vec<InstalledPackage>> {
        InstalledPackage::list(self.conn, package_type)
    }

    /// Look up a package by slug, failing with `NotFound`
    pub fn get(&self, package_type: PackageType, slug: &str) -> Result<InstalledPackage> {
        InstalledPackage::find_by_slug(self.conn, package_type, slug)?
            .ok_or_else(|| Error::NotFound(format!("{} '{}'", package_type, slug)))
    }

    fn get_by_id(&self, id: i64) -> Result<InstalledPackage> {
        InstalledPackage::find_by_id(self.conn, id)?
            .ok_or_else(|| Error::NotFound(format!("package id {}", id)))
    }

    /// Directory a catalog row points at
    pub fn package_dir(&self, package: &InstalledPackage) -> PathBuf {
        self.config.type_dir(package.package_type).join(&package.slug)
    }

    /// Whether the row's main file is present on disk
    pub fn is_healthy(&self, package: &InstalledPackage) -> bool {
        self.package_dir(package).join(&package.main_file).is_file()
    }

    /// Mark a package active
    ///
    /// The main file must exist. Only one theme may be active, so activating
    /// a theme deactivates the others in the same transaction.
    pub fn activate(&mut self, auth: &AuthContext, id: i64) -> Result<InstalledPackage> {
        auth.require_admin()?;
        let mut package = self.get_by_id(id)?;
        if !self.is_healthy(&package) {
            return Err(Error::MainFileMissing(package.slug));
        }

        match package.package_type {
            PackageType::Theme => {
                db::transaction(self.conn, |tx| {
                    let cleared = InstalledPackage::deactivate_all(tx, PackageType::Theme)?;
                    debug!("Deactivated {} theme(s)", cleared);
                    InstalledPackage::set_active(tx, id, true)
                })?;
            }
            PackageType::Plugin => InstalledPackage::set_active(self.conn, id, true)?,
        }

        info!("Activated {} '{}'", package.package_type, package.slug);
        package.is_active = true;
        Ok(package)
    }

    /// Mark a package inactive; deactivating an inactive package is a no-op
    pub fn deactivate(&mut self, auth: &AuthContext, id: i64) -> Result<InstalledPackage> {
        auth.require_admin()?;
        let mut package = self.get_by_id(id)?;
        InstalledPackage::set_active(self.conn, id, false)?;
        info!("Deactivated {} '{}'", package.package_type, package.slug);
        package.is_active = false;
        Ok(package)
    }

    /// Remove a catalog row; active packages are refused
    pub fn delete(&mut self, auth: &AuthContext, id: i64) -> Result<InstalledPackage> {
        auth.require_admin()?;
        let package = self.get_by_id(id)?;
        if package.is_active {
            return Err(Error::ActiveDeletionRefused(package.slug));
        }

        InstalledPackage::delete(self.conn, id)?;
        info!(
            "Removed {} '{}' from the catalog; files remain in {}",
            package.package_type,
            package.slug,
            self.package_dir(&package).display()
        );
        Ok(package)
    }

    /// Replace a package's settings with a JSON object
    pub fn update_config(&mut self, auth: &AuthContext, id: i64, json: &str) -> Result<()> {
        auth.require_admin()?;
        let package = self.get_by_id(id)?;
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(Error::InvalidFormat(
                "package config must be a JSON object".to_string(),
            ));
        }

        InstalledPackage::set_config(self.conn, id, &value.to_string())?;
        debug!("Updated config for '{}'", package.slug);
        Ok(())
    }

    /// List package directories on disk with their parsed headers
    pub fn scan_packages_dir(&self, package_type: PackageType) -> Result<Vec<AvailablePackage>> {
        let type_dir = self.config.type_dir(package_type);
        if !type_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&type_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut found = Vec::new();
        for dir in dirs {
            let Some(slug) = dir.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if let Some(mut available) = inspect_directory(&dir, &slug, package_type) {
                available.registered =
                    InstalledPackage::slug_exists(self.conn, package_type, &slug)?;
                found.push(available);
            }
        }
        Ok(found)
    }

    /// Register a package directory that is already on disk
    pub fn register_from_directory(
        &mut self,
        auth: &AuthContext,
        package_type: PackageType,
        slug: &str,
    ) -> Result<InstalledPackage> {
        auth.require_admin()?;
        let slug = sanitize_dir_name(slug)?;
        let dir = self.config.type_dir(package_type).join(&slug);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("{}", dir.display())));
        }

        if InstalledPackage::slug_exists(self.conn, package_type, &slug)? {
            return Err(Error::CatalogDuplicate(slug));
        }

        let available = inspect_directory(&dir, &slug, package_type)
            .ok_or_else(|| Error::NotFound(format!("No main file in {}", dir.display())))?;

        let profile = PackageProfile::for_type(package_type);
        let mut record = InstalledPackage::new(
            package_type,
            available.metadata.name,
            slug,
            available.main_file,
        );
        record.description = available.metadata.description;
        record.version = available.metadata.version;
        record.author = available.metadata.author;
        record.config = profile.default_config.to_string();
        record.insert(self.conn)?;

        info!("Registered existing {} '{}'", package_type, record.slug);
        Ok(record)
    }
}

/// Main file and header of one package directory, if it looks like a package
fn inspect_directory(dir: &Path, slug: &str, package_type: PackageType) -> Option<AvailablePackage> {
    let profile = PackageProfile::for_type(package_type);

    let (main_file, header_file) = match package_type {
        PackageType::Theme => {
            let main = profile.entry_file.unwrap_or("index.php");
            let manifest = profile.manifest_file.unwrap_or("style.css");
            if !dir.join(main).is_file() && !dir.join(manifest).is_file() {
                return None;
            }
            (main.to_string(), dir.join(manifest))
        }
        PackageType::Plugin => {
            let main = plugin_main_file(dir, slug)?;
            let header = dir.join(&main);
            (main, header)
        }
    };

    let metadata = match std::fs::read(&header_file) {
        Ok(bytes) => PackageMetadata::from_manifest(&String::from_utf8_lossy(&bytes), profile, slug),
        Err(_) => PackageMetadata::defaults(profile, slug),
    };

    Some(AvailablePackage {
        package_type,
        slug: slug.to_string(),
        metadata,
        main_file,
        path: dir.to_path_buf(),
        registered: false,
    })
}

/// `<slug>.php`, then `index.php`, then the first top-level script by name
fn plugin_main_file(dir: &Path, slug: &str) -> Option<String> {
    for candidate in [format!("{}.php", slug), "index.php".to_string()] {
        if dir.join(&candidate).is_file() {
            return Some(candidate);
        }
    }

    let mut scripts: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.to_ascii_lowercase().ends_with(".php"))
        .collect();
    scripts.sort();
    scripts.into_iter().next()
}
