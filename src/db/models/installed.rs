// src/db/models/installed.rs

//! Installed package model - one catalog row per installed theme or plugin

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::str::FromStr;

/// Kind of catalog entry (theme or plugin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Theme,
    Plugin,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Theme => "theme",
            PackageType::Plugin => "plugin",
        }
    }

    /// Subdirectory of the packages root holding this type
    pub fn dir_name(&self) -> &'static str {
        match self {
            PackageType::Theme => "themes",
            PackageType::Plugin => "plugins",
        }
    }

    /// Slug used when a name reduces to nothing
    pub fn slug_fallback(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "theme" => Ok(PackageType::Theme),
            "plugin" => Ok(PackageType::Plugin),
            _ => Err(format!("Invalid package type: {s}")),
        }
    }
}

/// A catalog row for an installed package
#[derive(Debug, Clone, Serialize)]
pub struct InstalledPackage {
    pub id: Option<i64>,
    pub package_type: PackageType,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub version: String,
    pub author: String,
    /// Entry file relative to the package directory
    pub main_file: String,
    pub is_active: bool,
    /// JSON object with per-package settings
    pub config: String,
    pub installed_at: Option<String>,
    pub updated_at: Option<String>,
}

const COLUMNS: &str = "id, package_type, name, slug, description, version, author, main_file, is_active, config, installed_at, updated_at";

impl InstalledPackage {
    /// Create a new, inactive catalog entry
    pub fn new(package_type: PackageType, name: String, slug: String, main_file: String) -> Self {
        Self {
            id: None,
            package_type,
            name,
            slug,
            description: String::new(),
            version: "1.0".to_string(),
            author: String::new(),
            main_file,
            is_active: false,
            config: "{}".to_string(),
            installed_at: None,
            updated_at: None,
        }
    }

    /// Insert this package into the catalog
    ///
    /// New rows are always inactive regardless of `self.is_active`.
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO installed_packages (package_type, name, slug, description, version, author, main_file, is_active, config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
            params![
                self.package_type.as_str(),
                &self.name,
                &self.slug,
                &self.description,
                &self.version,
                &self.author,
                &self.main_file,
                &self.config,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.is_active = false;
        Ok(id)
    }

    /// Find a package by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM installed_packages WHERE id = ?1");
        let package = conn.query_row(&sql, [id], Self::from_row).optional()?;
        Ok(package)
    }

    /// Find a package by type and slug
    pub fn find_by_slug(
        conn: &Connection,
        package_type: PackageType,
        slug: &str,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM installed_packages WHERE package_type = ?1 AND slug = ?2"
        );
        let package = conn
            .query_row(&sql, params![package_type.as_str(), slug], Self::from_row)
            .optional()?;
        Ok(package)
    }

    /// Check whether a slug is already taken for this type
    pub fn slug_exists(conn: &Connection, package_type: PackageType, slug: &str) -> Result<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM installed_packages WHERE package_type = ?1 AND slug = ?2",
                params![package_type.as_str(), slug],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// List packages of one type, active first
    pub fn list(conn: &Connection, package_type: PackageType) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM installed_packages WHERE package_type = ?1
             ORDER BY is_active DESC, name"
        );
        let mut stmt = conn.prepare(&sql)?;
        let packages = stmt
            .query_map([package_type.as_str()], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    /// Set the active flag on a single row
    pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
        conn.execute(
            "UPDATE installed_packages SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(())
    }

    /// Clear the active flag on every package of a type
    pub fn deactivate_all(conn: &Connection, package_type: PackageType) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE installed_packages SET is_active = 0 WHERE package_type = ?1 AND is_active = 1",
            [package_type.as_str()],
        )?;
        Ok(changed)
    }

    /// Replace the config JSON of a row
    pub fn set_config(conn: &Connection, id: i64, config: &str) -> Result<()> {
        conn.execute(
            "UPDATE installed_packages SET config = ?1 WHERE id = ?2",
            params![config, id],
        )?;
        Ok(())
    }

    /// Delete a package row by ID
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM installed_packages WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to an InstalledPackage
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let type_str: String = row.get(1)?;
        let package_type = type_str.parse::<PackageType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(Self {
            id: Some(row.get(0)?),
            package_type,
            name: row.get(2)?,
            slug: row.get(3)?,
            description: row.get(4)?,
            version: row.get(5)?,
            author: row.get(6)?,
            main_file: row.get(7)?,
            is_active: row.get(8)?,
            config: row.get(9)?,
            installed_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}
