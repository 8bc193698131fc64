// src/db/migrations.rs
//! Database migration implementations
//!
//! Each function moves the catalog schema forward by exactly one version.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Initial schema - Version 1
///
/// Creates the package catalog:
/// - installed_packages: themes and plugins registered by the installer
pub fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE installed_packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_type TEXT NOT NULL CHECK(package_type IN ('theme', 'plugin')),
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            version TEXT NOT NULL DEFAULT '1.0',
            author TEXT NOT NULL DEFAULT '',
            main_file TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0 CHECK(is_active IN (0, 1)),
            config TEXT NOT NULL DEFAULT '{}',
            installed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(package_type, slug)
        );

        CREATE INDEX idx_installed_packages_slug ON installed_packages(slug);
        CREATE INDEX idx_installed_packages_active ON installed_packages(is_active);
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// Version 2 - keep `updated_at` current on every row update
pub fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Migrating to schema version 2");

    conn.execute_batch(
        "
        CREATE TRIGGER trg_installed_packages_updated_at
        AFTER UPDATE OF name, description, version, author, main_file, is_active, config
        ON installed_packages
        FOR EACH ROW
        BEGIN
            UPDATE installed_packages SET updated_at = CURRENT_TIMESTAMP WHERE id = OLD.id;
        END;
        ",
    )?;

    info!("Schema version 2 applied successfully");
    Ok(())
}
