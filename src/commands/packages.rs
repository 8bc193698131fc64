// src/commands/packages.rs
//! Catalog lifecycle commands

use super::{load_config, package_type};
use crate::cli::CommonArgs;
use anyhow::{Context, Result};
use cmspack::{AuthContext, Catalog, PackageType};

fn open(common: &CommonArgs) -> Result<(rusqlite::Connection, cmspack::IngestConfig)> {
    let config = load_config(common)?;
    let conn = cmspack::db::open(&common.db_path).context("Failed to open catalog database")?;
    Ok((conn, config))
}

fn lookup_id(catalog: &Catalog, package_type: PackageType, slug: &str) -> Result<i64> {
    let package = catalog
        .get(package_type, slug)
        .with_context(|| format!("{} '{}' is not installed", package_type, slug))?;
    package
        .id
        .ok_or_else(|| anyhow::anyhow!("Package '{}' has no ID", slug))
}

/// List registered packages, active first
pub fn cmd_list(plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let catalog = Catalog::new(&mut conn, &config);
    let packages = catalog.list(package_type(plugin))?;

    if packages.is_empty() {
        println!("No {}s installed", package_type(plugin));
        return Ok(());
    }

    for package in &packages {
        let status = if package.is_active { "active" } else { "inactive" };
        let health = if catalog.is_healthy(package) { "" } else { " [missing files]" };
        println!(
            "{} {} ({}) - {}{}",
            package.slug, package.version, package.name, status, health
        );
    }
    Ok(())
}

pub fn cmd_activate(slug: &str, plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let mut catalog = Catalog::new(&mut conn, &config);
    let id = lookup_id(&catalog, package_type(plugin), slug)?;

    let package = catalog.activate(&AuthContext::local_admin(), id)?;
    println!("Activated {}", package.slug);
    Ok(())
}

pub fn cmd_deactivate(slug: &str, plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let mut catalog = Catalog::new(&mut conn, &config);
    let id = lookup_id(&catalog, package_type(plugin), slug)?;

    let package = catalog.deactivate(&AuthContext::local_admin(), id)?;
    println!("Deactivated {}", package.slug);
    Ok(())
}

/// Drop a catalog row; the package directory is left in place
pub fn cmd_remove(slug: &str, plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let mut catalog = Catalog::new(&mut conn, &config);
    let id = lookup_id(&catalog, package_type(plugin), slug)?;

    let package = catalog.delete(&AuthContext::local_admin(), id)?;
    println!("Removed {} from the catalog", package.slug);
    println!(
        "  Files remain in {} and can be deleted manually",
        catalog.package_dir(&package).display()
    );
    Ok(())
}

/// Show package directories on disk
pub fn cmd_scan(plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let catalog = Catalog::new(&mut conn, &config);
    let found = catalog.scan_packages_dir(package_type(plugin))?;

    if found.is_empty() {
        println!("No {} directories found", package_type(plugin));
        return Ok(());
    }

    for available in &found {
        println!(
            "{} {} ({}) main={}{}",
            available.slug,
            available.metadata.version,
            available.metadata.name,
            available.main_file,
            if available.registered { "" } else { " [not registered]" }
        );
    }
    Ok(())
}

pub fn cmd_register(slug: &str, plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let mut catalog = Catalog::new(&mut conn, &config);

    let record =
        catalog.register_from_directory(&AuthContext::local_admin(), package_type(plugin), slug)?;
    println!("Registered {} ({})", record.slug, record.name);
    Ok(())
}

pub fn cmd_config_set(slug: &str, json: &str, plugin: bool, common: &CommonArgs) -> Result<()> {
    let (mut conn, config) = open(common)?;
    let mut catalog = Catalog::new(&mut conn, &config);
    let id = lookup_id(&catalog, package_type(plugin), slug)?;

    catalog
        .update_config(&AuthContext::local_admin(), id, json)
        .with_context(|| format!("Failed to update config for '{}'", slug))?;
    println!("Updated config for {}", slug);
    Ok(())
}
