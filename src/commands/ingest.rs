// src/commands/ingest.rs
//! Database setup and archive installation

use super::{load_config, package_type};
use crate::cli::CommonArgs;
use anyhow::{Context, Result};
use cmspack::{AuthContext, Ingestor, UploadedPackage};
use std::path::Path;
use tracing::info;

/// Create the catalog database and package directories
pub fn cmd_init(common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    cmspack::db::init(&common.db_path).context("Failed to initialize catalog database")?;

    for package_type in [cmspack::PackageType::Theme, cmspack::PackageType::Plugin] {
        let dir = config.type_dir(package_type);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    println!("Catalog initialized at: {}", common.db_path);
    println!("Packages directory: {}", config.packages_root.display());
    Ok(())
}

/// Run an archive through the ingestion pipeline
pub fn cmd_install(archive: &Path, plugin: bool, json: bool, common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    let conn = cmspack::db::open(&common.db_path).context("Failed to open catalog database")?;
    let upload = UploadedPackage::from_path(archive)
        .with_context(|| format!("Failed to read {}", archive.display()))?;

    info!("Installing {} as a {}", archive.display(), package_type(plugin));
    let report = Ingestor::new(&config, &conn).ingest(
        &AuthContext::local_admin(),
        &upload,
        package_type(plugin),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(details) = &report.details {
        if let Some(message) = &report.message {
            println!("{}", message);
        }
        println!("  Slug: {}", details.theme_slug);
        println!(
            "  Kind: {}",
            if details.is_wordpress { "framework" } else { "static template" }
        );
        println!("  Files converted: {}", details.files_converted);
        for entry in details.conversions.entries() {
            println!("    - {}", entry);
        }
    }

    match report.failure {
        Some(e) => Err(anyhow::Error::new(e).context("Package installation failed")),
        None => Ok(()),
    }
}
