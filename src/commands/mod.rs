// src/commands/mod.rs
//! Command handlers for the cmspack CLI

mod ingest;
mod packages;

pub use ingest::{cmd_init, cmd_install};
pub use packages::{
    cmd_activate, cmd_config_set, cmd_deactivate, cmd_list, cmd_register, cmd_remove, cmd_scan,
};

use crate::cli::CommonArgs;
use anyhow::{Context, Result};
use cmspack::{IngestConfig, PackageType};

/// Theme unless `--plugin` was given
pub(crate) fn package_type(plugin: bool) -> PackageType {
    if plugin {
        PackageType::Plugin
    } else {
        PackageType::Theme
    }
}

/// Load cmspack.toml and fill unset directories from the database location
pub(crate) fn load_config(common: &CommonArgs) -> Result<IngestConfig> {
    let config = IngestConfig::load(common.config.as_deref())
        .context("Failed to load configuration")?;
    Ok(config.resolve_paths(&common.db_path))
}
