// src/cli/mod.rs
//! CLI definitions for cmspack
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! - `install` - Run an uploaded archive through the ingestion pipeline
//! - `list` / `scan` - Show registered packages / package directories on disk
//! - `activate` / `deactivate` / `remove` - Catalog lifecycle
//! - `register` - Add an existing package directory to the catalog
//! - `config-set` - Replace a package's JSON settings

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cmspack")]
#[command(version)]
#[command(about = "Install and manage CMS themes and plugins", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Path to the catalog database
    #[arg(short, long, default_value = "/var/lib/cmspack/cmspack.db")]
    pub db_path: String,

    /// Path to cmspack.toml (default: /etc/cmspack/cmspack.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the catalog database
    Init {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Install a theme or plugin archive
    Install {
        /// Path to the archive (.zip, .tar, .tar.gz, .tgz)
        archive: PathBuf,

        /// Install as a plugin instead of a theme
        #[arg(long)]
        plugin: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List registered packages
    List {
        /// List plugins instead of themes
        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Activate a package
    Activate {
        slug: String,

        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Deactivate a package
    Deactivate {
        slug: String,

        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove a package from the catalog (files stay on disk)
    Remove {
        slug: String,

        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show package directories on disk and whether they are registered
    Scan {
        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Register a package directory that is already on disk
    Register {
        slug: String,

        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Replace a package's settings with a JSON object
    ConfigSet {
        slug: String,

        /// JSON object, e.g. '{"primary_color": "#112233"}'
        json: String,

        #[arg(long)]
        plugin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}
