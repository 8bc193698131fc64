// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { common }) => commands::cmd_init(&common),
        Some(Commands::Install {
            archive,
            plugin,
            json,
            common,
        }) => commands::cmd_install(&archive, plugin, json, &common),
        Some(Commands::List { plugin, common }) => commands::cmd_list(plugin, &common),
        Some(Commands::Activate {
            slug,
            plugin,
            common,
        }) => commands::cmd_activate(&slug, plugin, &common),
        Some(Commands::Deactivate {
            slug,
            plugin,
            common,
        }) => commands::cmd_deactivate(&slug, plugin, &common),
        Some(Commands::Remove {
            slug,
            plugin,
            common,
        }) => commands::cmd_remove(&slug, plugin, &common),
        Some(Commands::Scan { plugin, common }) => commands::cmd_scan(plugin, &common),
        Some(Commands::Register {
            slug,
            plugin,
            common,
        }) => commands::cmd_register(&slug, plugin, &common),
        Some(Commands::ConfigSet {
            slug,
            json,
            plugin,
            common,
        }) => commands::cmd_config_set(&slug, &json, plugin, &common),
        None => {
            // No command provided, show help
            println!("cmspack v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'cmspack --help' for usage information");
            Ok(())
        }
    }
}
