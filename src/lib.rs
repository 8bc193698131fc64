// src/lib.rs

//! cmspack: theme and plugin packages for a CMS admin back end
//!
//! Uploaded archives go through one pipeline: extract into a scratch tree,
//! find the package root, read its header metadata, rewrite template tags,
//! install under the packages directory and register it in the catalog.
//!
//! # Architecture
//!
//! - Catalog in SQLite, migrated explicitly at startup
//! - Installed packages are data; nothing here loads or runs them
//! - Scratch trees are per run and always removed
//! - Caller identity is an explicit [`AuthContext`]

pub mod auth;
pub mod catalog;
pub mod compression;
pub mod config;
pub mod db;
mod error;
pub mod filesystem;
pub mod ingest;

pub use auth::{AuthContext, Role};
pub use catalog::{AvailablePackage, Catalog};
pub use config::IngestConfig;
pub use db::models::{InstalledPackage, PackageType};
pub use error::{Error, Result};
pub use ingest::{
    IngestReport, Ingestor, InstallOutcome, PackageKind, PackageMetadata, PipelineStage,
    PipelineState, UploadedPackage,
};
