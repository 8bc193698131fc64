// src/error.rs

//! Error types for cmspack
//!
//! A single error enum covers the ingestion pipeline, the package catalog and
//! the supporting filesystem/database plumbing. Command handlers wrap these in
//! `anyhow` for user-facing reporting.

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Upload is not one of the accepted archive formats
    #[error("Invalid package format: {0}")]
    InvalidFormat(String),

    /// Upload exceeds the configured size ceiling
    #[error("Package is too large: {size} bytes (maximum {limit} bytes)")]
    PackageTooLarge { size: u64, limit: u64 },

    /// Archive could not be unpacked
    #[error("Failed to extract package: {0}")]
    ExtractionFailed(String),

    /// No indicator file anywhere in the extracted tree
    #[error("Could not find package root: {0}")]
    NoPackageRootFound(String),

    /// Install directory already exists for this slug
    #[error("Package directory already exists: {0}")]
    SlugAlreadyInstalled(String),

    /// Catalog already holds a row with this slug
    #[error("Package '{0}' is already registered")]
    CatalogDuplicate(String),

    /// Active packages must be deactivated before deletion
    #[error("Cannot delete active package '{0}'. Deactivate it first.")]
    ActiveDeletionRefused(String),

    /// Disk or permission failure while writing the installed tree
    #[error("Failed to write installed package: {0}")]
    InstallWriteFailed(String),

    /// Package main file is not present on disk
    #[error("Main file not found for package '{0}'")]
    MainFileMissing(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Forced failure used to exercise cleanup paths
    #[error("Injected failure at stage {0}")]
    Injected(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(#[from] crate::compression::CompressionError),
}
