// src/db/paths.rs
//! Centralized path derivation for cmspack directories

use std::path::{Path, PathBuf};

/// Get the directory containing the database
pub fn db_dir(db_path: &str) -> PathBuf {
    Path::new(db_path)
        .parent()
        .unwrap_or(Path::new("/var/lib/cmspack"))
        .to_path_buf()
}

/// Get the root directory holding installed themes and plugins
pub fn packages_dir(db_path: &str) -> PathBuf {
    std::env::var("CMSPACK_PACKAGES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| db_dir(db_path).join("packages"))
}

/// Get the temporary directory for extraction scratch trees
pub fn temp_dir(db_path: &str) -> PathBuf {
    db_dir(db_path).join("tmp")
}
