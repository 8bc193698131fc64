// src/filesystem/mod.rs

//! Filesystem operations for cmspack
//!
//! This module provides:
//! - Path sanitization for untrusted archive entries
//! - Tree copy from staging into the packages directory
//! - Best-effort, deepest-first tree removal for scratch cleanup

pub mod path;
mod tree;

pub use tree::{RemovalReport, copy_tree, remove_tree_best_effort};
