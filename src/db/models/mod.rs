// src/db/models/mod.rs

//! Data models for cmspack database entities
//!
//! Each struct corresponds to a catalog table and provides methods for
//! creating, reading, updating, and deleting records.

mod installed;

pub use installed::{InstalledPackage, PackageType};
