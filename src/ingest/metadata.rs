// src/ingest/metadata.rs

//! Header-comment metadata
//!
//! Manifests carry `Key: value` lines inside a comment block:
//!
//! ```text
//! /*
//! Theme Name: Dusk
//! Version: 2.1
//! */
//! ```
//!
//! Reading never fails; anything missing falls back to a default.

use crate::ingest::classify::PackageRoot;
use crate::ingest::profile::PackageProfile;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

pub const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
}

/// First value for `key` in a header block, matched case-insensitively at line start
///
/// Leading comment decoration (`*`, `#`, `//`) is allowed before the key and
/// a trailing `*/` is dropped from the value.
pub fn header_value(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?im)^[\s*#/]*{}\s*:[ \t]*(.+)$", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(text)?;
    let value = captures[1].trim();
    let value = value.strip_suffix("*/").unwrap_or(value).trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl PackageMetadata {
    /// Parse header keys, returning the declared name separately
    fn parse(text: &str, profile: &PackageProfile) -> (Option<String>, Self) {
        let name = header_value(text, profile.name_tag);
        let metadata = Self {
            name: name.clone().unwrap_or_default(),
            description: header_value(text, "Description")
                .unwrap_or_else(|| profile.default_description.to_string()),
            version: header_value(text, "Version").unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            author: header_value(text, "Author").unwrap_or_default(),
        };
        (name, metadata)
    }

    /// Metadata from manifest text, with `fallback_name` used when no name is declared
    pub fn from_manifest(text: &str, profile: &PackageProfile, fallback_name: &str) -> Self {
        let (name, mut metadata) = Self::parse(text, profile);
        if name.is_none() {
            metadata.name = fallback_name.to_string();
        }
        metadata
    }

    /// All-defaults metadata for a package with no manifest
    pub fn defaults(profile: &PackageProfile, name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: profile.default_description.to_string(),
            version: DEFAULT_VERSION.to_string(),
            author: String::new(),
        }
    }

    /// Read metadata for a located package root
    pub fn read(root: &PackageRoot, profile: &PackageProfile) -> Self {
        let fallback = fallback_name(root, profile);

        let Some(manifest) = &root.manifest else {
            debug!("No manifest, using defaults for {}", fallback);
            return Self::defaults(profile, &fallback);
        };

        match std::fs::read(manifest) {
            Ok(bytes) => Self::from_manifest(&String::from_utf8_lossy(&bytes), profile, &fallback),
            Err(e) => {
                warn!("Could not read manifest {}: {}", manifest.display(), e);
                Self::defaults(profile, &fallback)
            }
        }
    }

    /// Header block written into a created or repaired manifest
    pub fn header_block(&self, profile: &PackageProfile) -> String {
        let mut header = String::from("/*\n");
        header.push_str(&format!("{}: {}\n", profile.name_tag, self.name));
        header.push_str(&format!("Description: {}\n", self.description));
        header.push_str(&format!("Version: {}\n", self.version));
        if !self.author.is_empty() {
            header.push_str(&format!("Author: {}\n", self.author));
        }
        header.push_str("*/\n\n");
        header
    }
}

/// Humanised root directory name, or the profile default when the root is
/// the scratch extraction directory itself
fn fallback_name(root: &PackageRoot, profile: &PackageProfile) -> String {
    if root.depth == 0 {
        return profile.default_name.to_string();
    }
    root.path
        .file_name()
        .map(|n| humanize(&n.to_string_lossy()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| profile.default_name.to_string())
}

/// `my-cool_theme` -> `My Cool Theme`
pub fn humanize(dir_name: &str) -> String {
    dir_name
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::profile::{PLUGIN_PROFILE, THEME_PROFILE};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_header_parsing() {
        let css = "/*\nTheme Name: Dusk\n * Description: A dark theme */\nVersion: 2.1\nAuthor:   Jo  \n*/";
        let meta = PackageMetadata::from_manifest(css, &THEME_PROFILE, "fallback");
        assert_eq!(meta.name, "Dusk");
        assert_eq!(meta.description, "A dark theme");
        assert_eq!(meta.version, "2.1");
        assert_eq!(meta.author, "Jo");
    }

    #[test]
    fn test_first_match_wins() {
        let text = "theme name: First\nTheme Name: Second\n";
        assert_eq!(header_value(text, "Theme Name").as_deref(), Some("First"));
    }

    #[test]
    fn test_key_must_start_line() {
        // "Version" embedded mid-line is not a header
        let text = "body { /* see Version: 3 */ }\n";
        assert_eq!(header_value(text, "Version"), None);
        let meta = PackageMetadata::from_manifest(text, &THEME_PROFILE, "Fallback");
        assert_eq!(meta.version, "1.0");
        assert_eq!(meta.name, "Fallback");
        assert_eq!(meta.description, "Theme converted from template");
    }

    #[test]
    fn test_plugin_header() {
        let php = "<?php\n/**\n * Plugin Name: SEO Tools\n * Version: 0.3\n */";
        let meta = PackageMetadata::from_manifest(php, &PLUGIN_PROFILE, "x");
        assert_eq!(meta.name, "SEO Tools");
        assert_eq!(meta.version, "0.3");
        assert_eq!(meta.description, "");
    }

    #[test]
    fn test_read_without_manifest_uses_directory_name() {
        let temp = TempDir::new().unwrap();
        let root = PackageRoot {
            path: temp.path().join("my-cool_theme"),
            depth: 1,
            manifest: None,
        };
        let meta = PackageMetadata::read(&root, &THEME_PROFILE);
        assert_eq!(meta.name, "My Cool Theme");
        assert_eq!(meta.version, "1.0");
    }

    #[test]
    fn test_read_at_scratch_root_uses_default_name() {
        let root = PackageRoot {
            path: PathBuf::from("/tmp/theme_convert_abc/extracted"),
            depth: 0,
            manifest: Some(PathBuf::from("/nonexistent/style.css")),
        };
        let meta = PackageMetadata::read(&root, &THEME_PROFILE);
        assert_eq!(meta.name, "Converted Theme");
    }

    #[test]
    fn test_header_block() {
        let meta = PackageMetadata::defaults(&THEME_PROFILE, "Dusk");
        let block = meta.header_block(&THEME_PROFILE);
        assert!(block.starts_with("/*\nTheme Name: Dusk\n"));
        assert!(!block.contains("Author:"));
        assert_eq!(header_value(&block, "Theme Name").as_deref(), Some("Dusk"));
    }
}
