// src/ingest/profile.rs

//! Per-type ingestion rules
//!
//! Themes and plugins share one pipeline; what differs is how the package
//! root is recognised, which file carries the header block, and whether file
//! contents are rewritten.

use crate::db::models::PackageType;

/// How a directory is recognised as a package root candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorRule {
    /// Any file with one of these exact names
    FileNames(&'static [&'static str]),
    /// A file with this extension whose text contains `tag`
    HeaderTag {
        extension: &'static str,
        tag: &'static str,
    },
}

/// Whether the content transformer may rewrite files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Apply the rule tables to scripts and markup
    Rewrite,
    /// Copy everything verbatim (still honouring the skip list)
    CopyOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct PackageProfile {
    pub package_type: PackageType,
    pub indicator: IndicatorRule,
    /// Accepted at the scratch root when no indicator matched anywhere
    pub default_index_files: &'static [&'static str],
    /// Fixed manifest name; `None` when the classifier picks the header file
    pub manifest_file: Option<&'static str>,
    /// Header key carrying the display name (`Theme Name`)
    pub name_tag: &'static str,
    pub default_name: &'static str,
    pub default_description: &'static str,
    /// Entry file every installed package must have; `None` means the manifest
    pub entry_file: Option<&'static str>,
    /// Candidates converted into the entry file when it is missing
    pub alternative_entries: &'static [&'static str],
    pub transform: TransformPolicy,
    /// JSON stored in the catalog `config` column at install
    pub default_config: &'static str,
    /// Prefix for scratch directory names
    pub scratch_prefix: &'static str,
}

pub const THEME_PROFILE: PackageProfile = PackageProfile {
    package_type: PackageType::Theme,
    indicator: IndicatorRule::FileNames(&[
        "style.css",
        "index.php",
        "index.html",
        "header.php",
        "footer.php",
    ]),
    default_index_files: &["index.html", "index.php"],
    manifest_file: Some("style.css"),
    name_tag: "Theme Name",
    default_name: "Converted Theme",
    default_description: "Theme converted from template",
    entry_file: Some("index.php"),
    alternative_entries: &["home.php", "index.html", "home.html"],
    transform: TransformPolicy::Rewrite,
    default_config: r##"{"primary_color":"#0ea5e9","secondary_color":"#64748b"}"##,
    scratch_prefix: "theme_convert",
};

pub const PLUGIN_PROFILE: PackageProfile = PackageProfile {
    package_type: PackageType::Plugin,
    indicator: IndicatorRule::HeaderTag {
        extension: "php",
        tag: "Plugin Name:",
    },
    default_index_files: &[],
    manifest_file: None,
    name_tag: "Plugin Name",
    default_name: "Unknown Plugin",
    default_description: "",
    entry_file: None,
    alternative_entries: &[],
    transform: TransformPolicy::CopyOnly,
    default_config: "{}",
    scratch_prefix: "plugin_upload",
};

impl PackageProfile {
    pub fn for_type(package_type: PackageType) -> &'static PackageProfile {
        match package_type {
            PackageType::Theme => &THEME_PROFILE,
            PackageType::Plugin => &PLUGIN_PROFILE,
        }
    }

    /// Header tag as it appears in files (`Theme Name:`)
    pub fn name_header(&self) -> String {
        format!("{}:", self.name_tag)
    }
}
