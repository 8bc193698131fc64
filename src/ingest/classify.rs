// src/ingest/classify.rs

//! Package root detection and kind classification
//!
//! The root is the shallowest directory holding an indicator file. Kind
//! detection is a heuristic: a miss only changes which rewrite rules apply.

use crate::error::{Error, Result};
use crate::filesystem::path::relative_depth;
use crate::ingest::profile::{IndicatorRule, PackageProfile};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Classification of a package's source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageKind {
    /// Plain HTML/CSS template
    StaticTemplate,
    /// WordPress-style theme or plugin
    FrameworkThemeOrPlugin,
}

impl PackageKind {
    pub fn is_framework(&self) -> bool {
        matches!(self, PackageKind::FrameworkThemeOrPlugin)
    }
}

/// The directory treated as the top of the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    pub path: PathBuf,
    /// Depth below the scratch extraction directory (0 = the directory itself)
    pub depth: usize,
    /// Header-carrying file, when one exists
    pub manifest: Option<PathBuf>,
}

/// Bootstrap file whose presence marks a framework theme
const HOOK_FILE: &str = "functions.php";

static FRAMEWORK_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(get_header|wp_nav_menu|the_title|the_content|bloginfo|get_option|wp_head|wp_footer)\s*\(",
    )
    .expect("framework call pattern is valid")
});

/// Locate the package root under `extract_dir`
///
/// Walks the full tree (sorted by file name, so the walk order is stable)
/// and keeps the shallowest directory containing an indicator; ties go to
/// the first one encountered.
pub fn find_package_root(extract_dir: &Path, profile: &PackageProfile) -> Result<PackageRoot> {
    let mut best: Option<(usize, PathBuf, PathBuf)> = None;

    for entry in WalkDir::new(extract_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() || !matches_indicator(entry.path(), profile) {
            continue;
        }

        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let depth = relative_depth(extract_dir, dir).unwrap_or(usize::MAX);
        debug!("Indicator {} at depth {}", entry.path().display(), depth);

        if best.as_ref().is_none_or(|(best_depth, _, _)| depth < *best_depth) {
            best = Some((depth, dir.to_path_buf(), entry.path().to_path_buf()));
        }
    }

    if let Some((depth, path, indicator)) = best {
        let manifest = match profile.manifest_file {
            Some(name) => Some(path.join(name)).filter(|p| p.is_file()),
            None => Some(indicator),
        };
        info!("Package root: {} (depth {})", path.display(), depth);
        return Ok(PackageRoot {
            path,
            depth,
            manifest,
        });
    }

    if profile
        .default_index_files
        .iter()
        .any(|name| extract_dir.join(name).is_file())
    {
        return Ok(PackageRoot {
            path: extract_dir.to_path_buf(),
            depth: 0,
            manifest: None,
        });
    }

    Err(Error::NoPackageRootFound(match profile.indicator {
        IndicatorRule::FileNames(names) => {
            format!("package must contain one of: {}", names.join(", "))
        }
        IndicatorRule::HeaderTag { extension, tag } => {
            format!("package must contain a .{} file with a \"{}\" header", extension, tag)
        }
    }))
}

fn matches_indicator(path: &Path, profile: &PackageProfile) -> bool {
    match profile.indicator {
        IndicatorRule::FileNames(names) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| names.contains(&n)),
        IndicatorRule::HeaderTag { extension, tag } => {
            has_extension(path, extension)
                && std::fs::read(path)
                    .map(|bytes| contains_ignore_case(&String::from_utf8_lossy(&bytes), tag))
                    .unwrap_or(false)
        }
    }
}

/// Decide whether the package is framework-style or a static template
pub fn detect_kind(root: &PackageRoot, profile: &PackageProfile) -> PackageKind {
    if root.path.join(HOOK_FILE).is_file() {
        debug!("Found {}, treating as framework package", HOOK_FILE);
        return PackageKind::FrameworkThemeOrPlugin;
    }

    if let Some(manifest) = &root.manifest
        && let Ok(bytes) = std::fs::read(manifest)
        && contains_ignore_case(&String::from_utf8_lossy(&bytes), &profile.name_header())
    {
        debug!("Manifest {} carries a framework header", manifest.display());
        return PackageKind::FrameworkThemeOrPlugin;
    }

    let Ok(entries) = std::fs::read_dir(&root.path) else {
        return PackageKind::StaticTemplate;
    };
    let mut scripts: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, "php"))
        .collect();
    scripts.sort();

    for script in scripts {
        if let Ok(bytes) = std::fs::read(&script)
            && FRAMEWORK_CALL.is_match(&String::from_utf8_lossy(&bytes))
        {
            debug!("Framework call found in {}", script.display());
            return PackageKind::FrameworkThemeOrPlugin;
        }
    }

    PackageKind::StaticTemplate
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::profile::{PLUGIN_PROFILE, THEME_PROFILE};
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_shallowest_indicator_wins() {
        let temp = TempDir::new().unwrap();
        // Indicators at depths 3, 1 and 2; names chosen so the deep ones sort first
        touch(temp.path(), "a/b/c/index.html", "");
        touch(temp.path(), "z/style.css", "");
        touch(temp.path(), "m/n/footer.php", "");

        let root = find_package_root(temp.path(), &THEME_PROFILE).unwrap();
        assert_eq!(root.path, temp.path().join("z"));
        assert_eq!(root.depth, 1);
        assert_eq!(root.manifest, Some(temp.path().join("z/style.css")));
    }

    #[test]
    fn test_depth_tie_uses_first_encountered() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "beta/index.html", "");
        touch(temp.path(), "alpha/index.html", "");

        let root = find_package_root(temp.path(), &THEME_PROFILE).unwrap();
        assert_eq!(root.path, temp.path().join("alpha"));
        assert_eq!(root.manifest, None);
    }

    #[test]
    fn test_no_root_found() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "docs/readme.txt", "hello");

        let err = find_package_root(temp.path(), &THEME_PROFILE).unwrap_err();
        assert!(matches!(err, Error::NoPackageRootFound(_)));
    }

    #[test]
    fn test_plugin_root_uses_header_file() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "seo/includes/helpers.php", "<?php // helpers");
        touch(
            temp.path(),
            "seo/seo-tools.php",
            "<?php\n/*\nPlugin Name: SEO Tools\n*/",
        );

        let root = find_package_root(temp.path(), &PLUGIN_PROFILE).unwrap();
        assert_eq!(root.path, temp.path().join("seo"));
        assert_eq!(root.manifest, Some(temp.path().join("seo/seo-tools.php")));
    }

    #[test]
    fn test_plugin_without_header_fails() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "index.php", "<?php echo 'hi';");

        let err = find_package_root(temp.path(), &PLUGIN_PROFILE).unwrap_err();
        assert!(matches!(err, Error::NoPackageRootFound(_)));
    }

    fn root_at(path: &Path, manifest: Option<&str>) -> PackageRoot {
        PackageRoot {
            path: path.to_path_buf(),
            depth: 0,
            manifest: manifest.map(|m| path.join(m)),
        }
    }

    #[test]
    fn test_kind_from_hook_file() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "functions.php", "<?php");
        assert_eq!(
            detect_kind(&root_at(temp.path(), None), &THEME_PROFILE),
            PackageKind::FrameworkThemeOrPlugin
        );
    }

    #[test]
    fn test_kind_from_manifest_header() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "style.css", "/*\ntheme name: Dusk\n*/");
        assert_eq!(
            detect_kind(&root_at(temp.path(), Some("style.css")), &THEME_PROFILE),
            PackageKind::FrameworkThemeOrPlugin
        );
    }

    #[test]
    fn test_kind_from_function_calls() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "page.php", "<?php WP_HEAD (); ?>");
        assert_eq!(
            detect_kind(&root_at(temp.path(), None), &THEME_PROFILE),
            PackageKind::FrameworkThemeOrPlugin
        );
    }

    #[test]
    fn test_static_template() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "index.html", "<html><body>the_title</body></html>");
        touch(temp.path(), "style.css", "body { color: red; }");
        assert_eq!(
            detect_kind(&root_at(temp.path(), Some("style.css")), &THEME_PROFILE),
            PackageKind::StaticTemplate
        );
    }
}
