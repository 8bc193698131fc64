// src/ingest/install.rs

//! Installing a transformed package
//!
//! Slug collisions follow one policy, with the catalog as the source of truth:
//!
//! - a catalog row for `(type, slug)` means the package is already installed;
//!   the run succeeds without touching the disk
//! - a directory with no catalog row is left alone and the new package gets a
//!   `-<unix time>` suffix (then `-<unix time>-N` if that is taken too)
//!
//! The catalog insert is always the last write of a run.

use crate::db::models::{InstalledPackage, PackageType};
use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_dir_name;
use crate::filesystem::{copy_tree, remove_tree_best_effort};
use crate::ingest::classify::{PackageRoot, has_extension};
use crate::ingest::metadata::PackageMetadata;
use crate::ingest::profile::PackageProfile;
use crate::ingest::transform::{Preamble, PreambleFlavor, Transformer};
use rusqlite::{Connection, ErrorCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Derive a lowercase, dash-separated slug
///
/// Runs of anything other than `[a-z0-9]` collapse to one `-`; leading and
/// trailing dashes are trimmed. An empty result becomes `fallback`.
///
/// ```
/// use cmspack::ingest::install::slugify;
///
/// assert_eq!(slugify("My Theme!! 2.0", "theme"), "my-theme-2-0");
/// assert_eq!(slugify("!!!", "theme"), "theme");
/// ```
pub fn slugify(name: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}

/// Result of checking a slug against the catalog and the packages directory
#[derive(Debug, Clone)]
pub enum SlugResolution {
    /// Nothing uses the slug yet
    Available(String),
    /// An unregistered directory holds the base slug; use `slug` instead
    Disambiguated { base: String, slug: String },
    /// The catalog already has this package
    AlreadyInstalled(InstalledPackage),
}

impl SlugResolution {
    pub fn slug(&self) -> &str {
        match self {
            SlugResolution::Available(slug) => slug,
            SlugResolution::Disambiguated { slug, .. } => slug,
            SlugResolution::AlreadyInstalled(existing) => &existing.slug,
        }
    }
}

/// Apply the collision policy for `base` under `type_dir`
pub fn resolve_slug(
    conn: &Connection,
    type_dir: &Path,
    package_type: PackageType,
    base: &str,
) -> Result<SlugResolution> {
    if let Some(existing) = InstalledPackage::find_by_slug(conn, package_type, base)? {
        info!("{} '{}' is already installed", package_type, base);
        return Ok(SlugResolution::AlreadyInstalled(existing));
    }

    let taken = |slug: &str| -> Result<bool> {
        Ok(type_dir.join(slug).exists() || InstalledPackage::slug_exists(conn, package_type, slug)?)
    };

    if !taken(base)? {
        return Ok(SlugResolution::Available(base.to_string()));
    }

    let stamped = format!("{}-{}", base, chrono::Utc::now().timestamp());
    let mut slug = stamped.clone();
    let mut counter = 2;
    while taken(&slug)? {
        slug = format!("{}-{}", stamped, counter);
        counter += 1;
    }

    warn!(
        "Directory for '{}' exists without a catalog entry, installing as '{}'",
        base, slug
    );
    Ok(SlugResolution::Disambiguated {
        base: base.to_string(),
        slug,
    })
}

/// Copy the staged tree to `type_dir/<slug>`
///
/// The target must not exist yet (`SlugAlreadyInstalled` otherwise). Any
/// other failure removes whatever was written and reports `InstallWriteFailed`.
pub fn install_tree(staging: &Path, type_dir: &Path, slug: &str) -> Result<PathBuf> {
    let slug = sanitize_dir_name(slug)?;
    let target = type_dir.join(&slug);

    fs::create_dir_all(type_dir)
        .map_err(|e| Error::InstallWriteFailed(format!("{}: {}", type_dir.display(), e)))?;

    match fs::create_dir(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(Error::SlugAlreadyInstalled(slug));
        }
        Err(e) => {
            return Err(Error::InstallWriteFailed(format!("{}: {}", target.display(), e)));
        }
    }

    match copy_tree(staging, &target) {
        Ok(files) => {
            info!("Installed {} files to {}", files, target.display());
            Ok(target)
        }
        Err(e) => {
            let report = remove_tree_best_effort(&target);
            if !report.is_clean() {
                warn!("Partial install left at {}", target.display());
            }
            Err(Error::InstallWriteFailed(format!("{}: {}", target.display(), e)))
        }
    }
}

fn read_staged(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::InstallWriteFailed(format!("{}: {}", path.display(), e)))
}

fn write_staged(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| Error::InstallWriteFailed(format!("{}: {}", path.display(), e)))
}

/// What [`ensure_manifest`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestAction {
    AlreadyValid,
    Created,
    HeaderPrepended,
}

/// Make sure `dir` has a manifest whose header names the package
pub fn ensure_manifest(
    dir: &Path,
    metadata: &PackageMetadata,
    profile: &PackageProfile,
) -> Result<ManifestAction> {
    // Plugins use their own header file as the manifest
    let Some(manifest_name) = profile.manifest_file else {
        return Ok(ManifestAction::AlreadyValid);
    };
    let path = dir.join(manifest_name);

    if !path.exists() {
        let content = format!("{}/* Theme styles */\n", metadata.header_block(profile));
        write_staged(&path, content)?;
        debug!("Created {}", path.display());
        return Ok(ManifestAction::Created);
    }

    let existing = read_staged(&path)?;
    let text = String::from_utf8_lossy(&existing);
    if text
        .to_ascii_lowercase()
        .contains(&profile.name_header().to_ascii_lowercase())
    {
        return Ok(ManifestAction::AlreadyValid);
    }

    let mut content = metadata.header_block(profile).into_bytes();
    content.extend_from_slice(&existing);
    write_staged(&path, content)?;
    debug!("Prepended header to {}", path.display());
    Ok(ManifestAction::HeaderPrepended)
}

const DEFAULT_ENTRY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title><?php echo htmlspecialchars($siteTitle); ?></title>
    <link rel="stylesheet" href="<?php echo $baseUrl; ?>/themes/<?php echo basename(__DIR__); ?>/style.css">
</head>
<body>
    <?php include __DIR__ . '/../../public/header.php'; ?>

    <main>
        <h1><?php echo htmlspecialchars($page['title'] ?? $siteTitle); ?></h1>
        <div>
            <?php echo $page['content'] ?? ''; ?>
        </div>
    </main>

    <?php include __DIR__ . '/../../public/footer.php'; ?>
</body>
</html>
"#;

/// Built-in entry page used when a package ships none
pub fn default_entry_file(base_url: &str) -> String {
    Preamble::new(base_url).insert(DEFAULT_ENTRY_TEMPLATE, PreambleFlavor::Markup)
}

/// Make sure `dir` has the profile's entry file
///
/// Returns a log line when a file was created. A missing entry is converted
/// from the first alternative found at the package root, or synthesised from
/// the built-in template.
pub fn ensure_entry_file(
    dir: &Path,
    root: &PackageRoot,
    profile: &PackageProfile,
    transformer: &Transformer,
    base_url: &str,
) -> Result<Option<String>> {
    let Some(entry_name) = profile.entry_file else {
        return Ok(None);
    };
    let entry = dir.join(entry_name);
    if entry.exists() {
        return Ok(None);
    }

    for alternative in profile.alternative_entries {
        let source = root.path.join(alternative);
        if !source.is_file() {
            continue;
        }
        let bytes = read_staged(&source)?;
        let text = String::from_utf8_lossy(&bytes);
        let converted = if has_extension(&source, "php") {
            transformer.transform_script(&text)
        } else {
            transformer.transform_markup(&text)
        };
        write_staged(&entry, converted.unwrap_or_else(|| text.into_owned()))?;
        return Ok(Some(format!("Created {} from {}", entry_name, alternative)));
    }

    write_staged(&entry, default_entry_file(base_url))?;
    Ok(Some(format!("Created {} template", entry_name)))
}

/// Entry file recorded in the catalog
pub fn main_file(profile: &PackageProfile, root: &PackageRoot) -> String {
    if let Some(entry) = profile.entry_file {
        return entry.to_string();
    }
    root.manifest
        .as_deref()
        .and_then(|m| m.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index.php".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Inserted(i64),
    /// A row with the slug already existed; nothing was written
    AlreadyPresent(i64),
}

/// Insert `record` unless its slug is already registered
///
/// The slug is checked right before the insert. A racing insert that wins
/// anyway surfaces as a UNIQUE violation, which is treated the same way.
pub fn register(conn: &Connection, record: &mut InstalledPackage) -> Result<RegisterOutcome> {
    if let Some(existing) = InstalledPackage::find_by_slug(conn, record.package_type, &record.slug)? {
        return Ok(RegisterOutcome::AlreadyPresent(existing.id.unwrap_or_default()));
    }

    match record.insert(conn) {
        Ok(id) => {
            info!("Registered {} '{}' (id {})", record.package_type, record.slug, id);
            Ok(RegisterOutcome::Inserted(id))
        }
        Err(Error::Database(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            warn!("Concurrent install registered '{}' first", record.slug);
            let existing = InstalledPackage::find_by_slug(conn, record.package_type, &record.slug)?
                .ok_or_else(|| Error::CatalogDuplicate(record.slug.clone()))?;
            Ok(RegisterOutcome::AlreadyPresent(existing.id.unwrap_or_default()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ingest::classify::PackageKind;
    use crate::ingest::profile::{PLUGIN_PROFILE, THEME_PROFILE, TransformPolicy};
    use regex::Regex;
    use tempfile::TempDir;

    #[test]
    fn test_slug_shape() {
        let shape = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();
        for name in ["My Theme!! 2.0", "  --Dusk__Theme--  ", "Ünïcode Naïve", "a", "2024"] {
            let slug = slugify(name, "theme");
            assert!(shape.is_match(&slug), "{name:?} -> {slug:?}");
        }
        assert_eq!(slugify("My Theme!! 2.0", "theme"), "my-theme-2-0");
    }

    #[test]
    fn test_slug_fallback() {
        assert_eq!(slugify("", "theme"), "theme");
        assert_eq!(slugify("!!! ???", "plugin"), "plugin");
    }

    fn record(slug: &str) -> InstalledPackage {
        InstalledPackage::new(
            PackageType::Theme,
            "Dusk".to_string(),
            slug.to_string(),
            "index.php".to_string(),
        )
    }

    #[test]
    fn test_resolve_slug_policy() {
        let temp = TempDir::new().unwrap();
        let conn = db::open_in_memory().unwrap();
        let themes = temp.path().join("themes");

        // Fresh
        assert!(matches!(
            resolve_slug(&conn, &themes, PackageType::Theme, "dusk").unwrap(),
            SlugResolution::Available(ref s) if s == "dusk"
        ));

        // Orphan directory: suffixed
        fs::create_dir_all(themes.join("dusk")).unwrap();
        let resolution = resolve_slug(&conn, &themes, PackageType::Theme, "dusk").unwrap();
        let SlugResolution::Disambiguated { base, slug } = resolution else {
            panic!("expected a disambiguated slug");
        };
        assert_eq!(base, "dusk");
        assert!(slug.starts_with("dusk-"));

        // Catalog row: already installed
        record("dusk").insert(&conn).unwrap();
        assert!(matches!(
            resolve_slug(&conn, &themes, PackageType::Theme, "dusk").unwrap(),
            SlugResolution::AlreadyInstalled(_)
        ));

        // Same slug for the other type is independent
        assert!(matches!(
            resolve_slug(&conn, &temp.path().join("plugins"), PackageType::Plugin, "dusk").unwrap(),
            SlugResolution::Available(_)
        ));
    }

    #[test]
    fn test_register_is_idempotent() {
        let conn = db::open_in_memory().unwrap();

        let first = register(&conn, &mut record("dusk")).unwrap();
        let RegisterOutcome::Inserted(id) = first else {
            panic!("first insert should succeed");
        };
        assert_eq!(
            register(&conn, &mut record("dusk")).unwrap(),
            RegisterOutcome::AlreadyPresent(id)
        );
        assert_eq!(InstalledPackage::list(&conn, PackageType::Theme).unwrap().len(), 1);
    }

    #[test]
    fn test_install_tree() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("css")).unwrap();
        fs::write(staging.join("css/site.css"), "a{}").unwrap();
        let themes = temp.path().join("themes");

        let target = install_tree(&staging, &themes, "dusk").unwrap();
        assert_eq!(target, themes.join("dusk"));
        assert!(target.join("css/site.css").exists());

        let err = install_tree(&staging, &themes, "dusk").unwrap_err();
        assert!(matches!(err, Error::SlugAlreadyInstalled(_)));
    }

    #[test]
    fn test_install_tree_rejects_bad_slug() {
        let temp = TempDir::new().unwrap();
        assert!(install_tree(temp.path(), temp.path(), "../escape").is_err());
    }

    #[test]
    fn test_ensure_manifest() {
        let temp = TempDir::new().unwrap();
        let meta = PackageMetadata::defaults(&THEME_PROFILE, "Dusk");

        assert_eq!(
            ensure_manifest(temp.path(), &meta, &THEME_PROFILE).unwrap(),
            ManifestAction::Created
        );
        let created = fs::read_to_string(temp.path().join("style.css")).unwrap();
        assert!(created.contains("Theme Name: Dusk"));

        fs::write(temp.path().join("style.css"), "body { margin: 0; }").unwrap();
        assert_eq!(
            ensure_manifest(temp.path(), &meta, &THEME_PROFILE).unwrap(),
            ManifestAction::HeaderPrepended
        );
        let repaired = fs::read_to_string(temp.path().join("style.css")).unwrap();
        assert!(repaired.starts_with("/*\nTheme Name: Dusk\n"));
        assert!(repaired.ends_with("body { margin: 0; }"));

        assert_eq!(
            ensure_manifest(temp.path(), &meta, &THEME_PROFILE).unwrap(),
            ManifestAction::AlreadyValid
        );
        assert_eq!(
            ensure_manifest(temp.path(), &meta, &PLUGIN_PROFILE).unwrap(),
            ManifestAction::AlreadyValid
        );
    }

    #[test]
    fn test_staging_write_errors_are_install_failures() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("not-created");
        let meta = PackageMetadata::defaults(&THEME_PROFILE, "Dusk");
        let root = PackageRoot {
            path: temp.path().to_path_buf(),
            depth: 0,
            manifest: None,
        };
        let transformer =
            Transformer::new(PackageKind::StaticTemplate, TransformPolicy::Rewrite, "/cms");

        assert!(matches!(
            ensure_manifest(&missing, &meta, &THEME_PROFILE),
            Err(Error::InstallWriteFailed(_))
        ));
        assert!(matches!(
            ensure_entry_file(&missing, &root, &THEME_PROFILE, &transformer, "/cms"),
            Err(Error::InstallWriteFailed(_))
        ));
    }

    #[test]
    fn test_entry_file_from_alternative() {
        let temp = TempDir::new().unwrap();
        let root_dir = temp.path().join("root");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&root_dir).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(root_dir.join("home.html"), "<body>{{ title }}</body>").unwrap();

        let root = PackageRoot {
            path: root_dir,
            depth: 1,
            manifest: None,
        };
        let transformer =
            Transformer::new(PackageKind::StaticTemplate, TransformPolicy::Rewrite, "/cms");

        let logged = ensure_entry_file(&dest, &root, &THEME_PROFILE, &transformer, "/cms").unwrap();
        assert_eq!(logged.as_deref(), Some("Created index.php from home.html"));
        let index = fs::read_to_string(dest.join("index.php")).unwrap();
        assert!(index.contains("public/header.php"));

        // Present now, nothing to do
        assert_eq!(
            ensure_entry_file(&dest, &root, &THEME_PROFILE, &transformer, "/cms").unwrap(),
            None
        );
    }

    #[test]
    fn test_entry_file_default_template() {
        let temp = TempDir::new().unwrap();
        let root = PackageRoot {
            path: temp.path().join("empty"),
            depth: 1,
            manifest: None,
        };
        let transformer =
            Transformer::new(PackageKind::StaticTemplate, TransformPolicy::Rewrite, "/cms");

        let logged =
            ensure_entry_file(temp.path(), &root, &THEME_PROFILE, &transformer, "/cms").unwrap();
        assert_eq!(logged.as_deref(), Some("Created index.php template"));
        let index = fs::read_to_string(temp.path().join("index.php")).unwrap();
        assert!(index.starts_with("<?php\n// cmspack:preamble"));
        assert!(index.contains("$baseUrl = '/cms';"));
    }

    #[test]
    fn test_main_file() {
        let root = PackageRoot {
            path: PathBuf::from("/x/seo"),
            depth: 1,
            manifest: Some(PathBuf::from("/x/seo/seo-tools.php")),
        };
        assert_eq!(main_file(&PLUGIN_PROFILE, &root), "seo-tools.php");
        assert_eq!(main_file(&THEME_PROFILE, &root), "index.php");
    }
}
