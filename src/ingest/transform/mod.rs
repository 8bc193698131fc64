// src/ingest/transform/mod.rs

//! Content transformer
//!
//! Copies a package root into a staging tree file by file, rewriting
//! framework template calls in scripts and placeholder tokens in HTML. The
//! rewriting is regex-based: markup it does not recognise passes through
//! untouched.
//!
//! Per-file decisions:
//!
//! | File | Action |
//! |------|--------|
//! | `.DS_Store`, `Thumbs.db`, `.gitignore`, `desktop.ini` | skipped |
//! | `*.php` | rules + preamble |
//! | `*.html`, `*.htm` | placeholder rules, header/footer includes, renamed to `.php` |
//! | anything else | copied verbatim |

pub mod preamble;
pub mod rules;

pub use preamble::{FOOTER_INCLUDE, HEADER_INCLUDE, PREAMBLE_MARKER, Preamble, PreambleFlavor};
pub use rules::{FRAMEWORK_SCRIPT, Replacement, Rule, RuleScope, RuleSet, STATIC_MARKUP};

use crate::error::{Error, Result};
use crate::ingest::classify::{PackageKind, has_extension};
use crate::ingest::profile::TransformPolicy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// OS and editor artefacts that never reach an installed package
pub const SKIP_FILES: &[&str] = &[".DS_Store", "Thumbs.db", ".gitignore", "desktop.ini"];

static BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").expect("body open pattern is valid"));
static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("body close pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Skip,
    TransformScript,
    TransformMarkup,
    Copy,
}

impl FileAction {
    pub fn for_path(path: &Path, policy: TransformPolicy) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if SKIP_FILES.contains(&name) {
            return FileAction::Skip;
        }
        if policy == TransformPolicy::CopyOnly {
            return FileAction::Copy;
        }
        if has_extension(path, "php") {
            FileAction::TransformScript
        } else if has_extension(path, "html") || has_extension(path, "htm") {
            FileAction::TransformMarkup
        } else {
            FileAction::Copy
        }
    }
}

/// Human-readable record of every content change in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransformationLog(Vec<String>);

impl TransformationLog {
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformSummary {
    /// Files whose content was rewritten
    pub files_converted: usize,
    /// Files written with their original bytes (markup may still be renamed)
    pub files_copied: usize,
    pub files_skipped: usize,
    pub log: TransformationLog,
}

/// Applies the rule tables for one package
#[derive(Debug, Clone)]
pub struct Transformer {
    kind: PackageKind,
    policy: TransformPolicy,
    preamble: Preamble,
}

impl Transformer {
    pub fn new(kind: PackageKind, policy: TransformPolicy, base_url: &str) -> Self {
        Self {
            kind,
            policy,
            preamble: Preamble::new(base_url),
        }
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Rewrite a script file; `None` when the content would not change
    ///
    /// Running this on its own output returns `None`.
    pub fn transform_script(&self, content: &str) -> Option<String> {
        let (mut out, matched) = FRAMEWORK_SCRIPT.apply(content, self.kind);
        if !matched.is_empty() {
            debug!("Script rules matched: {}", matched.join(", "));
        }

        if !matched.is_empty() || self.kind.is_framework() {
            out = self.preamble.insert(
                &out,
                PreambleFlavor::Script {
                    framework: self.kind.is_framework(),
                },
            );
        }

        (out != content).then_some(out)
    }

    /// Rewrite an HTML file into a script template; `None` when nothing applies
    pub fn transform_markup(&self, content: &str) -> Option<String> {
        let (mut out, matched) = STATIC_MARKUP.apply(content, self.kind);
        let mut changed = !matched.is_empty();

        if !contains_ignore_case(&out, "get_header")
            && !contains_ignore_case(&out, "public/header.php")
            && let Some(open) = BODY_OPEN.find(&out)
        {
            out.insert_str(open.end(), &format!("\n{}", HEADER_INCLUDE));
            changed = true;
        }

        if !contains_ignore_case(&out, "get_footer")
            && !contains_ignore_case(&out, "public/footer.php")
            && let Some(close) = BODY_CLOSE.find(&out)
        {
            out.insert_str(close.start(), &format!("{}\n", FOOTER_INCLUDE));
            changed = true;
        }

        if !changed {
            return None;
        }
        let out = self.preamble.insert(&out, PreambleFlavor::Markup);
        (out != content).then_some(out)
    }

    /// Copy `root` into `dest`, transforming files along the way
    ///
    /// Relative paths are preserved. Markup files land under a `.php` name
    /// unless a script with that name already sits next to them, in which
    /// case they are copied verbatim under their own name.
    pub fn transform_tree(&self, root: &Path, dest: &Path) -> Result<TransformSummary> {
        let mut summary = TransformSummary::default();
        // `.php` targets already produced from markup in this run
        let mut renamed: HashSet<PathBuf> = HashSet::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            let rel_display = rel.to_string_lossy().replace('\\', "/");
            let target = dest.join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if !entry.file_type().is_file() {
                warn!("Skipping non-regular file {}", rel_display);
                summary.files_skipped += 1;
                continue;
            }

            let mut action = FileAction::for_path(entry.path(), self.policy);
            if action == FileAction::TransformMarkup && entry.path().with_extension("php").exists() {
                warn!(
                    "{} would shadow an existing script, copying it unchanged",
                    rel_display
                );
                action = FileAction::Copy;
            } else if action == FileAction::TransformMarkup
                && !renamed.insert(target.with_extension("php"))
            {
                warn!(
                    "{} maps to a script another markup file already produced, copying it unchanged",
                    rel_display
                );
                action = FileAction::Copy;
            }

            match action {
                FileAction::Skip => {
                    debug!("Skipping {}", rel_display);
                    summary.files_skipped += 1;
                }
                FileAction::Copy => {
                    write_file(&target, &fs::read(entry.path())?)?;
                    summary.files_copied += 1;
                }
                FileAction::TransformScript => {
                    let bytes = fs::read(entry.path())?;
                    match std::str::from_utf8(&bytes).ok().and_then(|t| self.transform_script(t)) {
                        Some(converted) => {
                            write_file(&target, converted.as_bytes())?;
                            summary.files_converted += 1;
                            summary.log.push(format!("Converted PHP file: {}", rel_display));
                        }
                        None => {
                            write_file(&target, &bytes)?;
                            summary.files_copied += 1;
                        }
                    }
                }
                FileAction::TransformMarkup => {
                    let bytes = fs::read(entry.path())?;
                    let target = target.with_extension("php");
                    match std::str::from_utf8(&bytes).ok().and_then(|t| self.transform_markup(t)) {
                        Some(converted) => {
                            write_file(&target, converted.as_bytes())?;
                            summary.files_converted += 1;
                            summary.log.push(format!("Converted HTML to PHP: {}", rel_display));
                        }
                        None => {
                            write_file(&target, &bytes)?;
                            summary.files_copied += 1;
                        }
                    }
                }
            }
        }

        info!(
            "Transformed package: {} converted, {} copied, {} skipped",
            summary.files_converted, summary.files_copied, summary.files_skipped
        );
        Ok(summary)
    }
}

fn write_file(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, bytes)?;
    Ok(())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn framework() -> Transformer {
        Transformer::new(
            PackageKind::FrameworkThemeOrPlugin,
            TransformPolicy::Rewrite,
            "/cms",
        )
    }

    fn static_template() -> Transformer {
        Transformer::new(PackageKind::StaticTemplate, TransformPolicy::Rewrite, "/cms")
    }

    #[test]
    fn test_file_actions() {
        let rewrite = TransformPolicy::Rewrite;
        assert_eq!(FileAction::for_path(Path::new("a/.DS_Store"), rewrite), FileAction::Skip);
        assert_eq!(FileAction::for_path(Path::new("page.PHP"), rewrite), FileAction::TransformScript);
        assert_eq!(FileAction::for_path(Path::new("about.htm"), rewrite), FileAction::TransformMarkup);
        assert_eq!(FileAction::for_path(Path::new("logo.png"), rewrite), FileAction::Copy);
        assert_eq!(
            FileAction::for_path(Path::new("main.php"), TransformPolicy::CopyOnly),
            FileAction::Copy
        );
        assert_eq!(
            FileAction::for_path(Path::new("Thumbs.db"), TransformPolicy::CopyOnly),
            FileAction::Skip
        );
    }

    #[test]
    fn test_script_transform_is_idempotent() {
        let source = "<?php get_header(); ?>\n<main><?php the_content(); ?></main>\n<?php get_footer(); ?>\n";
        let transformer = framework();

        let once = transformer.transform_script(source).unwrap();
        assert_eq!(once.matches(PREAMBLE_MARKER).count(), 1);
        assert!(once.contains("public/header.php"));

        // Second run changes nothing
        assert_eq!(transformer.transform_script(&once), None);
    }

    #[test]
    fn test_static_script_without_matches_is_untouched() {
        let source = "<?php echo date('Y'); ?>";
        assert_eq!(static_template().transform_script(source), None);
    }

    #[test]
    fn test_framework_script_always_gets_preamble() {
        let out = framework().transform_script("<?php echo 1;").unwrap();
        assert!(out.contains("wp-compatibility.php"));
        assert!(out.ends_with("echo 1;"));
    }

    #[test]
    fn test_markup_injects_includes() {
        let html = "<html><head><title>Home</title></head><body class=\"x\">\n<p>Hi</p>\n</body></html>";
        let out = static_template().transform_markup(html).unwrap();

        assert!(out.starts_with("<?php\n// cmspack:preamble"));
        assert!(out.contains(&format!("<body class=\"x\">\n{}", HEADER_INCLUDE)));
        assert!(out.contains(&format!("{}\n</body>", FOOTER_INCLUDE)));
        assert!(out.contains("$siteTitle ?? 'Home'"));
        assert!(!out.contains("<title>Home</title>"));
    }

    #[test]
    fn test_markup_with_existing_includes() {
        let html = "<body><?php get_header(); ?>x<?php get_footer(); ?></body>";
        assert_eq!(static_template().transform_markup(html), None);
    }

    #[test]
    fn test_markup_without_patterns_is_untouched() {
        let fragment = "<div class=\"card\">Plain fragment</div>\n";
        assert_eq!(static_template().transform_markup(fragment), None);
    }

    #[test]
    fn test_transform_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("index.html"), "<body>{{ content }}</body>").unwrap();
        fs::write(root.join("notes.txt"), "keep me").unwrap();
        fs::write(root.join("img/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(root.join(".DS_Store"), "junk").unwrap();

        let summary = static_template().transform_tree(&root, &dest).unwrap();

        assert_eq!(summary.files_converted, 1);
        assert_eq!(summary.files_copied, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.log.entries(), ["Converted HTML to PHP: index.html"]);
        assert!(dest.join("index.php").exists());
        assert!(!dest.join("index.html").exists());
        assert!(!dest.join(".DS_Store").exists());
        assert_eq!(fs::read(dest.join("img/logo.png")).unwrap(), [0x89, b'P', b'N', b'G']);
        assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "keep me");
    }

    #[test]
    fn test_markup_never_shadows_existing_script() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "<body>static</body>").unwrap();
        fs::write(root.join("index.php"), "<?php echo 'dynamic';").unwrap();

        static_template().transform_tree(&root, &dest).unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("index.html")).unwrap(),
            "<body>static</body>"
        );
        assert_eq!(
            fs::read_to_string(dest.join("index.php")).unwrap(),
            "<?php echo 'dynamic';"
        );
    }

    #[test]
    fn test_markup_files_sharing_a_stem_are_both_kept() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "<body>from html</body>").unwrap();
        fs::write(root.join("index.htm"), "<body>from htm</body>").unwrap();

        let summary = static_template().transform_tree(&root, &dest).unwrap();

        // index.htm sorts first and claims index.php
        let converted = fs::read_to_string(dest.join("index.php")).unwrap();
        assert!(converted.contains("from htm"));
        assert_eq!(
            fs::read_to_string(dest.join("index.html")).unwrap(),
            "<body>from html</body>"
        );
        assert_eq!(summary.files_converted, 1);
        assert_eq!(summary.files_copied, 1);
        assert_eq!(summary.log.entries(), ["Converted HTML to PHP: index.htm"]);
    }

    #[test]
    fn test_copy_only_policy() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&root).unwrap();
        let plugin = "<?php\n/* Plugin Name: X */\nget_header();\n";
        fs::write(root.join("x.php"), plugin).unwrap();

        let transformer = Transformer::new(
            PackageKind::FrameworkThemeOrPlugin,
            TransformPolicy::CopyOnly,
            "/cms",
        );
        let summary = transformer.transform_tree(&root, &dest).unwrap();

        assert_eq!(summary.files_converted, 0);
        assert!(summary.log.is_empty());
        assert_eq!(fs::read_to_string(dest.join("x.php")).unwrap(), plugin);
    }
}
