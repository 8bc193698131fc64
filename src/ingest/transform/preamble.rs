// src/ingest/transform/preamble.rs

//! Generated variable preamble for converted script files
//!
//! Converted templates reference `$baseUrl`, `$page`/`$post`, `$pdo` and
//! `$siteTitle`. The preamble defines each one only when it is not already
//! set, and starts with [`PREAMBLE_MARKER`] so it is never inserted twice.

use super::rules::php_single_quote;

/// First line of every generated preamble
pub const PREAMBLE_MARKER: &str = "// cmspack:preamble";

pub const HEADER_INCLUDE: &str = "<?php include __DIR__ . '/../../public/header.php'; ?>";
pub const FOOTER_INCLUDE: &str = "<?php include __DIR__ . '/../../public/footer.php'; ?>";

/// Which file type the preamble is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleFlavor {
    /// Script files also get a database handle
    Script { framework: bool },
    /// Converted HTML only needs the base path and site title
    Markup,
}

#[derive(Debug, Clone)]
pub struct Preamble {
    base_url: String,
}

impl Preamble {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// Preamble statements, without `<?php`/`?>` tags
    pub fn body(&self, flavor: PreambleFlavor) -> String {
        let source = match flavor {
            PreambleFlavor::Script { framework: true } => "WordPress",
            _ => "HTML",
        };

        let mut out = String::new();
        out.push_str(PREAMBLE_MARKER);
        out.push('\n');
        out.push_str(&format!("/**\n * Converted Theme File\n * Auto-converted from {} template\n */\n", source));
        out.push_str(&format!(
            "if (!isset($baseUrl)) {{\n    $baseUrl = '{}';\n}}\n",
            php_single_quote(&self.base_url)
        ));

        if let PreambleFlavor::Script { framework } = flavor {
            out.push_str("if (!isset($page)) {\n    $page = $post ?? [];\n}\n");
            out.push_str("if (!isset($post)) {\n    $post = $page;\n}\n");
            out.push_str(concat!(
                "if (!isset($pdo)) {\n",
                "    $rootPath = dirname(dirname(dirname(__DIR__)));\n",
                "    require_once $rootPath . '/config/app.php';\n",
                "    require_once $rootPath . '/includes/functions.php';\n",
                "    $pdo = getDBConnection();\n",
                "}\n",
            ));
            out.push_str(SITE_TITLE);
            if framework {
                out.push_str(concat!(
                    "if (file_exists(__DIR__ . '/../../wp-compatibility.php')) {\n",
                    "    require_once __DIR__ . '/../../wp-compatibility.php';\n",
                    "}\n",
                ));
            }
        } else {
            out.push_str(SITE_TITLE);
        }

        out
    }

    /// Add the preamble to `content` unless it already carries one
    ///
    /// A file opening with `<?php` gets the statements right after the tag;
    /// anything else gets a complete `<?php ... ?>` block in front.
    pub fn insert(&self, content: &str, flavor: PreambleFlavor) -> String {
        if has_preamble(content) {
            return content.to_string();
        }

        let body = self.body(flavor);
        let leading = content.len() - content.trim_start().len();
        let rest = &content[leading..];

        if rest.get(..5).is_some_and(|tag| tag.eq_ignore_ascii_case("<?php")) {
            let after_tag = &rest[5..];
            let code = after_tag.trim_start();
            format!("{}<?php\n{}\n{}", &content[..leading], body, code)
        } else {
            format!("<?php\n{}?>\n\n{}", body, content)
        }
    }
}

const SITE_TITLE: &str = concat!(
    "if (!isset($siteTitle)) {\n",
    "    require_once __DIR__ . '/../../public/get-site-name.php';\n",
    "    $siteTitle = getCMSSiteName('Site Title');\n",
    "}\n",
);

pub fn has_preamble(content: &str) -> bool {
    content.contains(PREAMBLE_MARKER)
}
