// src/ingest/transform/rules.rs

//! Named rewrite rule tables
//!
//! Each rule is a case-insensitive pattern applied globally to a whole file.
//! Rules run in table order, so a later rule sees the output of earlier ones.
//! None of the replacements reintroduce text an earlier rule matches, which
//! keeps a second pass over converted output a no-op.

use crate::ingest::classify::PackageKind;
use regex::{Captures, NoExpand, Regex};
use std::sync::LazyLock;

/// Call arguments, allowing one level of nested parentheses
const ARGS: &str = r"(?:[^()]|\([^()]*\))*";

/// End of a call statement: `;`, or a closing `?>` (kept in the output)
const STATEMENT_END: &str = r"(?:\s*;|(?P<close>\s*\?>))";

/// What a match is replaced with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Inserted verbatim; `$` has no special meaning
    Literal(&'static str),
    /// `{N}` inserts capture N; `{q:N}` inserts it escaped for a single-quoted string
    Template(&'static str),
}

/// Which packages a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Any,
    /// Only packages classified as framework themes/plugins
    FrameworkOnly,
}

impl RuleScope {
    pub fn applies(&self, kind: PackageKind) -> bool {
        match self {
            RuleScope::Any => true,
            RuleScope::FrameworkOnly => kind.is_framework(),
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: Replacement,
    pub applies_to: RuleScope,
}

impl Rule {
    fn new(
        name: &'static str,
        pattern: &str,
        replacement: Replacement,
        applies_to: RuleScope,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!("(?i){}", pattern))
                .unwrap_or_else(|e| panic!("rule {} has an invalid pattern: {}", name, e)),
            replacement,
            applies_to,
        }
    }

    fn keeps_close_tag(&self) -> bool {
        self.pattern.capture_names().any(|name| name == Some("close"))
    }

    /// Rewrite every match, or `None` when the pattern does not occur
    pub fn apply(&self, content: &str) -> Option<String> {
        if !self.pattern.is_match(content) {
            return None;
        }
        let rewritten = match self.replacement {
            Replacement::Literal(text) if self.keeps_close_tag() => self
                .pattern
                .replace_all(content, |caps: &Captures| {
                    let close = caps.name("close").map(|m| m.as_str()).unwrap_or_default();
                    format!("{}{}", text, close)
                }),
            Replacement::Literal(text) => self.pattern.replace_all(content, NoExpand(text)),
            Replacement::Template(template) => self
                .pattern
                .replace_all(content, |caps: &Captures| expand(template, caps)),
        };
        Some(rewritten.into_owned())
    }
}

/// An ordered, named list of rules
#[derive(Debug)]
pub struct RuleSet {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Run every applicable rule in order
    ///
    /// Returns the new content and the names of the rules that matched.
    pub fn apply(&self, content: &str, kind: PackageKind) -> (String, Vec<&'static str>) {
        let mut current = content.to_string();
        let mut matched = Vec::new();

        for rule in self.rules.iter().filter(|r| r.applies_to.applies(kind)) {
            if let Some(rewritten) = rule.apply(&current) {
                matched.push(rule.name);
                current = rewritten;
            }
        }

        (current, matched)
    }
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(q:)?(\d+)\}").expect("placeholder pattern is valid"));

fn expand(template: &str, caps: &Captures) -> String {
    PLACEHOLDER
        .replace_all(template, |placeholder: &Captures| {
            let index: usize = placeholder[2].parse().unwrap_or(usize::MAX);
            let value = caps.get(index).map(|m| m.as_str()).unwrap_or_default();
            if placeholder.get(1).is_some() {
                php_single_quote(value)
            } else {
                value.to_string()
            }
        })
        .into_owned()
}

/// Escape text for use inside a PHP single-quoted string
pub fn php_single_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Framework template calls inside script files, rewritten to host equivalents
pub static FRAMEWORK_SCRIPT: LazyLock<RuleSet> = LazyLock::new(|| {
    use Replacement::Literal;
    use RuleScope::{Any, FrameworkOnly};

    let call = |function: &str| format!(r"\b{}\s*\({}\){}", function, ARGS, STATEMENT_END);
    let bloginfo = |show: &str| {
        format!(r#"\bbloginfo\s*\(\s*['"]{}['"]\s*\){}"#, show, STATEMENT_END)
    };
    let expr = |function: &str| format!(r"\b{}\s*\({}\)", function, ARGS);
    // A whole `<?php f(); ?>` block that prints an attribute
    let tag = |function: &str| format!(r"<\?php\s+{}\s*\({}\)\s*;?\s*\?>", function, ARGS);

    RuleSet {
        name: "framework_script",
        rules: vec![
            Rule::new(
                "get_header",
                &call("get_header"),
                Literal("include __DIR__ . '/../../public/header.php';"),
                Any,
            ),
            Rule::new(
                "get_footer",
                &call("get_footer"),
                Literal("include __DIR__ . '/../../public/footer.php';"),
                Any,
            ),
            Rule::new(
                "the_title",
                &call("the_title"),
                Literal("echo htmlspecialchars($page['title'] ?? $post['title'] ?? '');"),
                Any,
            ),
            Rule::new(
                "the_content",
                &call("the_content"),
                Literal("echo $page['content'] ?? $post['content'] ?? '';"),
                Any,
            ),
            Rule::new(
                "the_permalink",
                &call("the_permalink"),
                Literal("echo $baseUrl . '/post/' . urlencode($post['slug'] ?? '');"),
                Any,
            ),
            Rule::new(
                "get_permalink",
                &expr("get_permalink"),
                Literal("($baseUrl . '/post/' . urlencode($post['slug'] ?? ''))"),
                Any,
            ),
            Rule::new(
                "wp_nav_menu",
                &call("wp_nav_menu"),
                Literal(
                    "require_once __DIR__ . '/../../public/menu-functions.php'; \
                     echo renderMenuItems(getMenuItemsForLocation('primary', $pdo));",
                ),
                Any,
            ),
            Rule::new(
                "bloginfo_name",
                &bloginfo("name"),
                Literal("echo htmlspecialchars($siteTitle ?? 'Site Title');"),
                Any,
            ),
            Rule::new(
                "bloginfo_description",
                &bloginfo("description"),
                Literal("echo htmlspecialchars($siteTagline ?? '');"),
                Any,
            ),
            Rule::new(
                "bloginfo_charset",
                &bloginfo("charset"),
                Literal("echo 'UTF-8';"),
                Any,
            ),
            Rule::new(
                "get_bloginfo_name",
                r#"\bget_bloginfo\s*\(\s*['"]name['"]\s*\)"#,
                Literal("($siteTitle ?? 'Site Title')"),
                Any,
            ),
            Rule::new("get_post_meta", &expr("get_post_meta"), Literal("null"), FrameworkOnly),
            Rule::new("wp_head", &call("wp_head"), Literal("/* wp_head */"), Any),
            Rule::new("wp_footer", &call("wp_footer"), Literal("/* wp_footer */"), Any),
            Rule::new(
                "language_attributes",
                &tag("language_attributes"),
                Literal(r#"lang="en""#),
                FrameworkOnly,
            ),
            Rule::new(
                "body_class",
                &tag("body_class"),
                Literal(r#"class="cms-body""#),
                FrameworkOnly,
            ),
            Rule::new(
                "wp_title",
                &expr("wp_title"),
                Literal("($page['title'] ?? $post['title'] ?? 'Site Title')"),
                FrameworkOnly,
            ),
        ],
    }
});

/// Placeholder tokens in static HTML templates
pub static STATIC_MARKUP: LazyLock<RuleSet> = LazyLock::new(|| {
    use Replacement::{Literal, Template};
    use RuleScope::Any;

    RuleSet {
        name: "static_markup",
        rules: vec![
            Rule::new(
                "title_tag",
                r"<title>([^<]*)</title>",
                Template(
                    "<title><?php echo htmlspecialchars($page['title'] ?? $siteTitle ?? '{q:1}'); ?></title>",
                ),
                Any,
            ),
            Rule::new(
                "heading_title",
                r"<h1>([^<]*)\{\{[^}]*?title[^}]*?\}\}([^<]*)</h1>",
                Template("<h1>{1}<?php echo htmlspecialchars($page['title'] ?? $siteTitle ?? ''); ?>{2}</h1>"),
                Any,
            ),
            Rule::new(
                "content_token",
                r"\{\{\s*content\s*\}\}",
                Literal("<?php echo $page['content'] ?? $post['content'] ?? ''; ?>"),
                Any,
            ),
            Rule::new(
                "title_token",
                r"\{\{\s*title\s*\}\}",
                Literal("<?php echo htmlspecialchars($page['title'] ?? $post['title'] ?? ''); ?>"),
                Any,
            ),
            Rule::new(
                "description_token",
                r"\{\{\s*description\s*\}\}",
                Literal("<?php echo htmlspecialchars($siteTagline ?? ''); ?>"),
                Any,
            ),
        ],
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMEWORK: PackageKind = PackageKind::FrameworkThemeOrPlugin;
    const STATIC: PackageKind = PackageKind::StaticTemplate;

    #[test]
    fn test_tables_compile() {
        assert_eq!(FRAMEWORK_SCRIPT.name, "framework_script");
        assert!(!FRAMEWORK_SCRIPT.rules.is_empty());
        assert_eq!(STATIC_MARKUP.rules.len(), 5);
    }

    #[test]
    fn test_literal_keeps_dollar_signs() {
        let (out, matched) = FRAMEWORK_SCRIPT.apply("<?php the_title(); ?>", STATIC);
        assert_eq!(
            out,
            "<?php echo htmlspecialchars($page['title'] ?? $post['title'] ?? ''); ?>"
        );
        assert_eq!(matched, vec!["the_title"]);
    }

    #[test]
    fn test_call_without_semicolon_before_close_tag() {
        let (out, matched) = FRAMEWORK_SCRIPT.apply(
            "<?php get_header() ?>\n<h1><?php the_title()?></h1>\n<?php bloginfo('name') ?>",
            STATIC,
        );
        assert_eq!(
            out,
            "<?php include __DIR__ . '/../../public/header.php'; ?>\n\
             <h1><?php echo htmlspecialchars($page['title'] ?? $post['title'] ?? '');?></h1>\n\
             <?php echo htmlspecialchars($siteTitle ?? 'Site Title'); ?>"
        );
        assert_eq!(matched, vec!["get_header", "the_title", "bloginfo_name"]);

        // Bare calls inside expressions are not statements
        let (out, matched) = FRAMEWORK_SCRIPT.apply("<?php $x = get_footer() . 'y'; ?>", STATIC);
        assert_eq!(out, "<?php $x = get_footer() . 'y'; ?>");
        assert!(matched.is_empty());
    }

    #[test]
    fn test_case_insensitive_and_global() {
        let (out, matched) = FRAMEWORK_SCRIPT.apply("GET_HEADER(); x(); get_header( 'shop' );", STATIC);
        assert_eq!(out.matches("public/header.php").count(), 2);
        assert_eq!(matched, vec!["get_header"]);
    }

    #[test]
    fn test_nested_arguments() {
        let src = "<?php wp_nav_menu(array('theme_location' => 'primary')); ?>";
        let (out, _) = FRAMEWORK_SCRIPT.apply(src, STATIC);
        assert!(out.contains("getMenuItemsForLocation('primary', $pdo)"));
        assert!(!out.contains("wp_nav_menu"));
    }

    #[test]
    fn test_scope_filters_rules() {
        let src = "<html <?php language_attributes(); ?>>";
        let (unchanged, matched) = FRAMEWORK_SCRIPT.apply(src, STATIC);
        assert_eq!(unchanged, src);
        assert!(matched.is_empty());

        let (out, _) = FRAMEWORK_SCRIPT.apply(src, FRAMEWORK);
        assert_eq!(out, r#"<html lang="en">"#);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let src = "<?php get_header(); the_content(); bloginfo('name'); wp_head(); ?>";
        let (once, _) = FRAMEWORK_SCRIPT.apply(src, FRAMEWORK);
        let (twice, matched) = FRAMEWORK_SCRIPT.apply(&once, FRAMEWORK);
        assert_eq!(once, twice);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_template_quotes_captures() {
        let (out, _) = STATIC_MARKUP.apply("<title>Bob's $5 Shop</title>", STATIC);
        assert_eq!(
            out,
            r"<title><?php echo htmlspecialchars($page['title'] ?? $siteTitle ?? 'Bob\'s $5 Shop'); ?></title>"
        );
    }

    #[test]
    fn test_heading_title_keeps_surrounding_text() {
        let (out, matched) = STATIC_MARKUP.apply("<h1>Welcome {{ page.title }}!</h1>", STATIC);
        assert_eq!(
            out,
            "<h1>Welcome <?php echo htmlspecialchars($page['title'] ?? $siteTitle ?? ''); ?>!</h1>"
        );
        assert_eq!(matched, vec!["heading_title"]);
    }
}
