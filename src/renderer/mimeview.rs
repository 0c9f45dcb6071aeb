//! Syntax highlighting for MIME type processors.
//!
//! A fenced block whose first line is `#!python` (or `#!text/x-python`) is
//! rendered by a [`MimeRenderer`] instead of as preformatted text.

use super::{Error, Result};
use crate::common::escape;
use core::fmt::Write as _;
use phf::phf_map;
use std::sync::LazyLock;
use syntect::{
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    html::{IncludeBackground, append_highlighted_html_for_styled_line},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

/// Known processor short names and file extensions, and their MIME types.
static MIME_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "c" => "text/x-csrc",
    "cpp" => "text/x-c++src",
    "css" => "text/css",
    "diff" => "text/x-diff",
    "h" => "text/x-chdr",
    "html" => "text/html",
    "java" => "text/x-java",
    "js" => "text/x-javascript",
    "json" => "application/json",
    "lua" => "text/x-lua",
    "make" => "text/x-makefile",
    "patch" => "text/x-diff",
    "perl" => "text/x-perl",
    "php" => "text/x-php",
    "pl" => "text/x-perl",
    "py" => "text/x-python",
    "python" => "text/x-python",
    "rb" => "text/x-ruby",
    "ruby" => "text/x-ruby",
    "rs" => "text/x-rust",
    "rust" => "text/x-rust",
    "sh" => "application/x-sh",
    "sql" => "text/x-sql",
    "txt" => "text/plain",
    "xml" => "text/xml",
    "yaml" => "text/x-yaml",
};

/// The syntax definition token for each MIME type.
static SYNTAX_TOKENS: phf::Map<&'static str, &'static str> = phf_map! {
    "application/json" => "json",
    "application/x-sh" => "sh",
    "text/css" => "css",
    "text/html" => "html",
    "text/plain" => "txt",
    "text/x-c++src" => "cpp",
    "text/x-chdr" => "h",
    "text/x-csrc" => "c",
    "text/x-diff" => "diff",
    "text/x-java" => "java",
    "text/x-javascript" => "js",
    "text/x-lua" => "lua",
    "text/x-makefile" => "make",
    "text/x-perl" => "pl",
    "text/x-php" => "php",
    "text/x-python" => "py",
    "text/x-ruby" => "rb",
    "text/x-rust" => "rs",
    "text/x-sql" => "sql",
    "text/x-yaml" => "yaml",
    "text/xml" => "xml",
};

/// A renderer for source code of a given MIME type.
pub trait MimeRenderer: Send + Sync {
    /// Resolves a processor name to a MIME type, if the name is either a
    /// known short name or a known MIME type.
    fn mime_type(&self, name: &str) -> Option<String>;

    /// Renders `text` as HTML.
    fn render(&self, mime_type: &str, text: &str) -> Result<String>;
}

/// A [`MimeRenderer`] backed by syntect.
#[derive(Debug, Default)]
pub struct SyntectRenderer;

impl SyntectRenderer {
    /// The bundled syntax definitions.
    fn syntaxes() -> &'static SyntaxSet {
        static SS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
        &SS
    }

    /// The highlighting theme.
    fn theme() -> Option<&'static Theme> {
        static THEME: LazyLock<Option<Theme>> = LazyLock::new(|| {
            ThemeSet::load_defaults()
                .themes
                .remove("InspiredGitHub")
        });
        THEME.as_ref()
    }
}

impl MimeRenderer for SyntectRenderer {
    fn mime_type(&self, name: &str) -> Option<String> {
        if let Some(mime_type) = MIME_MAP.get(name) {
            Some((*mime_type).to_string())
        } else if MIME_MAP.values().any(|mime_type| *mime_type == name) {
            Some(name.to_string())
        } else {
            None
        }
    }

    fn render(&self, mime_type: &str, text: &str) -> Result<String> {
        let token = SYNTAX_TOKENS
            .get(mime_type)
            .ok_or_else(|| Error::MimeType(mime_type.to_string()))?;
        let ss = Self::syntaxes();
        let syntax = ss
            .find_syntax_by_token(token)
            .unwrap_or_else(|| ss.find_syntax_plain_text());

        let mut out = String::from("<div class=\"code\"><pre>");
        if let Some(theme) = Self::theme() {
            let mut highlighter = HighlightLines::new(syntax, theme);
            for line in LinesWithEndings::from(text) {
                let regions = highlighter.highlight_line(line, ss)?;
                append_highlighted_html_for_styled_line(&regions[..], IncludeBackground::No, &mut out)?;
            }
        } else {
            log::warn!("highlighting theme is missing; rendering {mime_type} as plain text");
            write!(out, "{}", escape(text))?;
        }
        out += "</pre></div>\n";
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type() {
        let renderer = SyntectRenderer;
        assert_eq!(renderer.mime_type("python").as_deref(), Some("text/x-python"));
        assert_eq!(renderer.mime_type("text/x-python").as_deref(), Some("text/x-python"));
        assert_eq!(renderer.mime_type("klingon"), None);
    }

    #[test]
    fn render() {
        let html = SyntectRenderer.render("text/x-python", "def f():\n    return 1\n").unwrap();
        assert!(html.starts_with("<div class=\"code\"><pre>"), "{html}");
        assert!(html.ends_with("</pre></div>\n"), "{html}");
        assert!(html.contains("return"), "{html}");
        assert!(matches!(
            SyntectRenderer.render("text/x-klingon", "x"),
            Err(Error::MimeType(_))
        ));
    }
}
