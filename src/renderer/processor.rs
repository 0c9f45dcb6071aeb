//! Processors for fenced blocks and macro calls.
//!
//! A fenced block is handed to the processor named by its `#!name` first
//! line, or to the default processor if there is none. A `[[Name(args)]]`
//! macro call goes through the same lookup, so any macro can also be used as
//! a block processor and vice versa.

use super::{Wiki, macros::MacroContext, tags::system_message};
use crate::common::escape;
use regex::Regex;
use std::{fmt, sync::LazyLock};

/// A sanitizer failure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SanitizeError {
    /// The 1-based line of the input where the problem was found.
    pub line: usize,
    /// A description of the problem.
    pub message: String,
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SanitizeError {}

/// An HTML sanitizer for the `html` processor.
pub trait Sanitizer: Send + Sync {
    /// Returns a safe version of `html`.
    fn sanitize(&self, html: &str) -> Result<String, SanitizeError>;
}

/// A [`Sanitizer`] backed by ammonia. It never fails; anything it does not
/// understand is dropped.
#[derive(Debug, Default)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str) -> Result<String, SanitizeError> {
        Ok(ammonia::clean(html))
    }
}

/// What a processor does.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Kind {
    /// Discards its input.
    Comment,
    /// Renders its input as preformatted text.
    Default,
    /// Sanitizes its input as HTML.
    Html,
    /// Calls the macro with the same name.
    Macro,
    /// Highlights its input as source code of the given MIME type.
    Mime(String),
}

/// A resolved processor.
#[derive(Clone, Debug)]
pub(super) struct Processor {
    /// The name the processor was resolved from.
    name: String,
    /// The implementation.
    kind: Kind,
    /// The reason resolution failed, if it did.
    error: Option<String>,
}

impl Processor {
    /// The processor used for fenced blocks with no `#!` line.
    pub fn plain() -> Self {
        Self {
            name: "default".into(),
            kind: Kind::Default,
            error: None,
        }
    }

    /// Resolves a processor by name. Built-in processors win over macros,
    /// which win over MIME types.
    pub fn resolve(wiki: &Wiki, name: &str) -> Self {
        let (kind, error) = match name {
            "comment" => (Kind::Comment, None),
            "default" => (Kind::Default, None),
            "html" => (Kind::Html, None),
            _ if wiki.find_macro(name).is_some() => (Kind::Macro, None),
            _ => {
                if let Some(mime_type) = wiki.mimeview().mime_type(name) {
                    (Kind::Mime(mime_type), None)
                } else {
                    log::warn!("no processor named '{name}'");
                    (Kind::Default, Some(format!("No macro named [[{name}]] found")))
                }
            }
        };
        Self {
            name: name.to_string(),
            kind,
            error,
        }
    }

    /// Runs the processor. Failures are logged and rendered as an error box.
    ///
    /// When the output is going inside a paragraph, a code `<div>` is
    /// converted to a `<span>`, and any other block-level output closes the
    /// paragraph around itself.
    pub fn process(&self, ctx: &MacroContext<'_>, args: Option<&str>, in_paragraph: bool) -> String {
        if let Some(error) = &self.error {
            return system_message(
                &format!("Error: Failed to load processor <code>{}</code>", escape(&self.name)),
                error,
            );
        }

        let text = args.unwrap_or_default();
        let html = match &self.kind {
            Kind::Comment => String::new(),
            Kind::Default => format!("<pre class=\"wiki\">{}</pre>\n", escape(text)),
            Kind::Html => self.sanitize(ctx.wiki, text),
            Kind::Macro => self.expand_macro(ctx, args),
            Kind::Mime(mime_type) => match ctx.wiki.mimeview().render(mime_type, text) {
                Ok(html) => html,
                Err(err) => {
                    log::error!("processor {} failed: {err}", self.name);
                    system_message(
                        &format!("Error: Processor {} failed", escape(&self.name)),
                        &err.to_string(),
                    )
                }
            },
        };

        if in_paragraph {
            fit_in_paragraph(html)
        } else {
            html
        }
    }

    /// Runs the HTML sanitizer.
    fn sanitize(&self, wiki: &Wiki, text: &str) -> String {
        match wiki.sanitizer().sanitize(text) {
            Ok(html) => html,
            Err(err) => {
                log::warn!("{} processor: {err}", self.name);
                let line = text
                    .lines()
                    .nth(err.line.saturating_sub(1))
                    .unwrap_or_default()
                    .trim();
                system_message(&format!("HTML parsing error: {}", escape(&err.message)), line)
            }
        }
    }

    /// Calls the macro with the same name as this processor.
    fn expand_macro(&self, ctx: &MacroContext<'_>, args: Option<&str>) -> String {
        let failed = |message: &str| {
            let args = args.unwrap_or_default();
            log::error!("Macro {}({args}) failed: {message}", self.name);
            system_message(
                &escape(&format!("Error: Macro {}({args}) failed", self.name)),
                message,
            )
        };

        let Some(imp) = ctx.wiki.find_macro(&self.name) else {
            return failed("macro is no longer registered");
        };

        log::debug!("executing wiki macro {}", self.name);
        match imp.expand(ctx, &self.name, args) {
            Ok(html) => html,
            Err(err) => failed(&err.to_string()),
        }
    }
}

/// Adjusts processor output so it can be placed inside an open paragraph.
fn fit_in_paragraph(html: String) -> String {
    static BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?s)^<div(?:\s+class="([^"]+)")?>(.*)</div>\n?$"#).unwrap());

    let (content, interrupt) = match BLOCK.captures(&html) {
        Some(captures) if captures.get(1).is_some_and(|class| class.as_str().contains("code")) => {
            (captures.get(2).map(|m| m.as_str().to_string()), false)
        }
        Some(_) => (None, true),
        None => (None, html.starts_with("<table")),
    };

    if let Some(content) = content {
        if content.is_empty() {
            html
        } else {
            format!("<span class=\"code-block\">{content}</span>")
        }
    } else if interrupt {
        format!("</p>{html}<p>")
    } else {
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_in_paragraph() {
        assert_eq!(
            super::fit_in_paragraph("<div class=\"code\"><pre>x</pre></div>\n".into()),
            "<span class=\"code-block\"><pre>x</pre></span>"
        );
        assert_eq!(
            super::fit_in_paragraph("<div class=\"wiki-toc\">x</div>".into()),
            "</p><div class=\"wiki-toc\">x</div><p>"
        );
        assert_eq!(
            super::fit_in_paragraph("<table class=\"x\">\n</table>".into()),
            "</p><table class=\"x\">\n</table><p>"
        );
        assert_eq!(super::fit_in_paragraph("<b>x</b>".into()), "<b>x</b>");
        assert_eq!(
            super::fit_in_paragraph("<div>\nmulti\n</div>".into()),
            "</p><div>\nmulti\n</div><p>"
        );
        assert_eq!(
            super::fit_in_paragraph("<div class=\"code\"><pre>a\nb\n</pre></div>\n".into()),
            "<span class=\"code-block\"><pre>a\nb\n</pre></span>"
        );
    }
}
