//! Link resolution.
//!
//! A link `scheme:target` is resolved by trying, in order:
//!
//! 1. Replacing the scheme with its configured alias, if it has one.
//! 2. A registered [`LinkResolver`] for the scheme.
//! 3. An external link, if the target starts with `//` or the scheme is
//!    `mailto`.
//! 4. An InterTrac link to another configured project.
//! 5. An InterWiki link.
//!
//! If nothing matches, the link text is emitted as-is.

use super::{Flavor, Formatter, Wiki, tags::{self, Anchor}};
use crate::common::{escape, quote_plus, unquote};
use crate::wikitext::RuleMatch;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::sync::LazyLock;

/// Characters which are left alone when encoding a wiki page name as a path.
const PAGE_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b':')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// The page linked to by `wiki:` with no page name.
const START_PAGE: &str = "WikiStart";

/// Link targets which are embedded as images instead of linked.
static IMAGE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(gif|jpg|jpeg|png)(\?.*)?$").unwrap());

/// A link handed to a [`LinkResolver`].
#[derive(Clone, Copy, Debug)]
pub struct Link<'a> {
    /// The scheme, after alias substitution.
    pub scheme: &'a str,
    /// The unquoted target.
    pub target: &'a str,
    /// The link label, already HTML-escaped.
    pub label: &'a str,
}

/// A handler for one link scheme.
pub trait LinkResolver: Send + Sync {
    /// Renders the link as HTML.
    fn resolve(&self, wiki: &Wiki, link: &Link<'_>) -> String;
}

impl<F> LinkResolver for F
where
    F: Fn(&Wiki, &Link<'_>) -> String + Send + Sync,
{
    fn resolve(&self, wiki: &Wiki, link: &Link<'_>) -> String {
        self(wiki, link)
    }
}

/// The `wiki:` scheme. Links to pages that do not exist are marked as
/// missing.
#[derive(Debug, Default)]
pub struct WikiPageLinks;

impl LinkResolver for WikiPageLinks {
    fn resolve(&self, wiki: &Wiki, link: &Link<'_>) -> String {
        let (page, fragment) = match link.target.split_once('#') {
            Some((page, fragment)) => (page, Some(fragment)),
            None => (link.target, None),
        };
        let page = if page.is_empty() { START_PAGE } else { page };

        let mut href = format!(
            "{}/wiki/{}",
            wiki.config().base_url,
            percent_encoding::utf8_percent_encode(page, PAGE_PATH)
        );
        if let Some(fragment) = fragment {
            href.push('#');
            href += fragment;
        }

        if wiki.page_exists(page) {
            Anchor::new(&href).class("wiki").to_html(link.label)
        } else {
            Anchor::new(&href)
                .class("missing wiki")
                .rel("nofollow")
                .to_html(&format!("{}?", link.label))
        }
    }
}

impl Formatter<'_> {
    /// `scheme:target`
    pub(super) fn short_link(&self, m: &RuleMatch<'_>) -> String {
        let text = m.as_str();
        let scheme = m.group("sns").unwrap_or_default();
        let target = unquote(m.group("stgt").unwrap_or_default());
        self.make_link(scheme, target, text, text)
    }

    /// `[scheme:target label]` or `[/relative label]`
    pub(super) fn long_link(&self, m: &RuleMatch<'_>) -> String {
        let scheme = m.group("lns").unwrap_or_default();
        let target = unquote(m.group("ltgt").unwrap_or_default());
        let label = match m.group("label") {
            Some(label) if !label.is_empty() => unquote(label).to_string(),
            _ if target.starts_with("//") => format!("{scheme}:{target}"),
            _ if !target.is_empty() => target.to_string(),
            _ => scheme.to_string(),
        };

        if let Some(relative) = m.group("rel") {
            let label = if label.is_empty() { relative } else { &label };
            self.relative_link(relative, label)
        } else {
            self.make_link(scheme, target, m.as_str(), &label)
        }
    }

    /// Resolves a scheme link. `text` is the full link markup, used if the
    /// link does not resolve.
    fn make_link(&self, scheme: &str, target: &str, text: &str, label: &str) -> String {
        let wiki = self.wiki();
        let scheme = wiki.config().scheme_alias(scheme).unwrap_or(scheme);

        if let Some(resolver) = wiki.link_resolver(scheme) {
            return resolver.resolve(
                wiki,
                &Link {
                    scheme,
                    target,
                    label: &escape(label),
                },
            );
        }

        if target.starts_with("//") || scheme == "mailto" {
            return self.external_link(&format!("{scheme}:{target}"), label, "");
        }

        self.intertrac_link(scheme, target, label)
            .or_else(|| self.interwiki_link(scheme, target, label))
            .unwrap_or_else(|| escape(text).into_owned())
    }

    /// Resolves a link to another project.
    fn intertrac_link(&self, scheme: &str, target: &str, label: &str) -> Option<String> {
        let (url, name) = self.wiki().config().intertrac(scheme)?;
        let url = match target.split_once(':') {
            Some((kind, rest)) => format!("{url}/{kind}/{rest}"),
            None => format!("{url}/search?q={}", quote_plus(target)),
        };
        Some(self.external_link(&url, label, &format!("{target} in {name}")))
    }

    /// Resolves an InterWiki link.
    fn interwiki_link(&self, scheme: &str, target: &str, label: &str) -> Option<String> {
        let (url, title) = self.wiki().interwiki().url(scheme, target)?;
        Some(self.external_link(&url, label, &title))
    }

    /// Renders a link to an absolute URL. `text` is not escaped yet.
    pub(super) fn external_link(&self, url: &str, text: &str, title: &str) -> String {
        let local = self.wiki().config().local_url();
        if IMAGE_URL.is_match(url) && self.flavor() != Flavor::Inline {
            let alt = if title.is_empty() { text } else { title };
            tags::direct_image(url, alt)
        } else if local.is_empty() || !url.starts_with(local) {
            let content = format!("<span class=\"icon\">{}</span>", escape(text));
            Anchor::new(url)
                .class("ext-link")
                .title(title)
                .to_html(&content)
        } else {
            Anchor::new(url).title(title).to_html(&escape(text))
        }
    }

    /// Renders a scheme-less link. `text` is not escaped yet.
    fn relative_link(&self, url: &str, text: &str) -> String {
        if IMAGE_URL.is_match(url) && self.flavor() != Flavor::Inline {
            tags::direct_image(url, text)
        } else if url.starts_with("//") {
            Anchor::new(url).class("ext-link").to_html(&escape(text))
        } else {
            Anchor::new(url).to_html(&escape(text))
        }
    }
}
