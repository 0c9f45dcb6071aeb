//! Wiki text rendering.
//!
//! A [`Wiki`] owns everything that a formatting pass needs from the outside
//! world: configuration, the compiled rule table, and the registries of link
//! resolvers, macros, syntax highlighters, and the HTML sanitizer. It is
//! immutable once built and can be shared freely.
//!
//! Each call to [`Wiki::to_html`], [`Wiki::to_oneliner`], or
//! [`Wiki::to_outline`] creates a fresh [`Formatter`] which owns all of the
//! state for one pass:
//!
//! * The open toggle tags (`<strong>`, `<i>`, …), which must be closed in
//!   reverse order and reopened when closed out of order.
//! * The open lists and blockquotes, each with the indentation depth which
//!   opened it.
//! * The tabstop history, which decides which of several skipped indentation
//!   levels correspond to real nesting boundaries.
//! * The open table, row, and cell.
//! * Any fenced block being captured.
//! * The heading IDs handed out so far.
//!
//! Nothing in a pass can fail because of bad input. Problems inside a macro
//! or processor are logged and rendered in place as an error box, and
//! anything which does not resolve is emitted as literal text. The only
//! errors that escape a pass come from the output sink or from building the
//! rule table.

use crate::{
    config::Config,
    interwiki::InterWikiMap,
    wikitext::{ExtensionRule, RuleTable},
};
use core::fmt;
pub use formatter::{Flavor, Formatter};
use indexmap::IndexMap;
pub use links::{Link, LinkResolver, WikiPageLinks};
pub use macros::{Macro, MacroContext};
pub use mimeview::{MimeRenderer, SyntectRenderer};
pub use processor::{AmmoniaSanitizer, SanitizeError, Sanitizer};
use std::collections::{BTreeSet, HashMap};

mod emitters;
mod formatter;
mod links;
mod macros;
mod mimeview;
mod outline;
mod processor;
mod tags;

/// A rendering error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration file could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A write to a buffer failed.
    #[error("fmt error: {0}")]
    Fmt(#[from] fmt::Error),

    /// Syntax highlighting failed.
    #[error("highlighter error: {0}")]
    Highlight(#[from] syntect::Error),

    /// A macro was called with arguments it cannot use.
    #[error("{0}")]
    Macro(String),

    /// A MIME type has no renderer.
    #[error("no renderer for MIME type '{0}'")]
    MimeType(String),

    /// Matching the rule table failed.
    #[error("rule error: {0}")]
    Rule(#[from] fancy_regex::Error),

    /// The rule table could not be built.
    #[error("rule table error: {0}")]
    RuleTable(#[from] crate::wikitext::Error),
}

/// The result type for rendering operations.
pub type Result<T = (), E = Error> = core::result::Result<T, E>;

/// A source of page names, used to decide whether links to wiki pages point
/// to existing pages.
pub trait PageIndex: Send + Sync {
    /// Returns true if the page exists.
    fn exists(&self, name: &str) -> bool;

    /// Returns all page names starting with `prefix`, sorted.
    fn pages(&self, prefix: &str) -> Vec<String>;
}

impl PageIndex for BTreeSet<String> {
    fn exists(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn pages(&self, prefix: &str) -> Vec<String> {
        self.range(prefix.to_string()..)
            .take_while(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// A bundle of extra syntax: rules and the link schemes they rely on.
pub trait SyntaxProvider {
    /// Extra rules, inserted between the inline style rules and the built-in
    /// block and link rules.
    fn rules(&self) -> Vec<ExtensionRule> {
        vec![]
    }

    /// Extra link schemes.
    fn link_resolvers(&self) -> Vec<(String, Box<dyn LinkResolver>)> {
        vec![]
    }
}

/// A configured wiki text renderer.
pub struct Wiki {
    /// The configuration.
    config: Config,
    /// The InterWiki map, parsed from the configuration.
    interwiki: InterWikiMap,
    /// The compiled rule table.
    rules: RuleTable,
    /// Link resolvers, by scheme.
    links: HashMap<String, Box<dyn LinkResolver>>,
    /// Macros, by name, in registration order.
    macros: IndexMap<String, Box<dyn Macro>>,
    /// The syntax highlighter for MIME type processors.
    mimeview: Box<dyn MimeRenderer>,
    /// The sanitizer for the `html` processor.
    sanitizer: Box<dyn Sanitizer>,
    /// Known wiki pages.
    pages: Box<dyn PageIndex>,
}

impl fmt::Debug for Wiki {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wiki")
            .field("config", &self.config)
            .field("interwiki", &self.interwiki)
            .field("rules", &self.rules)
            .field("links", &self.links.keys().collect::<Vec<_>>())
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Wiki {
    /// Creates a renderer with the built-in link schemes, macros, and
    /// processors.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Creates a builder for a renderer with extra registrations.
    pub fn builder(config: Config) -> Builder {
        Builder::new(config)
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The InterWiki map.
    pub fn interwiki(&self) -> &InterWikiMap {
        &self.interwiki
    }

    /// Renders a complete document as HTML.
    pub fn to_html(&self, text: &str) -> Result<String> {
        let mut out = String::new();
        self.write_html(&mut out, text)?;
        Ok(out)
    }

    /// Renders a complete document as HTML into `out`.
    pub fn write_html<W: fmt::Write + ?Sized>(&self, out: &mut W, text: &str) -> Result {
        Formatter::new(self, Flavor::Document).format(text, out)
    }

    /// Renders text as a single line of HTML with no block structure,
    /// optionally shortened to the configured maximum length.
    pub fn to_oneliner(&self, text: &str, shorten: bool) -> Result<String> {
        let mut out = String::new();
        Formatter::new(self, Flavor::Inline).format_inline(text, &mut out, shorten)?;
        Ok(out)
    }

    /// Renders the headings of a document within the given depth window as a
    /// nested list of links.
    pub fn to_outline(&self, text: &str, min_depth: usize, max_depth: usize) -> Result<String> {
        let mut out = String::new();
        Formatter::new(self, Flavor::Outline).format_outline(text, &mut out, min_depth, max_depth)?;
        Ok(out)
    }

    /// Returns true if the named wiki page exists.
    pub fn page_exists(&self, name: &str) -> bool {
        self.pages.exists(name)
    }

    /// Returns the names of all wiki pages starting with `prefix`.
    pub fn pages(&self, prefix: &str) -> Vec<String> {
        self.pages.pages(prefix)
    }

    /// Finds a macro by name.
    pub fn find_macro(&self, name: &str) -> Option<&dyn Macro> {
        self.macros.get(name).map(Box::as_ref)
    }

    /// Iterates all macros in registration order.
    pub fn macros(&self) -> impl Iterator<Item = (&str, &dyn Macro)> {
        self.macros
            .iter()
            .map(|(name, imp)| (name.as_str(), imp.as_ref()))
    }

    /// Finds the resolver for a link scheme.
    pub(crate) fn link_resolver(&self, scheme: &str) -> Option<&dyn LinkResolver> {
        self.links.get(scheme).map(Box::as_ref)
    }

    /// The rule table.
    pub(crate) fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// The syntax highlighter.
    pub(crate) fn mimeview(&self) -> &dyn MimeRenderer {
        self.mimeview.as_ref()
    }

    /// The HTML sanitizer.
    pub(crate) fn sanitizer(&self) -> &dyn Sanitizer {
        self.sanitizer.as_ref()
    }
}

/// A builder for a [`Wiki`].
pub struct Builder {
    /// The configuration.
    config: Config,
    /// Extension rules, in registration order.
    extensions: Vec<ExtensionRule>,
    /// Link resolvers, by scheme.
    links: HashMap<String, Box<dyn LinkResolver>>,
    /// Macros, by name.
    macros: IndexMap<String, Box<dyn Macro>>,
    /// The syntax highlighter.
    mimeview: Box<dyn MimeRenderer>,
    /// The HTML sanitizer.
    sanitizer: Box<dyn Sanitizer>,
    /// Known wiki pages.
    pages: Box<dyn PageIndex>,
}

impl Builder {
    /// Creates a builder with all of the built-in registrations.
    fn new(config: Config) -> Self {
        let mut links = HashMap::<String, Box<dyn LinkResolver>>::new();
        links.insert("wiki".into(), Box::new(WikiPageLinks));

        let mut builder = Self {
            config,
            extensions: Vec::new(),
            links,
            macros: IndexMap::new(),
            mimeview: Box::new(SyntectRenderer::default()),
            sanitizer: Box::new(AmmoniaSanitizer),
            pages: Box::new(BTreeSet::new()),
        };
        for (name, imp) in macros::builtins() {
            builder.macros.insert(name.to_string(), imp);
        }
        builder
    }

    /// Registers a link scheme, replacing any existing resolver for it.
    #[must_use]
    pub fn link_resolver(mut self, scheme: impl Into<String>, resolver: impl LinkResolver + 'static) -> Self {
        self.links.insert(scheme.into(), Box::new(resolver));
        self
    }

    /// Registers a macro, replacing any existing macro with the same name.
    #[must_use]
    pub fn register_macro(mut self, name: impl Into<String>, imp: impl Macro + 'static) -> Self {
        self.macros.insert(name.into(), Box::new(imp));
        self
    }

    /// Registers a rule which is not part of any provider.
    #[must_use]
    pub fn rule(mut self, rule: ExtensionRule) -> Self {
        self.extensions.push(rule);
        self
    }

    /// Registers the rules and link schemes of a syntax provider.
    #[must_use]
    pub fn syntax_provider(mut self, provider: &dyn SyntaxProvider) -> Self {
        self.extensions.extend(provider.rules());
        self.links.extend(provider.link_resolvers());
        self
    }

    /// Replaces the syntax highlighter.
    #[must_use]
    pub fn mimeview(mut self, mimeview: impl MimeRenderer + 'static) -> Self {
        self.mimeview = Box::new(mimeview);
        self
    }

    /// Replaces the HTML sanitizer.
    #[must_use]
    pub fn sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    /// Replaces the page index.
    #[must_use]
    pub fn pages(mut self, pages: impl PageIndex + 'static) -> Self {
        self.pages = Box::new(pages);
        self
    }

    /// Compiles the rule table and finishes the renderer.
    pub fn build(self) -> Result<Wiki> {
        let interwiki = InterWikiMap::parse(&self.config.interwiki);
        log::debug!(
            "building wiki with {} extension rules, {} link schemes, {} macros, {} InterWiki prefixes",
            self.extensions.len(),
            self.links.len(),
            self.macros.len(),
            interwiki.iter().count()
        );
        Ok(Wiki {
            rules: RuleTable::new(self.extensions)?,
            config: self.config,
            interwiki,
            links: self.links,
            macros: self.macros,
            mimeview: self.mimeview,
            sanitizer: self.sanitizer,
            pages: self.pages,
        })
    }
}
