//! The InterWiki prefix map.
//!
//! The map is read from a plain text page. Entries are only recognised between
//! two `----` lines, one per line:
//!
//! ```text
//! ----
//! MeatBall  http://www.usemod.com/cgi-bin/mb.pl?  # The MeatBall wiki
//! Trac-ML   http://thread.gmane.org/gmane.comp.version-control.subversion.trac.general/$1
//! ----
//! ```
//!
//! A URL may contain `$1` through `$9`, which expand to the `:`-separated
//! parts of the link target.

use regex::Regex;
use std::{
    borrow::Cow,
    collections::{BTreeMap, btree_map},
    sync::LazyLock,
};

/// A positional argument placeholder in a URL or title template.
static ARG_SPEC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d)").unwrap());

/// A single InterWiki entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterWiki {
    /// The prefix, in the case used on the map page.
    pub prefix: String,
    /// The URL template.
    pub url: String,
    /// The title template. Defaults to the prefix.
    pub title: String,
}

/// A case-insensitive map from prefix to [`InterWiki`] entry.
#[derive(Clone, Debug, Default)]
pub struct InterWikiMap(BTreeMap<String, InterWiki>);

impl InterWikiMap {
    /// Parses an InterWiki map page. Lines that do not look like entries are
    /// ignored.
    pub fn parse(text: &str) -> Self {
        static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([\w.+-]+)[ \t]+([^ \t]+)(?:[ \t]+#(.*))?").unwrap()
        });

        let mut map = BTreeMap::new();
        let mut in_map = false;
        for line in text.lines() {
            if line.starts_with("----") {
                in_map = !in_map;
            } else if in_map {
                if let Some(captures) = ENTRY.captures(line) {
                    let prefix = captures[1].to_string();
                    let url = captures[2].to_string();
                    let title = captures
                        .get(3)
                        .map(|title| title.as_str().trim())
                        .filter(|title| !title.is_empty())
                        .unwrap_or(prefix.as_str())
                        .to_string();
                    map.insert(prefix.to_uppercase(), InterWiki { prefix, url, title });
                } else {
                    log::warn!("ignoring malformed InterWiki line: {line:?}");
                }
            }
        }

        Self(map)
    }

    /// Returns true if the given prefix is defined.
    pub fn contains(&self, prefix: &str) -> bool {
        self.0.contains_key(&prefix.to_uppercase())
    }

    /// Returns the entry for the given prefix.
    pub fn get(&self, prefix: &str) -> Option<&InterWiki> {
        self.0.get(&prefix.to_uppercase())
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries, sorted by upper-cased prefix.
    pub fn iter(&self) -> btree_map::Values<'_, String, InterWiki> {
        self.0.values()
    }

    /// Expands the URL and title of the entry for `prefix` using the
    /// `:`-separated parts of `target`.
    pub fn url(&self, prefix: &str, target: &str) -> Option<(String, String)> {
        let entry = self.get(prefix)?;
        let args = target.split(':').collect::<Vec<_>>();
        let url = expand_or_append(&entry.url, &args);
        let title = expand(&entry.title, &args);
        let title = if title == entry.title.as_str() {
            format!("{target} in {}", entry.title)
        } else {
            title.into_owned()
        };
        Some((url, title))
    }
}

/// Replaces each `$N` in `template` with the Nth argument, or with nothing if
/// there are not enough arguments.
pub fn expand<'a>(template: &'a str, args: &[&str]) -> Cow<'a, str> {
    ARG_SPEC.replace_all(template, |captures: &regex::Captures<'_>| {
        captures[1]
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .and_then(|n| args.get(n - 1))
            .copied()
            .unwrap_or_default()
            .to_string()
    })
}

/// Like [`expand`], but if the template has no placeholders then the first
/// argument is appended instead.
pub fn expand_or_append(template: &str, args: &[&str]) -> String {
    if ARG_SPEC.is_match(template) {
        expand(template, args).into_owned()
    } else {
        format!("{template}{}", args.first().copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
Prose before the map is ignored.
MeatBall http://example.org/not-an-entry
----
MeatBall  http://www.usemod.com/cgi-bin/mb.pl?  # The MeatBall wiki
Trac-ML http://thread.gmane.org/gmane.comp.trac/$1/$2 # Message $1 in Trac Mailing List
 this line is malformed
nolink http://example.com/
----
After http://example.com/after
";

    #[test]
    fn parse() {
        let map = InterWikiMap::parse(PAGE);
        assert!(map.contains("meatball"));
        assert!(map.contains("TRAC-ML"));
        assert!(map.contains("NoLink"));
        assert!(!map.contains("After"));
        assert_eq!(map.iter().count(), 3);
        assert_eq!(map.get("NOLINK").unwrap().title, "nolink");
        assert_eq!(map.get("meatball").unwrap().title, "The MeatBall wiki");
    }

    #[test]
    fn url_appends_without_placeholders() {
        let map = InterWikiMap::parse(PAGE);
        assert_eq!(
            map.url("MeatBall", "RecentChanges"),
            Some((
                "http://www.usemod.com/cgi-bin/mb.pl?RecentChanges".to_string(),
                "RecentChanges in The MeatBall wiki".to_string()
            ))
        );
    }

    #[test]
    fn url_expands_placeholders() {
        let map = InterWikiMap::parse(PAGE);
        assert_eq!(
            map.url("trac-ml", "42:7"),
            Some((
                "http://thread.gmane.org/gmane.comp.trac/42/7".to_string(),
                "Message 42 in Trac Mailing List".to_string()
            ))
        );
        assert_eq!(
            map.url("trac-ml", "42"),
            Some((
                "http://thread.gmane.org/gmane.comp.trac/42/".to_string(),
                "Message 42 in Trac Mailing List".to_string()
            ))
        );
        assert_eq!(map.url("nothing", "42"), None);
    }

    #[test]
    fn expand() {
        assert_eq!(super::expand("$1-$2-$3", &["a", "b"]), "a-b-");
        assert_eq!(super::expand("$0", &["a"]), "");
        assert_eq!(super::expand_or_append("http://x/", &["a", "b"]), "http://x/a");
    }
}
