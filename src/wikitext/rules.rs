//! The compiled rule table and the line scanner.

use super::Rule;
use fancy_regex::{Captures, Regex};
use std::{collections::HashSet, fmt, sync::Arc};

/// A rule table build error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A group name is used by more than one rule or helper.
    #[error("group name '{0}' is used more than once")]
    DuplicateGroup(String),

    /// The combined pattern could not be compiled.
    #[error(transparent)]
    Regex(#[from] fancy_regex::Error),
}

/// The handler of an extension rule. It receives the full text of the match
/// and the match itself, and returns replacement HTML.
pub type ExtensionHandler = dyn Fn(&str, &RuleMatch<'_>) -> String + Send + Sync;

/// A wiki text rule contributed from outside the crate.
///
/// Extension rules sit between the inline style rules and the block/link
/// rules in priority order.
#[derive(Clone)]
pub struct ExtensionRule {
    /// The capture group name for the rule. It must be a valid regular
    /// expression group name which is not used by any other rule.
    pub name: String,
    /// The body of the pattern, without the outer named group.
    pub pattern: String,
    /// The names of any named groups inside `pattern`. These must not collide
    /// with the name or helpers of any other rule.
    pub helpers: Vec<String>,
    /// The replacement function.
    pub handler: Arc<ExtensionHandler>,
}

impl ExtensionRule {
    /// Creates a new extension rule.
    pub fn new<F>(name: impl Into<String>, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &RuleMatch<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            helpers: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Declares helper group names used inside the pattern.
    #[must_use]
    pub fn with_helpers<I, S>(mut self, helpers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.helpers.extend(helpers.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for ExtensionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("helpers", &self.helpers)
            .finish_non_exhaustive()
    }
}

/// A single match of the rule table.
#[derive(Debug)]
pub struct RuleMatch<'t> {
    /// The raw captures.
    captures: Captures<'t>,
}

impl<'t> RuleMatch<'t> {
    /// The full text of the match.
    pub fn as_str(&self) -> &'t str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }

    /// The text of a named group, if it participated in the match.
    pub fn group(&self, name: &str) -> Option<&'t str> {
        self.captures.name(name).map(|m| m.as_str())
    }
}

/// An entry in the rule table.
#[derive(Debug)]
struct Entry {
    /// The rule.
    rule: Rule,
    /// The name of the capture group which selects the rule.
    name: String,
}

/// All rules, compiled into one alternation.
#[derive(Debug)]
pub struct RuleTable {
    /// Rules in priority order.
    entries: Vec<Entry>,
    /// Extension rules by registration index.
    extensions: Vec<ExtensionRule>,
    /// The compiled alternation.
    regex: Regex,
}

impl RuleTable {
    /// Builds the rule table from the built-in rules plus any extension rules.
    pub fn new(extensions: Vec<ExtensionRule>) -> Result<Self, Error> {
        let mut names = Vec::<&str>::new();
        for rule in Rule::PRE.into_iter().chain(Rule::POST) {
            names.extend(rule.name());
            names.extend(rule.helpers());
        }
        for extension in &extensions {
            names.push(&extension.name);
            names.extend(extension.helpers.iter().map(String::as_str));
        }
        let mut seen = HashSet::new();
        if let Some(name) = names.into_iter().find(|name| !seen.insert(*name)) {
            return Err(Error::DuplicateGroup(name.to_string()));
        }

        let mut entries = Vec::with_capacity(Rule::PRE.len() + extensions.len() + Rule::POST.len());
        let mut pattern = String::new();
        let mut push = |rule: Rule, name: &str, body: &str| {
            if !entries.is_empty() {
                pattern.push('|');
            }
            pattern += &format!("(?P<{name}>{body})");
            entries.push(Entry {
                rule,
                name: name.to_string(),
            });
        };

        for rule in Rule::PRE {
            if let (Some(name), Some(body)) = (rule.name(), rule.pattern()) {
                push(rule, name, &body);
            }
        }
        for (index, extension) in extensions.iter().enumerate() {
            push(Rule::Extension(index), &extension.name, &extension.pattern);
        }
        for rule in Rule::POST {
            if let (Some(name), Some(body)) = (rule.name(), rule.pattern()) {
                push(rule, name, &body);
            }
        }

        log::trace!("rule table pattern: {pattern}");

        Ok(Self {
            entries,
            extensions,
            regex: Regex::new(&pattern)?,
        })
    }

    /// The extension rule with the given registration index.
    pub fn extension(&self, index: usize) -> Option<&ExtensionRule> {
        self.extensions.get(index)
    }

    /// Scans `text` left to right, replacing every non-overlapping match with
    /// the output of `handler`. Unmatched text is copied through unchanged.
    pub fn replace_all<'t, F, E>(&self, text: &'t str, mut handler: F) -> Result<String, E>
    where
        F: FnMut(Rule, &RuleMatch<'t>) -> Result<String, E>,
        E: From<fancy_regex::Error>,
    {
        let mut out = String::with_capacity(text.len());
        let mut flushed = 0;
        let mut pos = 0;
        while pos <= text.len() {
            let Some(captures) = self.regex.captures_from_pos(text, pos)? else {
                break;
            };
            let Some((start, end)) = captures.get(0).map(|m| (m.start(), m.end())) else {
                break;
            };

            pos = if end == start {
                end + text[end..].chars().next().map_or(1, char::len_utf8)
            } else {
                end
            };

            let Some(rule) = self.identify(&captures) else {
                continue;
            };

            out += &text[flushed..start];
            out += &handler(rule, &RuleMatch { captures })?;
            flushed = end;
        }
        out += &text[flushed..];
        Ok(out)
    }

    /// Finds the first rule, in priority order, whose group captured
    /// non-empty text.
    fn identify(&self, captures: &Captures<'_>) -> Option<Rule> {
        self.entries.iter().find_map(|entry| {
            captures
                .name(&entry.name)
                .filter(|m| !m.as_str().is_empty())
                .map(|_| entry.rule)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_of(table: &RuleTable, text: &str) -> Vec<(Rule, String)> {
        let mut seen = Vec::new();
        table
            .replace_all::<_, fancy_regex::Error>(text, |rule, m| {
                seen.push((rule, m.as_str().to_string()));
                Ok(String::new())
            })
            .unwrap();
        seen
    }

    #[test]
    fn priority() {
        let table = RuleTable::new(vec![]).unwrap();
        assert_eq!(
            rules_of(&table, "'''''x'''"),
            vec![
                (Rule::BoldItalic, "'''''".to_string()),
                (Rule::Bold, "'''".to_string())
            ]
        );
        assert_eq!(
            rules_of(&table, "a < b"),
            vec![(Rule::HtmlEscape, "<".to_string())]
        );
    }

    #[test]
    fn anchored_rules_only_match_at_line_start() {
        let table = RuleTable::new(vec![]).unwrap();
        assert_eq!(
            rules_of(&table, " * item"),
            vec![(Rule::List, " * ".to_string())]
        );
        assert!(rules_of(&table, "x * item").is_empty());
        assert_eq!(
            rules_of(&table, "== Title =="),
            vec![(Rule::Heading, "== Title ==".to_string())]
        );
        assert!(rules_of(&table, "x == Title ==").is_empty());
    }

    #[test]
    fn heading_depth_must_balance() {
        let table = RuleTable::new(vec![]).unwrap();
        assert!(rules_of(&table, "=== Title =").is_empty());
    }

    #[test]
    fn table_cells() {
        let table = RuleTable::new(vec![]).unwrap();
        assert_eq!(
            rules_of(&table, "||a||b||"),
            vec![
                (Rule::TableCell, "||".to_string()),
                (Rule::TableCell, "||".to_string()),
                (Rule::LastTableCell, "||".to_string())
            ]
        );
    }

    #[test]
    fn helpers_do_not_select_rules() {
        let table = RuleTable::new(vec![]).unwrap();
        let mut groups = Vec::new();
        table
            .replace_all::<_, fancy_regex::Error>("{{{a}}} [[Foo(x)]]", |rule, m| {
                groups.push((rule, m.group("inline"), m.group("macroargs")));
                Ok(String::new())
            })
            .unwrap();
        assert_eq!(
            groups,
            vec![
                (Rule::InlineCode, Some("a"), None),
                (Rule::Macro, None, Some("x"))
            ]
        );
    }

    #[test]
    fn extension_rules_precede_links() {
        let rule = ExtensionRule::new("ticket", r"#(?P<ticketid>\d+)", |_, m| {
            format!("T{}", m.group("ticketid").unwrap_or_default())
        })
        .with_helpers(["ticketid"]);
        let table = RuleTable::new(vec![rule]).unwrap();
        let out = table
            .replace_all::<_, fancy_regex::Error>("see #12 and ''x''", |rule, m| {
                Ok(match rule {
                    Rule::Extension(index) => {
                        let extension = table.extension(index).unwrap();
                        (extension.handler)(m.as_str(), m)
                    }
                    _ => "*".to_string(),
                })
            })
            .unwrap();
        assert_eq!(out, "see T12 and *x*");
    }

    #[test]
    fn group_names_must_be_unique() {
        let rule = ExtensionRule::new("list", "x", |text, _| text.to_string());
        assert!(matches!(
            RuleTable::new(vec![rule]),
            Err(Error::DuplicateGroup(name)) if name == "list"
        ));

        let rule = ExtensionRule::new("code", r"@(?P<inline>\w+)", |text, _| text.to_string())
            .with_helpers(["inline"]);
        assert!(matches!(
            RuleTable::new(vec![rule]),
            Err(Error::DuplicateGroup(name)) if name == "inline"
        ));
    }
}
