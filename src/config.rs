//! Renderer configuration.
//!
//! Wiki text cannot be rendered without some out-of-band data describing the
//! installation it belongs to: where its pages live, which other projects
//! it can link to, and how to present long lines. All of it can be loaded from
//! a JSON file.

use crate::renderer::Result;
use serde::Deserialize;
use std::collections::HashMap;

/// The default maximum length of shortened one-line output.
pub const DEFAULT_SHORTEN: usize = 75;

/// An InterTrac entry. An entry is either an alias for another scheme, or a
/// description of another project.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct InterTrac {
    /// Another scheme name to use in place of this one.
    pub alias: Option<String>,
    /// The base URL of the other project.
    pub url: Option<String>,
    /// The display name of the other project.
    pub title: Option<String>,
}

/// Renderer configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The URL prefix of this installation. Wiki page links are built under
    /// `{base_url}/wiki/`.
    pub base_url: String,

    /// The URL prefix which identifies links to this installation. Links
    /// outside of it are styled as external links. Defaults to `base_url`.
    pub local_url: Option<String>,

    /// InterTrac entries, by upper-cased scheme.
    pub intertrac: HashMap<String, InterTrac>,

    /// The text of the InterWiki map page.
    pub interwiki: String,

    /// If true, every source line break is rendered as a forced line break.
    pub escape_newlines: bool,

    /// The maximum length of shortened one-line output.
    pub shorten: usize,

    /// The URL prefix for attachments. Defaults to `{base_url}/attachment`.
    pub attachment_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            local_url: None,
            intertrac: HashMap::new(),
            interwiki: String::new(),
            escape_newlines: false,
            shorten: DEFAULT_SHORTEN,
            attachment_url: None,
        }
    }
}

impl Config {
    /// Loads a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config = serde_json::from_str::<Self>(json)?;
        config.intertrac = config
            .intertrac
            .into_iter()
            .map(|(scheme, entry)| (scheme.to_uppercase(), entry))
            .collect();
        Ok(config)
    }

    /// The URL prefix for local links.
    pub fn local_url(&self) -> &str {
        self.local_url.as_deref().unwrap_or(&self.base_url)
    }

    /// The URL prefix for attachments.
    pub fn attachment_url(&self) -> String {
        self.attachment_url
            .clone()
            .unwrap_or_else(|| format!("{}/attachment", self.base_url))
    }

    /// The scheme which `scheme` is an alias of, if any.
    pub fn scheme_alias(&self, scheme: &str) -> Option<&str> {
        self.intertrac
            .get(&scheme.to_uppercase())
            .and_then(|entry| entry.alias.as_deref())
            .filter(|alias| !alias.is_empty())
    }

    /// The base URL and display name of the project `scheme` links to, if
    /// any.
    pub fn intertrac(&self, scheme: &str) -> Option<(&str, String)> {
        let entry = self.intertrac.get(&scheme.to_uppercase())?;
        let url = entry.url.as_deref()?;
        let title = entry
            .title
            .clone()
            .unwrap_or_else(|| format!("Trac project {scheme}"));
        Some((url, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json() {
        let config = Config::from_json(
            r#"{
                "base_url": "/trac",
                "intertrac": {
                    "t": { "alias": "trac" },
                    "Trac": { "url": "http://trac.edgewall.org", "title": "The Trac Project" },
                    "other": { "url": "http://other.example" }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.local_url(), "/trac");
        assert_eq!(config.attachment_url(), "/trac/attachment");
        assert_eq!(config.shorten, DEFAULT_SHORTEN);
        assert_eq!(config.scheme_alias("T"), Some("trac"));
        assert_eq!(config.scheme_alias("trac"), None);
        assert_eq!(
            config.intertrac("trac"),
            Some(("http://trac.edgewall.org", "The Trac Project".to_string()))
        );
        assert_eq!(
            config.intertrac("other"),
            Some(("http://other.example", "Trac project other".to_string()))
        );
        assert_eq!(config.intertrac("t"), None);
    }

    #[test]
    fn from_json_rejects_bad_input() {
        assert!(matches!(
            Config::from_json(r#"{ "shorten": "long" }"#),
            Err(crate::renderer::Error::Config(_))
        ));
    }
}
