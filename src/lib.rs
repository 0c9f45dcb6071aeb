//! A single-pass compiler from Trac-style wiki text to HTML.
//!
//! ```
//! use trac_wiki::{Config, Wiki};
//!
//! let wiki = Wiki::new(Config::default()).unwrap();
//! assert_eq!(wiki.to_oneliner("'''bold'''", false).unwrap(), "<strong>bold</strong>");
//! ```

pub mod common;
pub mod config;
pub mod interwiki;
pub mod renderer;
pub mod wikitext;

pub use config::Config;
pub use renderer::{Error, Result, Wiki};
