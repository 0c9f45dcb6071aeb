//! Text helpers shared by the renderer, the macros, and the link resolvers.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

/// Characters which are left alone when encoding a query string value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b' ');

/// Escapes text for use as HTML element content.
#[inline]
pub fn escape(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Escapes text for use inside a double-quoted HTML attribute value.
#[inline]
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

/// Converts heading text into a string which is safe to use as an element ID.
///
/// Only ASCII letters, digits, `.`, `-`, and `:` are kept. IDs must start with
/// a letter, so any other leading character gets an `a` prefix.
pub fn anchor_id(text: &str) -> String {
    let mut id = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
        .collect::<String>();
    if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id.insert(0, 'a');
    }
    id
}

/// Removes all HTML tags from a string, leaving the text content.
pub fn strip_tags(html: &str) -> Cow<'_, str> {
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?\w+(?: .*?)?>").unwrap());
    TAG.replace_all(html, "")
}

/// Removes only `<a>` tags from a string, leaving their content.
pub fn strip_links(html: &str) -> Cow<'_, str> {
    static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?a(?: .*?)?>").unwrap());
    LINK.replace_all(html, "")
}

/// Truncates a line to at most `max_len` characters, preferring to break at
/// the last space or newline, and appends ` ...` if anything was cut.
pub fn shorten_line(text: &str, max_len: usize) -> Cow<'_, str> {
    if text.chars().count() < max_len {
        return Cow::Borrowed(text);
    }

    let limit = text.char_indices().nth(max_len).map_or(text.len(), |(i, _)| i);
    let head = &text[..limit];
    let cut = head
        .rfind(' ')
        .or_else(|| head.rfind('\n'))
        .map_or(limit, |i| i + 1);
    Cow::Owned(format!("{} ...", &text[..cut]))
}

/// Removes one level of matching single or double quotes around a string.
pub fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|text| text.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

/// Encodes a value for use in a query string, using `+` for spaces.
pub fn quote_plus(text: &str) -> String {
    percent_encoding::utf8_percent_encode(text, QUERY_VALUE)
        .to_string()
        .replace(' ', "+")
}

/// Splits text into lines at `\n`, `\r\n`, or a lone `\r`.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(['\r', '\n']).unwrap_or(rest.len());
        let (line, tail) = rest.split_at(end);
        rest = tail
            .strip_prefix("\r\n")
            .or_else(|| tail.strip_prefix(['\r', '\n']))
            .unwrap_or(tail);
        Some(line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_id() {
        assert_eq!(super::anchor_id("Hello World"), "HelloWorld");
        assert_eq!(super::anchor_id("1.2 Release"), "a1.2Release");
        assert_eq!(super::anchor_id("Ärger: a-b"), "rger:a-b");
        assert_eq!(super::anchor_id(""), "a");
    }

    #[test]
    fn strip_tags() {
        assert_eq!(
            super::strip_tags("<strong>bold</strong> and <a href=\"x\">link</a>"),
            "bold and link"
        );
        assert_eq!(super::strip_tags("a &lt; b"), "a &lt; b");
        assert_eq!(
            super::strip_links("<a href=\"#x\"><i>x</i></a>"),
            "<i>x</i>"
        );
    }

    #[test]
    fn shorten_line() {
        assert_eq!(super::shorten_line("short", 75), "short");
        assert_eq!(
            super::shorten_line("the quick brown fox", 12),
            "the quick  ..."
        );
        assert_eq!(super::shorten_line("abcdefghij", 4), "abcd ...");
        assert_eq!(super::shorten_line("ab\ncdefgh", 5), "ab\n ...");
    }

    #[test]
    fn unquote() {
        assert_eq!(super::unquote("'a b'"), "a b");
        assert_eq!(super::unquote("\"a b\""), "a b");
        assert_eq!(super::unquote("'a b\""), "'a b\"");
        assert_eq!(super::unquote("'"), "'");
    }

    #[test]
    fn quote_plus() {
        assert_eq!(super::quote_plus("a b/c&d"), "a+b%2Fc%26d");
        assert_eq!(super::quote_plus("x_y.z-1"), "x_y.z-1");
    }

    #[test]
    fn split_lines() {
        let lines = |text: &'static str| super::split_lines(text).collect::<Vec<_>>();
        assert_eq!(lines("a\r\nb\rc\nd"), ["a", "b", "c", "d"]);
        assert_eq!(lines("a\n\nb\n"), ["a", "", "b"]);
        assert_eq!(lines("\r\n"), [""]);
        assert!(lines("").is_empty());
    }
}
