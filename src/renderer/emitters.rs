//! State holders for wiki text constructs that span more than one match.

use std::collections::HashSet;

/// A span-level toggle tag pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Toggle {
    /// The start tag.
    pub open: &'static str,
    /// The end tag.
    pub close: &'static str,
}

/// `'''`
pub(super) const BOLD: Toggle = Toggle {
    open: "<strong>",
    close: "</strong>",
};
/// `''`
pub(super) const ITALIC: Toggle = Toggle {
    open: "<i>",
    close: "</i>",
};
/// `__`
pub(super) const UNDERLINE: Toggle = Toggle {
    open: "<span class=\"underline\">",
    close: "</span>",
};
/// `~~`
pub(super) const STRIKE: Toggle = Toggle {
    open: "<del>",
    close: "</del>",
};
/// `,,`
pub(super) const SUBSCRIPT: Toggle = Toggle {
    open: "<sub>",
    close: "</sub>",
};
/// `^`
pub(super) const SUPERSCRIPT: Toggle = Toggle {
    open: "<sup>",
    close: "</sup>",
};

/// Open span-level tags, innermost last.
///
/// Toggle markup may be closed out of order (`''a'''b''c'''`). Closing a tag
/// which is not the innermost closes everything inside it first and then
/// reopens those inner tags, so the output stays well-formed.
#[derive(Debug, Default)]
pub(super) struct ToggleStack(Vec<Toggle>);

impl ToggleStack {
    /// Returns true if the given toggle is open.
    pub fn is_open(&self, toggle: Toggle) -> bool {
        self.0.contains(&toggle)
    }

    /// Closes the innermost instance of `toggle`, writing the end tags for it
    /// and for every tag inside it, then the start tags to reopen the inner
    /// ones.
    pub fn close(&mut self, out: &mut String, toggle: Toggle) {
        let Some(index) = self.0.iter().rposition(|open| *open == toggle) else {
            return;
        };
        for inner in self.0[index..].iter().rev() {
            *out += inner.close;
        }
        self.0.remove(index);
        for inner in &self.0[index..] {
            *out += inner.open;
        }
    }

    /// Opens `toggle` if it is closed, or closes it if it is open.
    pub fn toggle(&mut self, out: &mut String, toggle: Toggle) {
        if self.is_open(toggle) {
            self.close(out, toggle);
        } else {
            self.0.push(toggle);
            *out += toggle.open;
        }
    }

    /// Closes every open tag, innermost first.
    pub fn finish(&mut self, out: &mut String) {
        while let Some(toggle) = self.0.pop() {
            *out += toggle.close;
        }
    }
}

/// The kind of an HTML list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum ListKind {
    /// `<ol>`
    Ordered,
    /// `<ul>`
    Unordered,
}

impl ListKind {
    /// The HTML tag name of the list.
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }

    /// How far past the list marker a continuation line may be indented and
    /// still belong to the current item.
    pub fn continuation_width(self) -> usize {
        match self {
            ListKind::Ordered => 3,
            ListKind::Unordered => 2,
        }
    }
}

/// The style of a new list item, as derived from its marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ListStyle {
    /// The list kind.
    pub kind: ListKind,
    /// The CSS class for the numbering style.
    pub class: Option<&'static str>,
    /// The first ordinal, if not 1.
    pub start: Option<String>,
}

impl ListStyle {
    /// Derives the list style from a list marker, excluding the trailing
    /// space.
    pub fn from_marker(marker: &str) -> Self {
        let Some(ordinal) = marker.strip_suffix('.') else {
            return Self {
                kind: ListKind::Unordered,
                class: None,
                start: None,
            };
        };

        let (class, start) = match ordinal {
            "0" => (Some("arabiczero"), None),
            "1" => (None, None),
            _ if ordinal.starts_with(|c: char| c.is_ascii_digit()) => {
                (None, Some(ordinal.to_string()))
            }
            _ if ordinal.starts_with('i') => (Some("lowerroman"), None),
            _ if ordinal.starts_with('I') => (Some("upperroman"), None),
            _ if ordinal.starts_with(|c: char| c.is_ascii_lowercase()) => {
                (Some("loweralpha"), None)
            }
            _ => (Some("upperalpha"), None),
        };

        Self {
            kind: ListKind::Ordered,
            class,
            start,
        }
    }

    /// Writes the start tag of a list in this style.
    pub fn write_start_tag(&self, out: &mut String) {
        *out += "<";
        *out += self.kind.tag();
        if let Some(class) = self.class {
            *out += &format!(" class=\"{class}\"");
        }
        if let Some(start) = &self.start {
            *out += &format!(" start=\"{start}\"");
        }
        *out += ">";
    }
}

/// An open list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ListFrame {
    /// The style the list was opened with.
    pub style: ListStyle,
    /// The indentation of the list markers.
    pub depth: usize,
}

/// The indentation widths which have started a list or quote, ascending.
#[derive(Clone, Debug, Default)]
pub(super) struct Tabstops(Vec<usize>);

impl Tabstops {
    /// Forgets all tabstops.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Records `depth` as a tabstop, forgetting any deeper stops.
    ///
    /// ```text
    /// given:       -*-----*--*---*--
    /// setting:              *
    /// results in:  -*-----*-*-------
    /// ```
    pub fn set(&mut self, depth: usize) {
        let keep = self.0.partition_point(|&stop| stop < depth);
        self.0.truncate(keep);
        self.0.push(depth);
    }

    /// Iterates the tabstops in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

/// Table state.
#[derive(Debug, Default)]
#[allow(clippy::struct_field_names)]
pub(super) struct TableState {
    /// A `<table>` is open.
    pub in_table: bool,
    /// A `<tr>` is open.
    pub in_row: bool,
    /// A `<td>` is open.
    pub in_cell: bool,
}

/// Heading IDs which have been allocated in the current pass.
#[derive(Debug, Default)]
pub(super) struct AnchorRegistry(HashSet<String>);

impl AnchorRegistry {
    /// Returns `base` if it is unused, otherwise `base` followed by the
    /// smallest positive integer that makes it unused, and records the result.
    pub fn allocate(&mut self, base: String) -> String {
        let mut anchor = base.clone();
        let mut suffix = 1;
        while self.0.contains(&anchor) {
            anchor = format!("{base}{suffix}");
            suffix += 1;
        }
        self.0.insert(anchor.clone());
        anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_reopens_inner_tags() {
        let mut stack = ToggleStack::default();
        let mut out = String::new();
        stack.toggle(&mut out, ITALIC);
        stack.toggle(&mut out, BOLD);
        stack.toggle(&mut out, ITALIC);
        assert_eq!(out, "<i><strong></strong></i><strong>");
        stack.finish(&mut out);
        assert_eq!(out, "<i><strong></strong></i><strong></strong>");
        assert!(!stack.is_open(BOLD));
    }

    #[test]
    fn close_missing_is_noop() {
        let mut stack = ToggleStack::default();
        let mut out = String::new();
        stack.close(&mut out, STRIKE);
        stack.finish(&mut out);
        assert_eq!(out, "");
    }

    #[test]
    fn list_style() {
        let style = |marker| {
            let style = ListStyle::from_marker(marker);
            let mut out = String::new();
            style.write_start_tag(&mut out);
            out
        };
        assert_eq!(style("*"), "<ul>");
        assert_eq!(style("-"), "<ul>");
        assert_eq!(style("1."), "<ol>");
        assert_eq!(style("0."), "<ol class=\"arabiczero\">");
        assert_eq!(style("3."), "<ol start=\"3\">");
        assert_eq!(style("10."), "<ol start=\"10\">");
        assert_eq!(style("i."), "<ol class=\"lowerroman\">");
        assert_eq!(style("IV."), "<ol class=\"upperroman\">");
        assert_eq!(style("a."), "<ol class=\"loweralpha\">");
        assert_eq!(style("B."), "<ol class=\"upperalpha\">");
    }

    #[test]
    fn tabstops() {
        let mut tabs = Tabstops::default();
        for depth in [1, 7, 10, 14] {
            tabs.set(depth);
        }
        tabs.set(9);
        assert_eq!(tabs.iter().collect::<Vec<_>>(), vec![1, 7, 9]);
        tabs.set(9);
        assert_eq!(tabs.iter().collect::<Vec<_>>(), vec![1, 7, 9]);
    }

    #[test]
    fn anchors() {
        let mut anchors = AnchorRegistry::default();
        assert_eq!(anchors.allocate("foo".into()), "foo");
        assert_eq!(anchors.allocate("foo".into()), "foo1");
        assert_eq!(anchors.allocate("foo".into()), "foo2");
        assert_eq!(anchors.allocate("foo1".into()), "foo11");
    }
}
