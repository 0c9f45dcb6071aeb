//! Heading outlines.

use core::fmt;

/// A heading collected during a pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct OutlineEntry {
    /// The heading level.
    pub depth: usize,
    /// A link to the heading.
    pub html: String,
}

/// Renders outline entries within a depth window as nested ordered lists.
///
/// The window is normalised first: reversed bounds are swapped, and the
/// bounds are clamped to `1..=6`. Entries outside the window are skipped.
pub(super) fn render<W: fmt::Write + ?Sized>(
    out: &mut W,
    entries: &[OutlineEntry],
    min_depth: usize,
    max_depth: usize,
) -> fmt::Result {
    let (min_depth, max_depth) = if min_depth > max_depth {
        (max_depth, min_depth)
    } else {
        (min_depth, max_depth)
    };
    let max_depth = max_depth.min(6);
    let min_depth = min_depth.max(1);

    let base = min_depth - 1;
    let mut current = base;
    for entry in entries {
        if entry.depth < min_depth || entry.depth > max_depth {
            continue;
        }

        if entry.depth < current {
            for _ in entry.depth..current {
                out.write_str("</li></ol>")?;
            }
            out.write_str("</li><li>")?;
        } else if entry.depth > current {
            for _ in current..entry.depth {
                out.write_str("<ol><li>")?;
            }
        } else {
            out.write_str("</li><li>\n")?;
        }

        current = entry.depth;
        out.write_str(&entry.html)?;
    }

    for _ in base..current {
        out.write_str("</li></ol>")?;
    }

    Ok(())
}
