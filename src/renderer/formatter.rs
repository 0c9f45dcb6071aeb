//! The line-oriented formatting engine.

use super::{
    Result, Wiki,
    emitters::{
        AnchorRegistry, BOLD, ITALIC, ListFrame, ListStyle, STRIKE, SUBSCRIPT, SUPERSCRIPT,
        TableState, Tabstops, Toggle, ToggleStack, UNDERLINE,
    },
    macros::MacroContext,
    outline::{self, OutlineEntry},
    processor::Processor,
};
use crate::{
    common::{anchor_id, escape, shorten_line, split_lines, strip_links, strip_tags},
    wikitext::{ENDBLOCK, ESCAPE, HR_TOKEN, Rule, RuleMatch, STARTBLOCK, TABLE_CELL},
};
use core::fmt;
use regex::Regex;
use std::{sync::LazyLock, time::Instant};

/// The processor selector on the first line of a fenced block.
static PROCESSOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#!([\w+-][\w+-/]*)").unwrap());

/// The variant of the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flavor {
    /// Full documents with block structure.
    Document,
    /// Short, single-line text with only inline markup.
    Inline,
    /// Heading collection for outlines.
    Outline,
}

/// A sink which discards everything.
struct Discard;

impl fmt::Write for Discard {
    fn write_str(&mut self, _: &str) -> fmt::Result {
        Ok(())
    }
}

/// A fenced block being captured.
#[derive(Debug, Default)]
struct CodeBlock {
    /// The number of open fences.
    depth: usize,
    /// The processor for the block, once known.
    processor: Option<Processor>,
    /// The captured text.
    text: String,
}

/// The state of one formatting pass.
#[derive(Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
struct State {
    /// Block-level output which has not been flushed to the sink yet.
    html: String,
    /// Open toggle tags.
    toggles: ToggleStack,
    /// Open lists, outermost first.
    lists: Vec<ListFrame>,
    /// The depths of open blockquotes, outermost first.
    quotes: Vec<usize>,
    /// The indentation history.
    tabstops: Tabstops,
    /// The open table.
    table: TableState,
    /// The fenced block being captured.
    code: CodeBlock,
    /// Heading IDs used so far.
    anchors: AnchorRegistry,
    /// Headings seen so far, for outlines.
    outline: Vec<OutlineEntry>,
    /// A definition list is open.
    in_def_list: bool,
    /// A paragraph is open.
    paragraph_open: bool,
    /// The current line continues or starts a list item.
    in_list_item: bool,
    /// The current line continues or starts a blockquote.
    in_quote: bool,
}

/// A wiki text formatter.
///
/// A formatter can be reused, but every call starts over from empty state.
#[derive(Debug)]
pub struct Formatter<'w> {
    /// The renderer.
    wiki: &'w Wiki,
    /// The engine variant.
    flavor: Flavor,
    /// The source of the document being formatted.
    source: String,
    /// The pass state.
    state: State,
}

impl<'w> Formatter<'w> {
    /// Creates a new formatter.
    pub fn new(wiki: &'w Wiki, flavor: Flavor) -> Self {
        Self {
            wiki,
            flavor,
            source: String::new(),
            state: State::default(),
        }
    }

    /// The renderer.
    pub fn wiki(&self) -> &'w Wiki {
        self.wiki
    }

    /// The engine variant.
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Formats a complete document.
    pub fn format<W: fmt::Write + ?Sized>(&mut self, text: &str, out: &mut W) -> Result {
        let time = Instant::now();
        self.state = State::default();
        self.source = text.to_string();

        for line in split_lines(text) {
            self.format_line(line)?;
            self.flush(out)?;
        }

        self.close_table();
        self.close_paragraph();
        self.close_indentation();
        self.close_list();
        self.close_def_list();
        self.close_code_blocks();
        self.flush(out)?;

        log::trace!(
            "formatted {} bytes ({:?}) in {:.2?}",
            text.len(),
            self.flavor,
            time.elapsed()
        );
        Ok(())
    }

    /// Formats text as a single line with no block structure.
    pub fn format_inline<W: fmt::Write + ?Sized>(
        &mut self,
        text: &str,
        out: &mut W,
        shorten: bool,
    ) -> Result {
        if text.is_empty() {
            return Ok(());
        }
        self.state = State::default();
        self.source = text.to_string();

        let mut depth = 0_usize;
        let mut processor = None::<&str>;
        let mut buffer = String::new();
        for line in split_lines(text.trim()) {
            let trimmed = line.trim();
            if trimmed == STARTBLOCK {
                depth += 1;
            } else if trimmed == ENDBLOCK {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if processor != Some("comment") {
                            buffer += " ![...]\n";
                        }
                        processor = None;
                    }
                }
            } else if depth > 0 {
                if processor.is_none() {
                    processor = line.strip_prefix("#!").map(str::trim);
                }
            } else {
                buffer += line;
                buffer.push('\n');
            }
        }
        buffer.pop();

        let buffer = if shorten {
            shorten_line(&buffer, self.wiki.config().shorten).into_owned()
        } else {
            buffer
        };

        let mut result = self
            .substitute(&buffer)?
            .replace("[...]", "[&hellip;]");
        if let Some(head) = result.strip_suffix("...") {
            result = format!("{head}&hellip;");
        }
        self.state.toggles.finish(&mut result);
        if depth > 0 {
            result += "[&hellip;]";
        }

        out.write_str(&result)?;
        Ok(())
    }

    /// Formats the headings of a document as a nested list of links.
    pub fn format_outline<W: fmt::Write + ?Sized>(
        &mut self,
        text: &str,
        out: &mut W,
        min_depth: usize,
        max_depth: usize,
    ) -> Result {
        self.format(text, &mut Discard)?;
        outline::render(out, &self.state.outline, min_depth, max_depth)?;
        Ok(())
    }

    /// Writes pending block output to the sink.
    fn flush<W: fmt::Write + ?Sized>(&mut self, out: &mut W) -> fmt::Result {
        out.write_str(&self.state.html)?;
        self.state.html.clear();
        Ok(())
    }

    /// Formats one physical line of a document.
    fn format_line(&mut self, line: &str) -> Result {
        if self.state.code.depth > 0 || line.trim() == STARTBLOCK {
            self.handle_code_block(line);
            return Ok(());
        }

        if line.starts_with(HR_TOKEN) {
            self.close_table();
            self.close_paragraph();
            self.close_indentation();
            self.close_list();
            self.close_def_list();
            self.state.html += "<hr />\n";
            return Ok(());
        }

        if line.is_empty() {
            self.close_paragraph();
            self.close_indentation();
            self.close_list();
            self.close_def_list();
            return Ok(());
        }

        let mut line = line.replace('\t', "        ");
        if !line.starts_with(' ') {
            self.state.tabstops.clear();
        }
        if self.wiki.config().escape_newlines {
            line += " [[BR]]";
        }

        self.state.in_list_item = false;
        self.state.in_quote = false;
        let result = self.substitute(&line)?;

        if !self.state.in_list_item {
            self.close_list();
        }
        if !self.state.in_quote {
            self.close_indentation();
        }
        if self.state.in_def_list && !line.starts_with(' ') {
            self.close_def_list();
        }
        if self.state.table.in_table && !line.trim().starts_with(TABLE_CELL) {
            self.close_table();
        }

        if !result.is_empty()
            && !self.state.in_list_item
            && !self.state.in_def_list
            && !self.state.table.in_table
        {
            self.open_paragraph();
        }
        self.state.html += &result;
        self.state.html.push('\n');
        self.close_table_row();
        Ok(())
    }

    /// Runs the rule table over some text.
    fn substitute(&mut self, text: &str) -> Result<String> {
        let wiki = self.wiki;
        wiki.rules()
            .replace_all(text, |rule, m| self.dispatch(rule, m))
    }

    /// Produces the replacement for one rule match.
    fn dispatch(&mut self, rule: Rule, m: &RuleMatch<'_>) -> Result<String> {
        let text = m.as_str();
        // Only these patterns accept the escape after their indentation.
        let unindented = match rule {
            Rule::Heading | Rule::List => text.trim_start(),
            _ => text,
        };
        if let Some(literal) = unindented.strip_prefix(ESCAPE) {
            let indent = &text[..text.len() - unindented.len()];
            return Ok(format!("{indent}{}", escape(literal)));
        }

        Ok(match rule {
            Rule::BoldItalic => self.bold_italic(),
            Rule::Bold => self.toggle(BOLD),
            Rule::Italic => self.toggle(ITALIC),
            Rule::Underline => self.toggle(UNDERLINE),
            Rule::Strike => self.toggle(STRIKE),
            Rule::Subscript => self.toggle(SUBSCRIPT),
            Rule::Superscript => self.toggle(SUPERSCRIPT),
            Rule::InlineCode => inline_code(m.group("inline")),
            Rule::InlineCode2 => inline_code(m.group("inline2")),
            Rule::Citation => self.citation(m),
            Rule::HtmlEscape => escape(text).into_owned(),
            Rule::ShortLink => self.short_link(m),
            Rule::LongLink => self.long_link(m),
            Rule::Macro => self.macro_call(m),
            Rule::Heading => self.heading(m)?,
            Rule::List => self.list_item(m),
            Rule::Definition => self.definition(m)?,
            Rule::Indent => self.indent(m),
            Rule::LastTableCell => self.last_table_cell(text),
            Rule::TableCell => self.table_cell(text),
            Rule::Extension(index) => match self.wiki.rules().extension(index) {
                Some(extension) => (extension.handler)(text, m),
                None => escape(text).into_owned(),
            },
        })
    }

    // Font styles

    /// Toggles a span-level tag.
    fn toggle(&mut self, toggle: Toggle) -> String {
        let mut out = String::new();
        self.state.toggles.toggle(&mut out, toggle);
        out
    }

    /// `'''''` closes italic if it is open, toggles bold, then opens italic if
    /// it was not open.
    fn bold_italic(&mut self) -> String {
        let mut out = String::new();
        let italic_open = self.state.toggles.is_open(ITALIC);
        if italic_open {
            self.state.toggles.close(&mut out, ITALIC);
        }
        self.state.toggles.toggle(&mut out, BOLD);
        if !italic_open {
            self.state.toggles.toggle(&mut out, ITALIC);
        }
        out
    }

    // Macros

    /// `[[Name(args)]]`
    fn macro_call(&mut self, m: &RuleMatch<'_>) -> String {
        let name = m.group("macroname").unwrap_or_default();
        let args = m.group("macroargs");
        match self.flavor {
            Flavor::Document => {}
            Flavor::Inline => {
                return if name.eq_ignore_ascii_case("br") {
                    " ".into()
                } else if name == "comment" {
                    String::new()
                } else if args.is_some_and(|args| !args.is_empty()) {
                    format!("[[{name}(...)]]")
                } else {
                    format!("[[{name}]]")
                };
            }
            Flavor::Outline => return m.as_str().to_string(),
        }

        if name == "br" || name == "BR" {
            return "<br />".into();
        }

        Processor::resolve(self.wiki, name).process(&self.macro_context(), args, true)
    }

    /// The context handed to macros.
    fn macro_context(&self) -> MacroContext<'_> {
        MacroContext {
            wiki: self.wiki,
            source: &self.source,
        }
    }

    // Headings

    /// `== Heading ==`
    fn heading(&mut self, m: &RuleMatch<'_>) -> Result<String> {
        let text = m.as_str();
        if self.flavor == Flavor::Inline {
            return Ok(escape(text).into_owned());
        }

        let text = text.trim();
        self.close_table();
        self.close_paragraph();
        self.close_indentation();
        self.close_list();
        self.close_def_list();

        let depth = m.group("hdepth").map_or(1, str::len).min(5);
        let mut inner = text.chars();
        for _ in 0..=depth {
            inner.next();
            inner.next_back();
        }

        let label = self.wiki.to_oneliner(inner.as_str(), false)?;
        let anchor = self.state.anchors.allocate(anchor_id(&strip_tags(&label)));
        self.state.html += &format!("<h{depth} id=\"{anchor}\">{label}</h{depth}>");

        if self.flavor == Flavor::Outline {
            self.state.outline.push(OutlineEntry {
                depth,
                html: format!("<a href=\"#{anchor}\">{}</a>", strip_links(&label)),
            });
        }

        Ok(String::new())
    }

    // Lists

    /// An indented list marker.
    fn list_item(&mut self, m: &RuleMatch<'_>) -> String {
        let text = m.as_str();
        if self.flavor == Flavor::Inline {
            return text.to_string();
        }

        let depth = m.group("ldepth").map_or(0, str::len);
        let style = ListStyle::from_marker(text[depth..].trim_end());
        self.state.in_list_item = true;
        self.set_list_depth(Some(depth), Some(style));
        String::new()
    }

    /// The marker depth of the innermost open list.
    fn list_depth(&self) -> Option<usize> {
        self.state.lists.last().map(|frame| frame.depth)
    }

    /// Reconciles the open lists with a line at `depth`. A depth of `None`
    /// closes every list. Otherwise the line starts a new item in the list
    /// it lands in, which is replaced if `style` is of a different kind.
    fn set_list_depth(&mut self, depth: Option<usize>, style: Option<ListStyle>) {
        if depth > self.list_depth() {
            if let (Some(depth), Some(style)) = (depth, style) {
                self.open_list(depth, style);
            }
            return;
        }

        while let Some(deepest) = self.list_depth() {
            if depth >= Some(deepest) {
                break;
            }
            self.pop_list();
        }

        let Some(depth) = depth else {
            return;
        };

        let continues = self.state.lists.last().is_some_and(|top| {
            style
                .as_ref()
                .is_none_or(|style| style.kind == top.style.kind)
        });

        if continues {
            if let Some(top) = self.state.lists.last_mut() {
                top.depth = depth;
            }
            self.state.html += "</li><li>";
        } else if let Some(style) = style {
            self.pop_list();
            self.open_list(depth, style);
        }
    }

    /// Opens a new list with its first item.
    fn open_list(&mut self, depth: usize, style: ListStyle) {
        self.close_table();
        self.close_paragraph();
        self.close_indentation();
        style.write_start_tag(&mut self.state.html);
        self.state.html += "<li>";
        self.state.lists.push(ListFrame { style, depth });
        self.state.tabstops.set(depth);
    }

    /// Closes the innermost list.
    fn pop_list(&mut self) {
        if let Some(frame) = self.state.lists.pop() {
            self.state.html += "</li></";
            self.state.html += frame.style.kind.tag();
            self.state.html += ">";
        }
    }

    /// Closes every open list.
    fn close_list(&mut self) {
        self.set_list_depth(None, None);
    }

    // Definition lists

    /// `  term:: definition`
    fn definition(&mut self, m: &RuleMatch<'_>) -> Result<String> {
        if self.flavor == Flavor::Inline {
            return Ok(escape(m.as_str()).into_owned());
        }

        let mut out = String::from(if self.state.in_def_list { "</dd>" } else { "<dl>" });
        let term = m.group("dterm").unwrap_or_default();
        out += &format!("<dt>{}</dt><dd>", self.wiki.to_oneliner(term, false)?);
        self.state.in_def_list = true;
        Ok(out)
    }

    /// Closes the definition list.
    fn close_def_list(&mut self) {
        if self.state.in_def_list {
            self.state.html += "</dd></dl>\n";
        }
        self.state.in_def_list = false;
    }

    // Blockquotes

    /// Leading whitespace. Continues a list item if it is within the item's
    /// continuation width, otherwise adjusts the blockquote depth.
    fn indent(&mut self, m: &RuleMatch<'_>) -> String {
        if self.flavor == Flavor::Inline {
            return m.as_str().to_string();
        }

        let depth = m.group("idepth").map_or(0, str::len);
        if let Some(top) = self.state.lists.last() {
            if depth < top.depth {
                let outer = self.state.lists.iter().any(|frame| depth > frame.depth);
                if outer {
                    self.state.in_list_item = true;
                    self.set_list_depth(Some(depth), None);
                    return String::new();
                }
            } else if depth <= top.depth + top.style.kind.continuation_width() {
                self.state.in_list_item = true;
                return String::new();
            }
        }

        if !self.state.in_def_list {
            self.set_quote_depth(depth, false);
        }
        String::new()
    }

    /// `>` or `> >` at the start of a line.
    fn citation(&mut self, m: &RuleMatch<'_>) -> String {
        if self.flavor != Flavor::Document {
            return escape(m.as_str()).into_owned();
        }

        let depth = m
            .group("cdepth")
            .map_or(0, |cdepth| cdepth.chars().filter(|&c| c == '>').count());
        self.set_quote_depth(depth, true);
        String::new()
    }

    /// The depth of the innermost blockquote, or 0.
    fn quote_depth(&self) -> usize {
        self.state.quotes.last().copied().unwrap_or(0)
    }

    /// Reconciles the open blockquotes with a line at `depth`.
    ///
    /// Citations open one blockquote per level. Plain indentation opens a
    /// single blockquote for each tabstop crossed.
    fn set_quote_depth(&mut self, depth: usize, citation: bool) {
        let quote_depth = self.quote_depth();
        if depth > quote_depth {
            self.state.tabstops.set(depth);
            let tabstops = self.state.tabstops.clone();
            for tab in tabstops.iter().filter(|&tab| tab > quote_depth) {
                self.open_quote(tab, quote_depth, citation);
            }
        } else {
            while let Some(&deepest) = self.state.quotes.last() {
                if depth >= deepest {
                    break;
                }
                self.close_quote();
            }

            if !citation && depth > 0 {
                if let Some(last) = self.state.quotes.last_mut() {
                    *last = depth;
                } else {
                    self.open_quote(depth, quote_depth, false);
                }
            }
        }

        if depth > 0 {
            self.state.in_quote = true;
        }
    }

    /// Opens the blockquote(s) for `depth`.
    fn open_quote(&mut self, depth: usize, quote_depth: usize, citation: bool) {
        self.close_table();
        self.close_paragraph();
        self.close_list();

        let levels = if citation { quote_depth + 1..=depth } else { depth..=depth };
        for level in levels {
            self.state.quotes.push(level);
            self.state.tabstops.set(level);
            self.state.html += if citation {
                "<blockquote class=\"citation\">\n"
            } else {
                "<blockquote>\n"
            };
        }
    }

    /// Closes the innermost blockquote.
    fn close_quote(&mut self) {
        self.close_table();
        self.close_paragraph();
        if self.state.quotes.pop().is_some() {
            self.state.html += "</blockquote>\n";
        }
    }

    /// Closes every open blockquote.
    fn close_indentation(&mut self) {
        self.set_quote_depth(0, false);
    }

    // Tables

    /// `||` at the end of a line.
    fn last_table_cell(&mut self, text: &str) -> String {
        if self.flavor == Flavor::Inline {
            text.to_string()
        } else {
            String::new()
        }
    }

    /// `||`
    fn table_cell(&mut self, text: &str) -> String {
        if self.flavor == Flavor::Inline {
            return text.to_string();
        }

        self.open_table();
        self.open_table_row();
        if self.state.table.in_cell {
            "</td><td>".into()
        } else {
            self.state.table.in_cell = true;
            "<td>".into()
        }
    }

    /// Opens a table, unless one is open.
    fn open_table(&mut self) {
        if !self.state.table.in_table {
            self.close_paragraph();
            self.close_list();
            self.close_def_list();
            self.state.table.in_table = true;
            self.state.html += "<table class=\"wiki\">\n";
        }
    }

    /// Opens a table row, unless one is open.
    fn open_table_row(&mut self) {
        if !self.state.table.in_row {
            self.open_table();
            self.state.table.in_row = true;
            self.state.html += "<tr>";
        }
    }

    /// Closes the table row, if one is open.
    fn close_table_row(&mut self) {
        if self.state.table.in_row {
            self.state.table.in_row = false;
            if self.state.table.in_cell {
                self.state.table.in_cell = false;
                self.state.html += "</td>";
            }
            self.state.html += "</tr>";
        }
    }

    /// Closes the table, if one is open.
    fn close_table(&mut self) {
        if self.state.table.in_table {
            self.close_table_row();
            self.state.html += "</table>\n";
            self.state.table.in_table = false;
        }
    }

    // Paragraphs

    /// Opens a paragraph, unless one is open.
    fn open_paragraph(&mut self) {
        if !self.state.paragraph_open {
            self.state.html += "<p>\n";
            self.state.paragraph_open = true;
        }
    }

    /// Closes the paragraph and any toggle tags left open inside it.
    fn close_paragraph(&mut self) {
        if self.state.paragraph_open {
            self.state.toggles.finish(&mut self.state.html);
            self.state.html += "</p>\n";
            self.state.paragraph_open = false;
        }
    }

    // Fenced blocks

    /// Captures one line of a fenced block, running the processor when the
    /// outermost fence closes.
    fn handle_code_block(&mut self, line: &str) {
        let trimmed = line.trim();
        if self.flavor == Flavor::Outline {
            if trimmed == STARTBLOCK {
                self.state.code.depth += 1;
            } else if trimmed == ENDBLOCK {
                self.state.code.depth = self.state.code.depth.saturating_sub(1);
            }
            return;
        }

        let code = &mut self.state.code;
        if trimmed == STARTBLOCK {
            code.depth += 1;
            if code.depth == 1 {
                code.processor = None;
                code.text.clear();
            } else {
                code.text += line;
                code.text.push('\n');
                code.processor.get_or_insert_with(Processor::plain);
            }
        } else if trimmed == ENDBLOCK {
            code.depth = code.depth.saturating_sub(1);
            if code.depth == 0 {
                if let Some(processor) = code.processor.take() {
                    let text = core::mem::take(&mut code.text);
                    self.close_table();
                    self.close_paragraph();
                    let html = processor.process(&self.macro_context(), Some(&text), false);
                    self.state.html += &html;
                }
            } else {
                code.text += line;
                code.text.push('\n');
            }
        } else if code.processor.is_none() {
            if let Some(captures) = PROCESSOR.captures(line) {
                code.processor = Some(Processor::resolve(self.wiki, &captures[1]));
            } else {
                code.text += line;
                code.text.push('\n');
                code.processor = Some(Processor::plain());
            }
        } else {
            code.text += line;
            code.text.push('\n');
        }
    }

    /// Closes any fenced blocks left open at the end of the document.
    fn close_code_blocks(&mut self) {
        while self.state.code.depth > 0 {
            self.handle_code_block(ENDBLOCK);
        }
    }
}

/// `{{{code}}}` or `` `code` ``
fn inline_code(code: Option<&str>) -> String {
    format!("<tt>{}</tt>", escape(code.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn wiki() -> Wiki {
        Wiki::new(Config::default()).unwrap()
    }

    fn html(text: &str) -> String {
        wiki().to_html(text).unwrap()
    }

    /// Output without line breaks, for checking nesting.
    fn flat(text: &str) -> String {
        html(text).replace('\n', "")
    }

    #[test]
    fn plain_paragraphs() {
        assert_eq!(html("Hello, world & all"), "<p>\nHello, world &amp; all\n</p>\n");
        assert_eq!(html("a\nb\n\nc"), "<p>\na\nb\n</p>\n<p>\nc\n</p>\n");
        assert_eq!(html(""), "");
    }

    #[test]
    fn toggles() {
        assert_eq!(
            flat("'''a''' '''b'''"),
            "<p><strong>a</strong> <strong>b</strong></p>"
        );
        assert_eq!(flat("''a\n\nb"), "<p><i>a</i></p><p>b</p>");
        assert_eq!(
            flat("'''''x'''''"),
            "<p><strong><i>x</i></strong></p>"
        );
        assert_eq!(
            flat("__u__ ~~s~~ ,,b,, ^p^"),
            "<p><span class=\"underline\">u</span> <del>s</del> <sub>b</sub> <sup>p</sup></p>"
        );
    }

    #[test]
    fn escapes() {
        assert_eq!(flat("!'''x"), "<p>'''x</p>");
        assert_eq!(flat("!__x"), "<p>__x</p>");
        assert_eq!(flat("!= A ="), "<p>= A =</p>");
        assert_eq!(flat("!* item"), "<p>* item</p>");
        assert_eq!(flat("!wiki:Foo"), "<p>wiki:Foo</p>");
        assert_eq!(flat("![[BR]]"), "<p>[[BR]]</p>");
        assert_eq!(flat("!{{{x}}}"), "<p>{{{x}}}</p>");
    }

    #[test]
    fn inline_code() {
        assert_eq!(
            flat("{{{a < '''b'''}}} and `c`"),
            "<p><tt>a &lt; '''b'''</tt> and <tt>c</tt></p>"
        );
    }

    #[test]
    fn headings() {
        assert_eq!(
            html("= Title =\n== Sub ''title'' =="),
            "<h1 id=\"Title\">Title</h1>\n<h2 id=\"Subtitle\">Sub <i>title</i></h2>\n"
        );
        assert_eq!(
            flat("= foo =\n= foo =\n= 1 ="),
            "<h1 id=\"foo\">foo</h1><h1 id=\"foo1\">foo</h1><h1 id=\"a1\">1</h1>"
        );
        assert_eq!(
            flat("para\n== H ==\nmore"),
            "<p>para</p><h2 id=\"H\">H</h2><p>more</p>"
        );
    }

    #[test]
    fn lists() {
        assert_eq!(
            flat("* item1\n* item2\n  * nested\n"),
            "<ul><li>item1</li><li>item2<ul><li>nested</li></ul></li></ul>"
        );
        assert_eq!(
            flat(" 1. one\n 1. two\n\n a. x"),
            "<ol><li>one</li><li>two</li></ol><ol class=\"loweralpha\"><li>x</li></ol>"
        );
        assert_eq!(
            flat(" * a\n 1. b"),
            "<ul><li>a</li></ul><ol><li>b</li></ol>"
        );
        assert_eq!(
            html(" * a\n   continued\n"),
            "<ul><li>a\ncontinued\n</li></ul>"
        );
    }

    #[test]
    fn list_closing_never_underflows() {
        assert_eq!(
            flat("   * deep\n * shallow\ntext"),
            "<ul><li>deep</li></ul><ul><li>shallow</li></ul><p>text</p>"
        );
    }

    #[test]
    fn blockquotes() {
        assert_eq!(
            html("  quoted\n  more\nplain"),
            "<blockquote>\n<p>\nquoted\nmore\n</p>\n</blockquote>\n<p>\nplain\n</p>\n"
        );
        assert_eq!(
            flat(">> deep\n> shallow"),
            "<blockquote class=\"citation\"><blockquote class=\"citation\"><p> deep</p></blockquote><p> shallow</p></blockquote>"
        );
    }

    #[test]
    fn list_continues_at_intermediate_depth() {
        assert_eq!(
            flat(" * a\n   * b\n  text\n   * c"),
            "<ul><li>a<ul><li>b</li></ul></li><li>text<ul><li>c</li></ul></li></ul>"
        );
    }

    #[test]
    fn indent_past_list_item_opens_quote() {
        assert_eq!(flat(" 1. a\n    b"), "<ol><li>ab</li></ol>");
        assert_eq!(
            flat("* a\n      quoted"),
            "<ul><li>a</li></ul><blockquote><p>quoted</p></blockquote>"
        );
        assert_eq!(
            flat(" * a\n      quoted"),
            "<ul><li>a</li></ul><blockquote><blockquote><p>quoted</p></blockquote></blockquote>"
        );
    }

    #[test]
    fn indentation_follows_tabstops() {
        assert_eq!(
            flat("  a\n      b\n    c"),
            "<blockquote><p>a</p><blockquote><p>b</p></blockquote><p>c</p></blockquote>"
        );
        assert_eq!(
            flat("  a\n    b\n  c\n      d\n    e"),
            "<blockquote><p>a</p><blockquote><p>b</p></blockquote><p>c</p>\
             <blockquote><blockquote><p>d</p></blockquote><p>e</p></blockquote></blockquote>"
        );
    }

    #[test]
    fn citation_opens_skipped_levels() {
        assert_eq!(
            flat("> a\n>>> c"),
            "<blockquote class=\"citation\"><p> a</p><blockquote class=\"citation\">\
             <blockquote class=\"citation\"><p> c</p></blockquote></blockquote></blockquote>"
        );
    }

    #[test]
    fn escape_must_start_the_match() {
        assert_eq!(flat("  !term:: def"), "<dl><dt>!term</dt><dd>def</dd></dl>");
        assert_eq!(flat(" !* item"), "<p> * item</p>");
    }

    #[test]
    fn lone_carriage_return_ends_line() {
        assert_eq!(html("a\r\nb\rc"), "<p>\na\nb\nc\n</p>\n");
    }

    #[test]
    fn definitions() {
        assert_eq!(
            flat(" term:: definition\n other:: more"),
            "<dl><dt>term</dt><dd>definition</dd><dt>other</dt><dd>more</dd></dl>"
        );
        assert_eq!(
            flat(" `a::b`:: x"),
            "<dl><dt><tt>a::b</tt></dt><dd>x</dd></dl>"
        );
    }

    #[test]
    fn tables() {
        assert_eq!(
            html("||a||b||\n||c||d||\ntext"),
            "<table class=\"wiki\">\n<tr><td>a</td><td>b\n</td></tr><tr><td>c</td><td>d\n</td></tr></table>\n<p>\ntext\n</p>\n"
        );
    }

    #[test]
    fn blank_line_keeps_table_open() {
        assert_eq!(
            flat("||a||\n\n||b||"),
            "<table class=\"wiki\"><tr><td>a</td></tr><tr><td>b</td></tr></table>"
        );
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(flat("a\n----\nb"), "<p>a</p><hr /><p>b</p>");
    }

    #[test]
    fn code_blocks() {
        assert_eq!(
            html("{{{\na < b\n  c\n}}}"),
            "<pre class=\"wiki\">a &lt; b\n  c\n</pre>\n"
        );
        assert_eq!(html("{{{\n#!comment\nhidden\n}}}\n"), "");
        assert_eq!(html("{{{\n}}}"), "");
        assert_eq!(
            html("{{{\nouter\n{{{\ninner\n}}}\n}}}"),
            "<pre class=\"wiki\">outer\n{{{\ninner\n}}}\n</pre>\n"
        );
        assert_eq!(
            html("text\n{{{\nunterminated"),
            "<p>\ntext\n</p>\n<pre class=\"wiki\">unterminated\n</pre>\n"
        );
    }

    #[test]
    fn unknown_processor() {
        let out = html("{{{\n#!klingon\nx\n}}}\nafter");
        assert!(
            out.starts_with(
                "<div class=\"system-message\">\n <strong>Error: Failed to load processor <code>klingon</code></strong>\n <pre>No macro named [[klingon]] found</pre>\n</div>\n"
            ),
            "{out}"
        );
        assert!(out.ends_with("<p>\nafter\n</p>\n"), "{out}");
    }

    #[test]
    fn unknown_macro() {
        let out = html("[[NoSuchMacro]]\nnext line");
        assert!(out.contains("NoSuchMacro"), "{out}");
        assert!(out.contains("<div class=\"system-message\">"), "{out}");
        assert!(out.ends_with("next line\n</p>\n"), "{out}");
    }

    #[test]
    fn line_breaks() {
        assert_eq!(flat("a[[BR]]b"), "<p>a<br />b</p>");
    }

    #[test]
    fn links() {
        assert_eq!(
            flat("http://example.org/x"),
            "<p><a class=\"ext-link\" href=\"http://example.org/x\"><span class=\"icon\">http://example.org/x</span></a></p>"
        );
        assert_eq!(
            flat("[http://example.org/ Example]"),
            "<p><a class=\"ext-link\" href=\"http://example.org/\"><span class=\"icon\">Example</span></a></p>"
        );
        assert_eq!(
            flat("[/newticket Create]"),
            "<p><a href=\"/newticket\">Create</a></p>"
        );
        assert_eq!(flat("foo:bar baz"), "<p>foo:bar baz</p>");
        assert_eq!(
            flat("mailto:a@b.org"),
            "<p><a class=\"ext-link\" href=\"mailto:a@b.org\"><span class=\"icon\">mailto:a@b.org</span></a></p>"
        );
    }

    #[test]
    fn image_links() {
        assert_eq!(
            flat("http://x.org/a.png"),
            "<p><img src=\"http://x.org/a.png\" alt=\"http://x.org/a.png\" title=\"Warning: direct image links are deprecated, use [[Image(...)]] instead\" /></p>"
        );
    }

    #[test]
    fn oneliner() {
        let wiki = wiki();
        assert_eq!(
            wiki.to_oneliner("''a'' * b\n== c ==", false).unwrap(),
            "<i>a</i> * b\n== c =="
        );
        assert_eq!(wiki.to_oneliner("'''unclosed", false).unwrap(), "<strong>unclosed</strong>");
        assert_eq!(
            wiki.to_oneliner("a\n{{{\ncode\n}}}\nb", false).unwrap(),
            "a\n [&hellip;]\nb"
        );
        assert_eq!(
            wiki.to_oneliner("a\n{{{\n#!comment\nx\n}}}\nb", false).unwrap(),
            "a\nb"
        );
        assert_eq!(
            wiki.to_oneliner("a\n{{{\ncode", false).unwrap(),
            "a[&hellip;]"
        );
        assert_eq!(
            wiki.to_oneliner("[[BR]] [[comment(x)]] [[Image(a.png)]] [[Foo]]", false)
                .unwrap(),
            "   [[Image(...)]] [[Foo]]"
        );
        assert_eq!(wiki.to_oneliner("wait...", false).unwrap(), "wait&hellip;");
        assert_eq!(wiki.to_oneliner("", false).unwrap(), "");
    }

    #[test]
    fn oneliner_shortens() {
        let text = "word ".repeat(30);
        let out = wiki().to_oneliner(&text, true).unwrap();
        assert!(out.ends_with(" &hellip;"), "{out}");
        assert!(out.len() < 85, "{out}");
    }

    #[test]
    fn escape_newlines() {
        let wiki = Wiki::new(Config {
            escape_newlines: true,
            ..Config::default()
        })
        .unwrap();
        assert_eq!(
            wiki.to_html("a\nb").unwrap(),
            "<p>\na <br />\nb <br />\n</p>\n"
        );
    }

    #[test]
    fn outline() {
        let wiki = wiki();
        assert_eq!(
            wiki.to_outline("= A =\n== B ==\n= C =", 1, 2).unwrap(),
            "<ol><li><a href=\"#A\">A</a><ol><li><a href=\"#B\">B</a></li></ol></li><li><a href=\"#C\">C</a></li></ol>"
        );
        assert_eq!(
            wiki.to_outline("{{{\n= not a heading =\n}}}\n= [http://x.org/ Link] =", 1, 6)
                .unwrap(),
            "<ol><li><a href=\"#Link\"><span class=\"icon\">Link</span></a></li></ol>"
        );
    }

    #[test]
    fn formatter_is_reusable() {
        let wiki = wiki();
        let mut formatter = Formatter::new(&wiki, Flavor::Document);
        let mut first = String::new();
        formatter.format("= A =\n* x", &mut first).unwrap();
        let mut second = String::new();
        formatter.format("= A =\n* x", &mut second).unwrap();
        assert_eq!(first, second);
        assert!(second.contains("id=\"A\""), "{second}");
    }
}
