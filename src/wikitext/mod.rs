//! Wiki text grammar.
//!
//! Wiki text is not parsed into a tree. Each line is scanned once by a single
//! compiled alternation of named rules, and the renderer replaces every match
//! with the output of the handler for the rule that fired. This means that:
//!
//! * Rule order is significant. When two rules could match at the same
//!   position, the earlier one wins.
//! * Rules anchored with `^` only ever match at the start of a line, because
//!   the scanner only ever sees one line at a time.
//! * A rule may contain named *helper* groups which exist only so that the
//!   handler can pick apart the match. Helper groups never select a handler.
//!
//! Block structure (fenced blocks, horizontal rules, blank lines) is handled
//! by the renderer before a line ever reaches the scanner.

pub use rules::{Error, ExtensionHandler, ExtensionRule, RuleMatch, RuleTable};

mod rules;

/// The line which opens a fenced block.
pub const STARTBLOCK: &str = "{{{";
/// The line which closes a fenced block.
pub const ENDBLOCK: &str = "}}}";
/// The prefix of a horizontal rule line.
pub const HR_TOKEN: &str = "----";
/// The table cell separator.
pub const TABLE_CELL: &str = "||";
/// The prefix which turns any rule match back into literal text.
pub const ESCAPE: char = '!';

/// A scheme name, as used by both short and bracketed links.
const LINK_SCHEME: &str = r"[\w.+-]+";
/// A single- or double-quoted link target or label.
const QUOTED_STRING: &str = r#"'[^']+'|"[^"]+""#;
/// The first character of an unquoted short link target.
const SHREF_TARGET_FIRST: &str = r"[\w/?!#@]";
/// Characters allowed inside an unquoted short link target. A single `|` is
/// allowed so long as it does not start a table cell separator.
const SHREF_TARGET_MIDDLE: &str = r"(?:\|(?=[^|\s])|[^|<>\s])";
/// The last character of an unquoted short link target. Trailing punctuation
/// belongs to the surrounding prose.
const SHREF_TARGET_LAST: &str = r"[a-zA-Z0-9/=]";
/// A scheme-less bracketed link target.
const LHREF_RELATIVE_TARGET: &str = r"[/.][^\s\[\]]*";

/// A built-in wiki text rule.
///
/// The variant order of [`Rule::PRE`] followed by any extension rules followed
/// by [`Rule::POST`] is the match priority order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rule {
    /// `'''''`
    BoldItalic,
    /// `'''`
    Bold,
    /// `''`
    Italic,
    /// `__`
    Underline,
    /// `~~`
    Strike,
    /// `,,`
    Subscript,
    /// `^`
    Superscript,
    /// ``{{{code}}}``
    InlineCode,
    /// `` `code` ``
    InlineCode2,
    /// One or more `>` at the start of a line.
    Citation,
    /// A raw `&`, `<`, or `>`.
    HtmlEscape,
    /// `scheme:target`
    ShortLink,
    /// `[scheme:target label]` or `[/relative label]`
    LongLink,
    /// `[[Name]]` or `[[Name(args)]]`
    Macro,
    /// `== Heading ==`
    Heading,
    /// An indented bullet or ordinal marker.
    List,
    /// An indented `term::`.
    Definition,
    /// Leading whitespace before text.
    Indent,
    /// `||` at the end of a line.
    LastTableCell,
    /// `||` anywhere else.
    TableCell,
    /// A rule contributed by an [`ExtensionRule`], by registration index.
    Extension(usize),
}

impl Rule {
    /// Rules which take priority over extension rules.
    pub const PRE: [Rule; 9] = [
        Rule::BoldItalic,
        Rule::Bold,
        Rule::Italic,
        Rule::Underline,
        Rule::Strike,
        Rule::Subscript,
        Rule::Superscript,
        Rule::InlineCode,
        Rule::InlineCode2,
    ];

    /// Rules which yield to extension rules.
    pub const POST: [Rule; 11] = [
        Rule::Citation,
        Rule::HtmlEscape,
        Rule::ShortLink,
        Rule::LongLink,
        Rule::Macro,
        Rule::Heading,
        Rule::List,
        Rule::Definition,
        Rule::Indent,
        Rule::LastTableCell,
        Rule::TableCell,
    ];

    /// The capture group name of a built-in rule.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Rule::BoldItalic => "bolditalic",
            Rule::Bold => "bold",
            Rule::Italic => "italic",
            Rule::Underline => "underline",
            Rule::Strike => "strike",
            Rule::Subscript => "subscript",
            Rule::Superscript => "superscript",
            Rule::InlineCode => "inlinecode",
            Rule::InlineCode2 => "inlinecode2",
            Rule::Citation => "citation",
            Rule::HtmlEscape => "htmlescape",
            Rule::ShortLink => "shref",
            Rule::LongLink => "lhref",
            Rule::Macro => "macro",
            Rule::Heading => "heading",
            Rule::List => "list",
            Rule::Definition => "definition",
            Rule::Indent => "indent",
            Rule::LastTableCell => "last_table_cell",
            Rule::TableCell => "table_cell",
            Rule::Extension(_) => return None,
        })
    }

    /// The body of the pattern of a built-in rule, without its own named
    /// group. Every rule which can be escaped accepts an optional leading
    /// [`ESCAPE`] so that the escaped form is consumed as one match.
    pub fn pattern(self) -> Option<String> {
        Some(match self {
            Rule::BoldItalic => "!?'''''".into(),
            Rule::Bold => "!?'''".into(),
            Rule::Italic => "!?''".into(),
            Rule::Underline => "!?__".into(),
            Rule::Strike => "!?~~".into(),
            Rule::Subscript => "!?,,".into(),
            Rule::Superscript => r"!?\^".into(),
            Rule::InlineCode => r"!?\{\{\{(?P<inline>.*?)\}\}\}".into(),
            Rule::InlineCode2 => "!?`(?P<inline2>.*?)`".into(),
            Rule::Citation => "^(?P<cdepth>>(?: *>)*)".into(),
            Rule::HtmlEscape => "[&<>]".into(),
            Rule::ShortLink => format!(
                "!?((?P<sns>{LINK_SCHEME}):(?P<stgt>{QUOTED_STRING}|{SHREF_TARGET_FIRST}(?:{SHREF_TARGET_MIDDLE}*{SHREF_TARGET_LAST})?))"
            ),
            Rule::LongLink => format!(
                r"!?\[(?:(?P<lns>{LINK_SCHEME}):(?P<ltgt>{QUOTED_STRING}|[^\]\s]*)|(?P<rel>{LHREF_RELATIVE_TARGET}))(?:\s+(?P<label>{QUOTED_STRING}|[^\]]+))?\]"
            ),
            Rule::Macro => {
                r"!?\[\[(?P<macroname>[\w/+-]+)(?:\]\]|\((?P<macroargs>.*?)\)\]\])".into()
            }
            Rule::Heading => r"^\s*!?(?P<hdepth>=+)\s.*\s\k<hdepth>\s*$".into(),
            Rule::List => {
                r"^(?P<ldepth>\s*)!?(?:[-*]|[0-9]+\.|[a-zA-Z]\.|[ivxIVX]{1,5}\.) ".into()
            }
            Rule::Definition => {
                r"^\s+(?P<dterm>(?:`[^`]*`|\{\{\{.*?\}\}\}|[^`{])+?)::(?:\s+|$)".into()
            }
            Rule::Indent => r"^(?P<idepth>\s+)(?=\S)".into(),
            Rule::LastTableCell => r"\|\|\s*$".into(),
            Rule::TableCell => r"\|\|".into(),
            Rule::Extension(_) => return None,
        })
    }

    /// The names of the helper groups a built-in rule defines.
    pub fn helpers(self) -> &'static [&'static str] {
        match self {
            Rule::InlineCode => &["inline"],
            Rule::InlineCode2 => &["inline2"],
            Rule::Citation => &["cdepth"],
            Rule::ShortLink => &["sns", "stgt"],
            Rule::LongLink => &["lns", "ltgt", "rel", "label"],
            Rule::Macro => &["macroname", "macroargs"],
            Rule::Heading => &["hdepth"],
            Rule::List => &["ldepth"],
            Rule::Definition => &["dterm"],
            Rule::Indent => &["idepth"],
            _ => &[],
        }
    }
}
