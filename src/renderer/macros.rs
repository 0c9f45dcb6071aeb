//! Wiki macros.

use super::{Error, Result, Wiki, tags::{Anchor, Image}};
use crate::common::{escape, escape_attr, unquote};
use crate::interwiki;
use core::fmt::Write as _;
use regex::Regex;
use std::sync::LazyLock;

/// What a macro can see of the document calling it.
#[derive(Clone, Copy, Debug)]
pub struct MacroContext<'a> {
    /// The renderer.
    pub wiki: &'a Wiki,
    /// The source text of the whole document being rendered.
    pub source: &'a str,
}

/// A wiki macro, called as `[[Name]]`, `[[Name(args)]]`, or as the processor
/// of a fenced block.
pub trait Macro: Send + Sync {
    /// Wiki text describing the macro.
    fn description(&self) -> &str {
        ""
    }

    /// Expands the macro into HTML. `args` is `None` when the macro is called
    /// without parentheses.
    fn expand(&self, ctx: &MacroContext<'_>, name: &str, args: Option<&str>) -> Result<String>;
}

impl<F> Macro for F
where
    F: Fn(&MacroContext<'_>, &str, Option<&str>) -> Result<String> + Send + Sync,
{
    fn expand(&self, ctx: &MacroContext<'_>, name: &str, args: Option<&str>) -> Result<String> {
        self(ctx, name, args)
    }
}

/// The built-in macros, in registration order.
pub(super) fn builtins() -> Vec<(&'static str, Box<dyn Macro>)> {
    vec![
        ("Image", Box::new(ImageMacro)),
        ("InterWiki", Box::new(InterWikiMacro)),
        ("MacroList", Box::new(MacroListMacro)),
        ("PageOutline", Box::new(PageOutlineMacro)),
        ("TitleIndex", Box::new(TitleIndexMacro)),
    ]
}

/// Splits macro arguments on commas, trimming each one.
fn split_args(args: Option<&str>) -> Vec<&str> {
    match args {
        Some(args) if !args.is_empty() => args.split(',').map(str::trim).collect(),
        _ => vec![],
    }
}

/// `[[PageOutline(depth, title, style)]]`
#[derive(Debug)]
struct PageOutlineMacro;

impl Macro for PageOutlineMacro {
    fn description(&self) -> &str {
        "Displays a structural outline of the current wiki page, each item in the \
outline being a link to the corresponding heading.

This macro accepts three optional parameters:
 * The first is a number or range that configures the minimum and maximum \
level of headings that are included in the outline. `1` includes only \
top-level headings; `2-3` includes levels 2 and 3 as a nested list. The \
default is to include all heading levels.
 * The second is a title for the outline.
 * The third selects the style of the outline, either `inline` or `pullout` \
(the default)."
    }

    fn expand(&self, ctx: &MacroContext<'_>, _: &str, args: Option<&str>) -> Result<String> {
        let argv = split_args(args);
        let (mut min_depth, mut max_depth) = (1, 6);
        if let Some(depth) = argv.first().filter(|depth| !depth.is_empty()) {
            let parse = |depth: &str| {
                depth
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| Error::Macro(format!("invalid outline depth '{depth}'")))
            };
            if let Some((min, max)) = depth.split_once('-') {
                min_depth = parse(min)?;
                max_depth = parse(max)?;
            } else {
                min_depth = parse(depth)?;
                max_depth = min_depth;
            }
        }
        let title = argv.get(1).filter(|title| !title.is_empty());
        let inline = argv
            .get(2)
            .is_some_and(|style| style.eq_ignore_ascii_case("inline"));

        let mut out = String::new();
        if !inline {
            out += "<div class=\"wiki-toc\">";
        }
        if let Some(title) = title {
            write!(out, "<h4>{}</h4>", escape(title))?;
        }
        out += &ctx.wiki.to_outline(ctx.source, min_depth, max_depth)?;
        if !inline {
            out += "</div>";
        }
        Ok(out)
    }
}

/// `[[Image(filespec, options…)]]`
#[derive(Debug)]
struct ImageMacro;

impl Macro for ImageMacro {
    fn description(&self) -> &str {
        "Embeds an image in wiki-formatted text.

The first argument is the file specification:
 * `module:id:file`, where module is either `wiki` or `ticket`, refers to an \
attachment of that wiki page or ticket.
 * `id:file` is the same, where id is either `#` and a ticket number, or a \
wiki page name.
 * `htdocs:file` refers to a file in the project static files.
 * `http:`, `https:`, and `ftp:` URLs refer to remote images.

The remaining arguments are optional:
 * a number, with an optional `%` or `px` unit, is the width of the image
 * `left`, `right`, `top`, or `bottom` floats the image
 * `nolink` omits the link to the image source
 * `key=value` sets `align`, `border`, `width`, `height`, `alt`, `title`, \
`longdesc`, `class`, `id`, or `usemap`. `border` must be a number."
    }

    fn expand(&self, ctx: &MacroContext<'_>, _: &str, args: Option<&str>) -> Result<String> {
        static SIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+(?:%|px)?$").unwrap());
        static ATTR: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(align|border|width|height|alt|title|longdesc|class|id|usemap)=(.+)$")
                .unwrap()
        });

        let Some(args) = args.filter(|args| !args.is_empty()) else {
            return Ok(String::new());
        };
        let mut args = args.split(',');
        let filespec = args.next().unwrap_or_default().trim();

        let mut image = Image::default();
        let mut nolink = false;
        for arg in args.map(str::trim) {
            if SIZE.is_match(arg) {
                image.width = Some(arg.to_string());
            } else if arg == "nolink" {
                nolink = true;
            } else if matches!(arg, "left" | "right" | "top" | "bottom") {
                image.style.insert("float", arg.to_string());
            } else if let Some(captures) = ATTR.captures(arg) {
                let value = unquote(&captures[2]).to_string();
                match &captures[1] {
                    "align" => {
                        image.style.insert("float", value);
                    }
                    "border" => {
                        let width = value
                            .parse::<u32>()
                            .map_err(|_| Error::Macro(format!("invalid border width '{value}'")))?;
                        image.style.insert("border", format!(" {width}px solid"));
                    }
                    "width" => image.width = Some(value),
                    "height" => image.height = Some(value),
                    "alt" => image.alt = Some(value),
                    "title" => image.title = Some(value),
                    "longdesc" => image.longdesc = Some(value),
                    "class" => image.class = Some(value),
                    "id" => image.id = Some(value),
                    "usemap" => image.usemap = Some(value),
                    _ => {}
                }
            } else {
                log::debug!("ignoring unknown Image argument '{arg}'");
            }
        }

        let source = ImageSource::parse(ctx.wiki, filespec)?;
        if let Some(description) = source.description {
            image.title.get_or_insert_with(|| description.clone());
            image.alt.get_or_insert(description);
        }
        image.src = source.raw_url;

        let img = image.to_html();
        Ok(if nolink {
            img
        } else {
            Anchor::new(&source.url)
                .style("padding:0; border:none")
                .to_html(&img)
        })
    }
}

/// Where an image comes from.
#[derive(Debug)]
struct ImageSource {
    /// The URL to link to.
    url: String,
    /// The URL of the image data.
    raw_url: String,
    /// A description of the image.
    description: Option<String>,
}

impl ImageSource {
    /// Resolves an image file specification.
    fn parse(wiki: &Wiki, filespec: &str) -> Result<Self> {
        let parts = filespec.split(':').collect::<Vec<_>>();
        let (module, id, file) = match parts[..] {
            [module, id, file] => {
                if !matches!(module, "wiki" | "ticket") {
                    return Err(Error::Macro(format!("{module} module can't have attachments")));
                }
                (module, id, file)
            }
            ["htdocs", file] => {
                let url = format!("{}/chrome/site/{file}", wiki.config().base_url);
                return Ok(Self {
                    raw_url: url.clone(),
                    url,
                    description: Some(file.rsplit('/').next().unwrap_or(file).to_string()),
                });
            }
            [scheme @ ("http" | "https" | "ftp"), rest] => {
                let url = format!("{scheme}:{rest}");
                return Ok(Self {
                    raw_url: url.clone(),
                    description: Some(url.clone()),
                    url,
                });
            }
            [id, file] => match id.strip_prefix('#') {
                Some(ticket) => ("ticket", ticket, file),
                None => ("wiki", id, file),
            },
            [_] => {
                return Err(Error::Macro(
                    "Cannot reference local attachment from here".into(),
                ));
            }
            _ => return Err(Error::Macro("No filespec given".into())),
        };

        let url = format!("{}/{module}/{id}/{file}", wiki.config().attachment_url());
        Ok(Self {
            raw_url: format!("{url}?format=raw"),
            url,
            description: None,
        })
    }
}

/// `[[InterWiki]]`
#[derive(Debug)]
struct InterWikiMacro;

impl Macro for InterWikiMacro {
    fn description(&self) -> &str {
        "Provide a description list for the known InterWiki prefixes."
    }

    fn expand(&self, ctx: &MacroContext<'_>, _: &str, _: Option<&str>) -> Result<String> {
        let mut out = String::from(
            "<table class=\"wiki interwiki\"><tr><th><em>Prefix</em></th><th><em>Site</em></th></tr>",
        );
        for entry in ctx.wiki.interwiki().iter() {
            let recent_changes = interwiki::expand_or_append(&entry.url, &["RecentChanges"]);
            let description = if entry.title == entry.prefix {
                &entry.url
            } else {
                &entry.title
            };
            write!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                Anchor::new(&recent_changes).to_html(&escape(&entry.prefix)),
                Anchor::new(&entry.url).to_html(&escape(description))
            )?;
        }
        out += "</table>";
        Ok(out)
    }
}

/// `[[MacroList]]` or `[[MacroList(Name)]]`
#[derive(Debug)]
struct MacroListMacro;

impl Macro for MacroListMacro {
    fn description(&self) -> &str {
        "Displays a list of all installed wiki macros, including documentation \
if available.

Optionally, the name of a specific macro can be given as an argument. In \
that case, only the documentation for that macro is rendered."
    }

    fn expand(&self, ctx: &MacroContext<'_>, _: &str, args: Option<&str>) -> Result<String> {
        let only = args.map(str::trim).filter(|name| !name.is_empty());
        let mut out = String::from("<dl>");
        for (name, imp) in ctx.wiki.macros() {
            if only.is_some_and(|only| only != name) {
                continue;
            }
            write!(
                out,
                "<dt id=\"{}-macro\"><code>[[{}]]</code></dt><dd>{}</dd>",
                escape_attr(name),
                escape(name),
                ctx.wiki.to_html(imp.description())?
            )?;
        }
        out += "</dl>";
        Ok(out)
    }
}

/// `[[TitleIndex(prefix, depth=n)]]`
#[derive(Debug)]
struct TitleIndexMacro;

impl Macro for TitleIndexMacro {
    fn description(&self) -> &str {
        "Inserts an alphabetic list of all wiki pages into the output.

Accepts a prefix string as parameter: if provided, only pages with names \
that start with the prefix are included. `depth=n` limits the depth of the \
listed pages below the prefix; `0` lists only top-level pages."
    }

    fn expand(&self, ctx: &MacroContext<'_>, _: &str, args: Option<&str>) -> Result<String> {
        let mut prefix = "";
        let mut depth = None;
        for arg in split_args(args) {
            if let Some(value) = arg.strip_prefix("depth=") {
                depth = value
                    .parse::<isize>()
                    .map_err(|_| Error::Macro(format!("invalid depth '{value}'")))
                    .map(|depth| usize::try_from(depth).ok())?;
            } else if prefix.is_empty() {
                prefix = arg;
            }
        }

        let start = prefix.matches('/').count();
        let base_url = &ctx.wiki.config().base_url;
        let mut out = String::from("<ul>");
        for page in ctx.wiki.pages(prefix) {
            let level = page.matches('/').count().saturating_sub(start);
            if depth.is_some_and(|depth| level > depth) {
                continue;
            }
            write!(
                out,
                "<li>{}</li>",
                Anchor::new(&format!("{base_url}/wiki/{page}")).to_html(&escape(&page))
            )?;
        }
        out += "</ul>";
        Ok(out)
    }
}
