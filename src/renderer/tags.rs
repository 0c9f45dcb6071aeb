//! Plain HTML rendering functions.

use crate::common::{escape, escape_attr};
use core::fmt;
use indexmap::IndexMap;

/// The title given to images embedded through a bare link.
const DIRECT_IMAGE_WARNING: &str =
    "Warning: direct image links are deprecated, use [[Image(...)]] instead";

/// The attributes of a rendered `<a>` element.
#[derive(Debug, Default)]
pub(crate) struct Anchor<'a> {
    /// The `class` attribute.
    pub class: Option<&'a str>,
    /// The `href` attribute.
    pub href: &'a str,
    /// The `title` attribute. Empty titles are not rendered.
    pub title: Option<&'a str>,
    /// The `rel` attribute.
    pub rel: Option<&'a str>,
    /// The `style` attribute.
    pub style: Option<&'a str>,
}

impl<'a> Anchor<'a> {
    /// Creates a new anchor pointing to `href`.
    pub fn new(href: &'a str) -> Self {
        Self {
            href,
            ..Default::default()
        }
    }

    /// Sets the class.
    #[must_use]
    pub fn class(mut self, class: &'a str) -> Self {
        self.class = Some(class);
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title).filter(|title| !title.is_empty());
        self
    }

    /// Sets the link relation.
    #[must_use]
    pub fn rel(mut self, rel: &'a str) -> Self {
        self.rel = Some(rel);
        self
    }

    /// Sets the inline style.
    #[must_use]
    pub fn style(mut self, style: &'a str) -> Self {
        self.style = Some(style);
        self
    }

    /// Renders the anchor around some already-escaped content.
    pub fn render<W: fmt::Write + ?Sized>(&self, out: &mut W, content: &str) -> fmt::Result {
        out.write_str("<a")?;
        render_attribute(out, "class", self.class)?;
        render_attribute(out, "href", Some(self.href))?;
        render_attribute(out, "title", self.title)?;
        render_attribute(out, "rel", self.rel)?;
        render_attribute(out, "style", self.style)?;
        write!(out, ">{content}</a>")
    }

    /// Renders the anchor around some already-escaped content into a new
    /// string.
    pub fn to_html(&self, content: &str) -> String {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.render(&mut out, content);
        out
    }
}

/// The attributes of a rendered `<img>` element.
///
/// Only this closed set of attributes can ever be emitted. Style properties
/// are kept in insertion order.
#[derive(Debug, Default)]
pub(crate) struct Image {
    /// The image source URL.
    pub src: String,
    /// Alternative text.
    pub alt: Option<String>,
    /// Advisory title.
    pub title: Option<String>,
    /// Rendered width.
    pub width: Option<String>,
    /// Rendered height.
    pub height: Option<String>,
    /// CSS classes.
    pub class: Option<String>,
    /// Element ID.
    pub id: Option<String>,
    /// Long description URL.
    pub longdesc: Option<String>,
    /// Client-side image map.
    pub usemap: Option<String>,
    /// CSS properties.
    pub style: IndexMap<&'static str, String>,
}

impl Image {
    /// Renders the image.
    pub fn render<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        out.write_str("<img")?;
        render_attribute(out, "src", Some(&self.src))?;
        render_attribute(out, "alt", self.alt.as_deref())?;
        render_attribute(out, "title", self.title.as_deref())?;
        render_attribute(out, "width", self.width.as_deref())?;
        render_attribute(out, "height", self.height.as_deref())?;
        render_attribute(out, "class", self.class.as_deref())?;
        render_attribute(out, "id", self.id.as_deref())?;
        render_attribute(out, "longdesc", self.longdesc.as_deref())?;
        render_attribute(out, "usemap", self.usemap.as_deref())?;
        if !self.style.is_empty() {
            let style = self
                .style
                .iter()
                .map(|(key, value)| format!("{key}:{value}"))
                .collect::<Vec<_>>()
                .join("; ");
            render_attribute(out, "style", Some(&style))?;
        }
        out.write_str(" />")
    }

    /// Renders the image into a new string.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.render(&mut out);
        out
    }
}

/// Renders a single ` name="value"` attribute, if there is a value.
fn render_attribute<W: fmt::Write + ?Sized>(
    out: &mut W,
    name: &str,
    value: Option<&str>,
) -> fmt::Result {
    if let Some(value) = value {
        write!(out, " {name}=\"{}\"", escape_attr(value))?;
    }
    Ok(())
}

/// Renders an image which was embedded by linking directly to its URL.
pub(crate) fn direct_image(src: &str, alt: &str) -> String {
    Image {
        src: src.to_string(),
        alt: Some(alt.to_string()),
        title: Some(DIRECT_IMAGE_WARNING.to_string()),
        ..Default::default()
    }
    .to_html()
}

/// Renders an inline error box. `message` must already be HTML; `text` is
/// escaped.
pub(crate) fn system_message(message: &str, text: &str) -> String {
    format!(
        "<div class=\"system-message\">\n <strong>{message}</strong>\n <pre>{}</pre>\n</div>\n",
        escape(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor() {
        assert_eq!(
            Anchor::new("http://x/?a=1&b=2")
                .class("ext-link")
                .title("")
                .to_html("<span class=\"icon\">x</span>"),
            r#"<a class="ext-link" href="http://x/?a=1&amp;b=2"><span class="icon">x</span></a>"#
        );
        assert_eq!(
            Anchor::new("/wiki/Foo")
                .class("missing wiki")
                .rel("nofollow")
                .to_html("Foo?"),
            r#"<a class="missing wiki" href="/wiki/Foo" rel="nofollow">Foo?</a>"#
        );
    }

    #[test]
    fn image() {
        let mut image = Image {
            src: "/raw/a.png".to_string(),
            alt: Some("\"quoted\"".to_string()),
            width: Some("50%".to_string()),
            ..Default::default()
        };
        image.style.insert("float", "right".to_string());
        image.style.insert("border", " 2px solid".to_string());
        assert_eq!(
            image.to_html(),
            r#"<img src="/raw/a.png" alt="&quot;quoted&quot;" width="50%" style="float:right; border: 2px solid" />"#
        );
    }

    #[test]
    fn system_message() {
        assert_eq!(
            super::system_message("Error: <code>x</code>", "a < b"),
            "<div class=\"system-message\">\n <strong>Error: <code>x</code></strong>\n <pre>a &lt; b</pre>\n</div>\n"
        );
    }
}
