//! Page rendering
//!
//! Turns the selected content markup and the page's footnote records into
//! the final page text: markup converted with `#`-style headings, residual
//! banner headings dropped, a footnotes section appended, blank-line runs
//! collapsed.

use crate::config::Config;
use crate::extract::footnotes::FootnoteRecord;
use crate::extract::RenderError;
use htmd::options::{HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Three or more line breaks, allowing horizontal whitespace between them
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("BUG: hardcoded regex is invalid"));

/// A bracketed reference the converter escaped, e.g. `\[3\]`
static ESCAPED_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\[(\w{1,6})\\?\]").expect("BUG: hardcoded regex is invalid"));

/// Leading enumeration such as `1. ` left over from a list item
static LEADING_ENUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\\?\.\s*").expect("BUG: hardcoded regex is invalid"));

/// Converts a markup fragment to flat text with `#`-style headings
pub trait MarkupRenderer {
    fn render(&self, markup: &str) -> Result<String, RenderError>;
}

/// [`MarkupRenderer`] backed by htmd
pub struct HtmdRenderer {
    converter: HtmlToMarkdown,
}

impl HtmdRenderer {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .options(Options {
                heading_style: HeadingStyle::Atx,
                ..Default::default()
            })
            .skip_tags(vec!["script", "style", "head"])
            .build();
        Self { converter }
    }
}

impl Default for HtmdRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupRenderer for HtmdRenderer {
    fn render(&self, markup: &str) -> Result<String, RenderError> {
        let text = self.converter.convert(markup)?;
        Ok(unescape_references(&text))
    }
}

/// Assembles page text from content markup and footnotes
pub struct PageRenderer {
    renderer: Box<dyn MarkupRenderer>,
    banner_lines: Vec<Regex>,
    footnote_heading: String,
}

impl PageRenderer {
    pub fn new(config: &Config, renderer: Box<dyn MarkupRenderer>) -> Result<Self, RenderError> {
        let banner_lines = config
            .noise
            .banner_heading_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(&format!(r"^(?:#{{1,6}}[ \t]*(?:{})[ \t]*(?:\n+|$))+", p))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| RenderError::Pattern(format!("{}: {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            renderer,
            banner_lines,
            footnote_heading: config.footnotes.heading.clone(),
        })
    }

    /// The underlying markup renderer, shared with the footnote extractor
    pub fn markup_renderer(&self) -> &dyn MarkupRenderer {
        self.renderer.as_ref()
    }

    /// Renders the content subtree to text without footnotes
    pub fn render_body(&self, content_markup: &str) -> Result<String, RenderError> {
        let text = self.renderer.render(content_markup)?;
        let text = self.strip_banner_lines(text.trim());
        Ok(normalize_blank_lines(text.trim()))
    }

    /// Page text: rendered body, then its footnotes section if it has any
    pub fn page_text(&self, body: &str, footnotes: &[FootnoteRecord]) -> String {
        if footnotes.is_empty() {
            return body.to_string();
        }
        let combined = format!("{}\n\n{}", body, self.footnotes_section(footnotes));
        normalize_blank_lines(combined.trim())
    }

    /// `## <heading>` followed by one `[n] text` line per record
    pub fn footnotes_section(&self, footnotes: &[FootnoteRecord]) -> String {
        format!("## {}\n\n{}", self.footnote_heading, footnote_lines(footnotes))
    }

    /// One combined section for the whole document, grouped by page label
    pub fn combined_footnotes_section(&self, pages: &[(String, Vec<FootnoteRecord>)]) -> String {
        let groups: Vec<String> = pages
            .iter()
            .filter(|(_, notes)| !notes.is_empty())
            .map(|(label, notes)| format!("### {}\n\n{}", label, footnote_lines(notes)))
            .collect();
        format!("## {}\n\n{}", self.footnote_heading, groups.join("\n\n"))
    }

    /// Drops leading banner heading lines that survived markup cleaning
    fn strip_banner_lines(&self, text: &str) -> String {
        self.banner_lines
            .iter()
            .fold(text.to_string(), |acc, re| re.replace(&acc, "").into_owned())
    }
}

fn footnote_lines(footnotes: &[FootnoteRecord]) -> String {
    footnotes
        .iter()
        .map(|f| {
            let text = footnote_text(&f.rendered_text);
            if text.is_empty() {
                format!("[{}]", f.sequence_number)
            } else {
                format!("[{}] {}", f.sequence_number, text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Flattens a rendered footnote onto one line and drops a leading `1. `
fn footnote_text(rendered: &str) -> String {
    let text = LEADING_ENUM.replace(rendered.trim(), "");
    let text = unescape_references(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Restores `[n]` markers escaped by the converter
pub fn unescape_references(text: &str) -> String {
    ESCAPED_REF.replace_all(text, "[$1]").into_owned()
}

/// Collapses every run of three or more line breaks to exactly two
///
/// Idempotent: `normalize_blank_lines(normalize_blank_lines(s)) == normalize_blank_lines(s)`.
pub fn normalize_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}
