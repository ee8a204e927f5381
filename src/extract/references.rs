//! Inline footnote reference rewriting
//!
//! Rewrites reference markers in the body to plain `[n]` text. For each
//! link, the first matching rule wins:
//!
//! 1. `#target` equals a known footnote id: the footnote's sequence number
//! 2. the first number embedded in the target is a known sequence number: that number
//! 3. the class looks like a footnote reference, or the text is a short number: the text itself
//!
//! Afterwards any superscript holding only a short number is rewritten too,
//! with or without a link around it.

use crate::config::FootnoteConfig;
use crate::extract::dom::{replace_with_text, selector, trimmed_text};
use crate::extract::footnotes::ReferenceMapping;
use crate::extract::RenderError;
use ego_tree::NodeId;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html};

/// Which rule rewrote a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRule {
    ExactId,
    EmbeddedNumber,
    MarkerText,
}

/// Rewrites inline references using a page's [`ReferenceMapping`]
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    class_pattern: Regex,
    max_ref_text_chars: usize,
    max_sup_digits: usize,
}

impl ReferenceResolver {
    pub fn new(config: &FootnoteConfig) -> Result<Self, RenderError> {
        let class_pattern = RegexBuilder::new(&config.reference_class_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RenderError::Pattern(format!("{}: {}", config.reference_class_pattern, e)))?;

        Ok(Self {
            class_pattern,
            max_ref_text_chars: config.max_ref_text_chars,
            max_sup_digits: config.max_sup_digits,
        })
    }

    /// Decides how a link would be rewritten, without touching the tree
    pub fn resolve_link(&self, a: &ElementRef, mapping: &ReferenceMapping) -> Option<(ReferenceRule, String)> {
        let href = a.value().attr("href").unwrap_or("");
        let text = trimmed_text(a);

        if let Some(target) = href.strip_prefix('#') {
            if let Some(n) = mapping.by_id(target) {
                return Some((ReferenceRule::ExactId, bracket(n)));
            }
            if let Some(n) = first_number(target) {
                if mapping.is_known(n) {
                    return Some((ReferenceRule::EmbeddedNumber, bracket(n)));
                }
            }
        }

        let class = a.value().attr("class").unwrap_or("");
        let looks_like_marker = self.class_pattern.is_match(class) || is_number(&text);
        if looks_like_marker && !text.is_empty() && text.chars().count() <= self.max_ref_text_chars {
            return Some((ReferenceRule::MarkerText, format!("[{}]", text)));
        }

        None
    }

    /// Rewrites every reference marker in the document
    ///
    /// Returns the number of markers rewritten.
    pub fn resolve(&self, html: &mut Html, mapping: &ReferenceMapping) -> usize {
        let mut rewrites: Vec<(NodeId, String)> = Vec::new();

        for a in html.select(&selector("a")) {
            if let Some((rule, replacement)) = self.resolve_link(&a, mapping) {
                tracing::trace!(?rule, replacement = %replacement, "Reference rewritten");
                rewrites.push((sole_sup_parent(&a).unwrap_or(a.id()), replacement));
            }
        }
        let mut count = apply(html, &rewrites);

        let sups: Vec<(NodeId, String)> = html
            .select(&selector("sup"))
            .filter_map(|sup| {
                let text = trimmed_text(&sup);
                (is_number(&text) && text.chars().count() <= self.max_sup_digits)
                    .then(|| (sup.id(), format!("[{}]", text)))
            })
            .collect();
        count += apply(html, &sups);

        count
    }
}

fn apply(html: &mut Html, rewrites: &[(NodeId, String)]) -> usize {
    for (id, text) in rewrites {
        replace_with_text(html, *id, text);
    }
    rewrites.len()
}

fn bracket(n: usize) -> String {
    format!("[{}]", n)
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_numeric)
}

/// First run of ASCII digits in `s`
fn first_number(s: &str) -> Option<usize> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// The enclosing `sup` if the link is its only visible content
fn sole_sup_parent(a: &ElementRef) -> Option<NodeId> {
    let parent = a.parent().and_then(ElementRef::wrap)?;
    if parent.value().name() != "sup" {
        return None;
    }
    (trimmed_text(&parent) == trimmed_text(a)).then(|| parent.id())
}
