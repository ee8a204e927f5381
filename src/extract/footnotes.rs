//! Footnote extraction
//!
//! The site keeps every footnote of a page in one container
//! (`<div id="footnotes">` on most pages). Entries are enumerated, cleaned of
//! back-reference links, rendered, and numbered 1..N in document order. The
//! container is then detached so its text never shows up twice.

use crate::config::FootnoteConfig;
use crate::extract::dom::{
    class_contains_any, detach_all, normalized_text, selector, text_of,
};
use crate::extract::render::MarkupRenderer;
use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One extracted footnote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootnoteRecord {
    /// The entry's `id` attribute, if the site assigned one
    pub local_id: Option<String>,
    /// Position in extraction order, starting at 1
    pub sequence_number: usize,
    /// Entry markup after back-reference removal
    pub body_markup: String,
    /// Entry rendered to flat text
    pub rendered_text: String,
}

/// Lookup from site ids and bare numbers to sequence numbers
///
/// Built once per page from its records and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMapping {
    by_id: HashMap<String, usize>,
    known: HashSet<usize>,
}

impl ReferenceMapping {
    /// Builds the mapping. If two entries share an id, the first one wins.
    pub fn from_records(records: &[FootnoteRecord]) -> Self {
        let mut by_id = HashMap::new();
        let mut known = HashSet::new();
        for record in records {
            if let Some(id) = &record.local_id {
                by_id.entry(id.clone()).or_insert(record.sequence_number);
            }
            known.insert(record.sequence_number);
        }
        Self { by_id, known }
    }

    pub fn by_id(&self, local_id: &str) -> Option<usize> {
        self.by_id.get(local_id).copied()
    }

    pub fn is_known(&self, sequence_number: usize) -> bool {
        self.known.contains(&sequence_number)
    }

}

/// Locates, enumerates and detaches the footnote container
#[derive(Debug, Clone)]
pub struct FootnoteExtractor {
    config: FootnoteConfig,
}

impl FootnoteExtractor {
    pub fn new(config: &FootnoteConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Finds the container: a `div` with the configured id, else the first
    /// `div` whose class contains the configured marker
    pub fn find_container(&self, html: &Html) -> Option<NodeId> {
        let divs = selector("div");
        let cfg = &self.config;

        if !cfg.container_id.is_empty() {
            if let Some(el) = html
                .select(&divs)
                .find(|el| el.value().attr("id") == Some(cfg.container_id.as_str()))
            {
                return Some(el.id());
            }
        }

        if cfg.container_class.is_empty() {
            return None;
        }
        html.select(&divs)
            .find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|c| c.contains(cfg.container_class.as_str()))
            })
            .map(|el| el.id())
    }

    /// Extracts all footnotes and detaches their container
    ///
    /// Returns an empty list when the page has no container.
    pub fn extract(&self, html: &mut Html, renderer: &dyn MarkupRenderer) -> Vec<FootnoteRecord> {
        let Some(container) = self.find_container(html) else {
            return Vec::new();
        };

        let doc: &Html = html;
        let entries = entries_of(doc, container);

        // Cleanup first, across all entries, then read the markup back
        let self_refs: Vec<NodeId> = entries
            .iter()
            .flat_map(|&entry| self.self_references(doc, entry))
            .collect();
        detach_all(html, &self_refs);

        let records: Vec<FootnoteRecord> = entries
            .iter()
            .enumerate()
            .filter_map(|(i, &entry)| {
                let el = html.tree.get(entry).and_then(ElementRef::wrap)?;
                let body_markup = el.inner_html().trim().to_string();
                let rendered_text = render_entry(&el, &body_markup, renderer);
                Some(FootnoteRecord {
                    local_id: el.value().attr("id").map(str::to_string),
                    sequence_number: i + 1,
                    body_markup,
                    rendered_text,
                })
            })
            .collect();

        detach_all(html, &[container]);
        tracing::debug!(count = records.len(), "Footnotes extracted");
        records
    }

    /// True for a link that points back into the page
    fn is_self_reference(&self, a: &ElementRef) -> bool {
        let href = a.value().attr("href").unwrap_or("");
        href.starts_with('#') || class_contains_any(a, &self.config.back_link_class_markers)
    }

    /// Collects back-reference links inside an entry. A superscript whose
    /// only content is such a link is collected in place of the link.
    fn self_references(&self, html: &Html, entry: NodeId) -> Vec<NodeId> {
        let Some(entry_el) = html.tree.get(entry).and_then(ElementRef::wrap) else {
            return Vec::new();
        };

        let links: Vec<ElementRef> = entry_el
            .select(&selector("a"))
            .filter(|a| self.is_self_reference(a))
            .collect();

        let mut ids = Vec::new();
        let mut covered = HashSet::new();
        for sup in entry_el.select(&selector("sup")) {
            let inner: Vec<&ElementRef> = links
                .iter()
                .filter(|a| a.ancestors().any(|n| n.id() == sup.id()))
                .collect();
            if inner.is_empty() {
                continue;
            }
            let inner_text: usize = inner.iter().map(|a| text_of(a).trim().len()).sum();
            if text_of(&sup).trim().len() == inner_text {
                ids.push(sup.id());
                covered.extend(inner.iter().map(|a| a.id()));
            }
        }

        ids.extend(
            links
                .iter()
                .map(|a| a.id())
                .filter(|id| !covered.contains(id)),
        );
        ids
    }
}

/// Enumerates entries: direct `li` children of the first `ol`, else direct
/// `li`/`div`/`p` children, else the container itself
fn entries_of(html: &Html, container: NodeId) -> Vec<NodeId> {
    let Some(el) = html.tree.get(container).and_then(ElementRef::wrap) else {
        return Vec::new();
    };

    if let Some(ol) = el.select(&selector("ol")).next() {
        let items = direct_children(&ol, &["li"]);
        if !items.is_empty() {
            return items;
        }
    }

    let children = direct_children(&el, &["li", "div", "p"]);
    if !children.is_empty() {
        return children;
    }

    vec![container]
}

fn direct_children(el: &ElementRef, names: &[&str]) -> Vec<NodeId> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| names.contains(&child.value().name()))
        .map(|child| child.id())
        .collect()
}

/// Renders entry markup, falling back to its plain text
fn render_entry(el: &ElementRef, markup: &str, renderer: &dyn MarkupRenderer) -> String {
    match renderer.render(markup) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => normalized_text(el),
        Err(e) => {
            tracing::debug!(error = %e, "Footnote render failed, using plain text");
            normalized_text(el)
        }
    }
}
