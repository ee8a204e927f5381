//! Content root selection
//!
//! Picks the subtree holding the article body after noise removal:
//! `<main>`, else `<article>`, else the longest element whose id or class
//! carries a content keyword, else `<body>`. Remaining chrome inside the
//! chosen subtree is stripped before it is handed to the renderer.

use crate::config::ContentConfig;
use crate::extract::dom::{class_contains_any, detach_all, normalized_text, selector};
use ego_tree::NodeId;
use scraper::{ElementRef, Html};

/// How the content root was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Main,
    Article,
    Keyword,
    Body,
    Document,
}

/// Chooses and cleans the content root
#[derive(Debug, Clone)]
pub struct ContentSelector {
    config: ContentConfig,
}

impl ContentSelector {
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Finds the content root without modifying the document
    pub fn find(&self, html: &Html) -> (NodeId, ContentSource) {
        if let Some(main) = html.select(&selector("main")).next() {
            return (main.id(), ContentSource::Main);
        }
        if let Some(article) = html.select(&selector("article")).next() {
            return (article.id(), ContentSource::Article);
        }
        if let Some(id) = self.best_keyword_candidate(html) {
            return (id, ContentSource::Keyword);
        }
        match html.select(&selector("body")).next() {
            Some(body) => (body.id(), ContentSource::Body),
            None => (html.root_element().id(), ContentSource::Document),
        }
    }

    /// Finds the content root and strips chrome inside it
    pub fn select(&self, html: &mut Html) -> (NodeId, ContentSource) {
        let (root, source) = self.find(html);
        let stripped = self.strip_chrome(html, root);
        tracing::debug!(?source, stripped, "Content root selected");
        (root, source)
    }

    /// Among elements whose id or class contains a content keyword, picks the
    /// one with the most text. For each attribute and keyword only the first
    /// match in document order is a candidate.
    fn best_keyword_candidate(&self, html: &Html) -> Option<NodeId> {
        let all = selector("*");
        let mut best: Option<(usize, NodeId)> = None;

        for attr in ["id", "class"] {
            for keyword in &self.config.content_keywords {
                if keyword.is_empty() {
                    continue;
                }
                let found = html.select(&all).find(|el| {
                    el.value()
                        .attr(attr)
                        .is_some_and(|v| v.contains(keyword.as_str()))
                        && !normalized_text(el).is_empty()
                });
                if let Some(el) = found {
                    let len = normalized_text(&el).chars().count();
                    if best.map_or(true, |(best_len, _)| len > best_len) {
                        best = Some((len, el.id()));
                    }
                }
            }
        }

        best.map(|(_, id)| id)
    }

    /// True for structural chrome: nav/header/footer/aside tags or a chrome class
    pub fn is_chrome(&self, el: &ElementRef) -> bool {
        let name = el.value().name();
        self.config.chrome_tags.iter().any(|t| t == name)
            || class_contains_any(el, &self.config.chrome_class_markers)
    }

    /// Detaches every chrome descendant of `root`
    pub fn strip_chrome(&self, html: &mut Html, root: NodeId) -> usize {
        let Some(root_el) = html.tree.get(root).and_then(ElementRef::wrap) else {
            return 0;
        };
        let ids: Vec<NodeId> = root_el
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| self.is_chrome(el))
            .map(|el| el.id())
            .collect();
        detach_all(html, &ids)
    }
}
