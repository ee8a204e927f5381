//! Noise classification
//!
//! Each rule is a named predicate over one element so it can be regression
//! tested against fixture markup in isolation. The `remove_*` methods apply
//! a predicate across the document in two phases: collect matching node ids,
//! then detach them.
//!
//! Rules:
//!
//! - strip tags: scripts, styles, forms and the like are dropped outright
//! - banner image: the site header `h1` wrapping the banner image (first only)
//! - banner heading: an `h1`..`h4` matching "<section> N / <subsection> M" (first only)
//! - nav table: centered tables or tables linking into sibling collections (all)
//! - link index: containers dominated by short internal links (repeated)
//! - keyword nav: containers repeating navigation keywords (repeated)

use crate::config::NoiseConfig;
use crate::extract::dom::{detach_all, is_within, normalized_text, selector, trimmed_text, try_selector};
use crate::extract::RenderError;
use ego_tree::NodeId;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html};

/// Containers considered by the link-index and keyword-nav rules
const NAV_BLOCK_TAGS: &str = "div, nav, aside, ul, section";

/// Heading levels searched for the banner heading, in search order
const BANNER_HEADING_TAGS: [&str; 4] = ["h1", "h2", "h3", "h4"];

/// What one cleaning pass removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NoiseReport {
    pub stripped_tags: usize,
    pub banner_image: bool,
    pub banner_heading: bool,
    pub nav_tables: usize,
    pub nav_blocks: usize,
}

/// Applies the noise rules configured in [`NoiseConfig`]
#[derive(Debug, Clone)]
pub struct NoiseClassifier {
    config: NoiseConfig,
    banner_patterns: Vec<Regex>,
}

impl NoiseClassifier {
    /// Compiles the banner patterns
    pub fn new(config: &NoiseConfig) -> Result<Self, RenderError> {
        let banner_patterns = compile_banner_patterns(&config.banner_heading_patterns)?;
        Ok(Self {
            config: config.clone(),
            banner_patterns,
        })
    }

    /// Runs every rule over the document
    pub fn clean(&self, html: &mut Html) -> NoiseReport {
        let report = NoiseReport {
            stripped_tags: self.strip_tags(html),
            banner_image: self.remove_banner_image(html),
            banner_heading: self.remove_banner_heading(html),
            nav_tables: self.remove_nav_tables(html),
            nav_blocks: self.remove_nav_blocks(html),
        };
        tracing::debug!(?report, "Noise removed");
        report
    }

    /// Removes script, style, form and similar elements
    pub fn strip_tags(&self, html: &mut Html) -> usize {
        let mut ids = Vec::new();
        for tag in &self.config.strip_tags {
            let Some(sel) = try_selector(tag) else {
                tracing::warn!(tag = %tag, "Ignoring invalid strip tag");
                continue;
            };
            ids.extend(html.select(&sel).map(|el| el.id()));
        }
        detach_all(html, &ids)
    }

    /// True for an `h1` wrapping the configured banner image
    pub fn is_banner_image(&self, el: &ElementRef) -> bool {
        if self.config.banner_image_marker.is_empty() || el.value().name() != "h1" {
            return false;
        }
        el.select(&selector("img")).any(|img| {
            img.value()
                .attr("src")
                .is_some_and(|src| src.contains(&self.config.banner_image_marker))
        })
    }

    /// Removes the first banner-image heading
    pub fn remove_banner_image(&self, html: &mut Html) -> bool {
        let found = html
            .select(&selector("h1"))
            .find(|el| self.is_banner_image(el))
            .map(|el| el.id());
        remove_one(html, found)
    }

    /// True for a heading whose text matches a banner pattern
    pub fn is_banner_heading(&self, el: &ElementRef) -> bool {
        if !BANNER_HEADING_TAGS.contains(&el.value().name()) {
            return false;
        }
        let text = normalized_text(el);
        !text.is_empty() && self.banner_patterns.iter().any(|re| re.is_match(&text))
    }

    /// Removes the first banner heading, searching `h1` before `h2` and so on
    pub fn remove_banner_heading(&self, html: &mut Html) -> bool {
        let found = BANNER_HEADING_TAGS.iter().find_map(|tag| {
            html.select(&selector(tag))
                .find(|el| self.is_banner_heading(el))
                .map(|el| el.id())
        });
        remove_one(html, found)
    }

    /// True for a centered table or one linking into a sibling collection
    pub fn is_nav_table(&self, el: &ElementRef) -> bool {
        if el.value().name() != "table" {
            return false;
        }

        let style: String = el
            .value()
            .attr("style")
            .unwrap_or("")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if style.contains("margin:auto") {
            return true;
        }

        el.select(&selector("a[href]")).any(|a| {
            let href = a.value().attr("href").unwrap_or("");
            self.config
                .nav_table_link_prefixes
                .iter()
                .any(|p| !p.is_empty() && href.contains(p.as_str()))
        })
    }

    /// Removes every nav table
    pub fn remove_nav_tables(&self, html: &mut Html) -> usize {
        let ids: Vec<NodeId> = html
            .select(&selector("table"))
            .filter(|el| self.is_nav_table(el))
            .map(|el| el.id())
            .collect();
        detach_all(html, &ids)
    }

    /// True for a container dominated by short internal links
    ///
    /// Requires at least `min_links` links. The links must be short (enough of
    /// them under `short_link_chars`, or a short average) and mostly internal.
    pub fn is_link_index(&self, el: &ElementRef) -> bool {
        let cfg = &self.config;
        let links: Vec<ElementRef> = el.select(&selector("a")).collect();
        let n = links.len();
        if n < cfg.min_links {
            return false;
        }

        let lengths: Vec<usize> = links
            .iter()
            .map(|a| trimmed_text(a).chars().count())
            .collect();
        let short = lengths.iter().filter(|&&len| len < cfg.short_link_chars).count();
        let average = lengths.iter().sum::<usize>() as f64 / n as f64;

        let short_floor = cfg.min_short_links.max(fraction_of(cfg.short_link_ratio, n));
        if short < short_floor && average >= cfg.short_link_chars as f64 {
            return false;
        }

        let internal = links
            .iter()
            .filter(|a| {
                let href = a.value().attr("href").unwrap_or("");
                cfg.internal_link_prefixes
                    .iter()
                    .any(|p| !p.is_empty() && href.starts_with(p.as_str()))
            })
            .count();
        internal >= cfg.min_internal_links.max(fraction_of(cfg.internal_link_ratio, n))
    }

    /// True for a container whose text repeats navigation keywords
    pub fn is_keyword_nav(&self, el: &ElementRef) -> bool {
        let text = normalized_text(el);
        let hits: usize = self
            .config
            .nav_keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| text.matches(k.as_str()).count())
            .sum();
        hits >= self.config.min_keyword_hits
    }

    fn is_nav_block(&self, el: &ElementRef) -> bool {
        self.is_link_index(el) || self.is_keyword_nav(el)
    }

    /// Removes link indexes and keyword nav blocks until none remain
    ///
    /// Only the innermost matching containers are removed in each round, then
    /// the tree is re-evaluated. An outer wrapper that matched only because
    /// of a nested nav block survives once that block is gone.
    pub fn remove_nav_blocks(&self, html: &mut Html) -> usize {
        let blocks = selector(NAV_BLOCK_TAGS);
        let mut removed = 0;

        loop {
            let matching: Vec<NodeId> = html
                .select(&blocks)
                .filter(|el| self.is_nav_block(el))
                .map(|el| el.id())
                .collect();

            let innermost: Vec<NodeId> = matching
                .iter()
                .copied()
                .filter(|&outer| {
                    !matching
                        .iter()
                        .any(|&inner| inner != outer && is_within(html, inner, outer))
                })
                .collect();

            if innermost.is_empty() {
                break;
            }
            removed += detach_all(html, &innermost);
        }

        removed
    }
}

fn compile_banner_patterns(patterns: &[String]) -> Result<Vec<Regex>, RenderError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| RenderError::Pattern(format!("{}: {}", p, e)))
        })
        .collect()
}

/// `floor(ratio * n)`
fn fraction_of(ratio: f64, n: usize) -> usize {
    (ratio * n as f64).floor() as usize
}

fn remove_one(html: &mut Html, id: Option<NodeId>) -> bool {
    match id {
        Some(id) => detach_all(html, &[id]) == 1,
        None => false,
    }
}
