//! Page extraction pipeline
//!
//! Turns one fetched page body into clean page text:
//!
//! 1. parse the body and capture the "next page" link from the untouched tree
//! 2. drop script/style/form elements
//! 3. extract footnotes and detach their container
//! 4. remove noise (banner headings, nav tables, link indexes, keyword nav)
//! 5. rewrite inline footnote references to `[n]`
//! 6. select the content root and strip remaining chrome
//! 7. render content and footnotes to text
//!
//! Structural anomalies never fail a page: a missing content root falls back
//! to `<body>`, a missing footnote container yields no footnotes.

mod content;
pub(crate) mod dom;
mod footnotes;
mod noise;
mod references;
mod render;

pub use content::{ContentSelector, ContentSource};
pub use footnotes::{FootnoteExtractor, FootnoteRecord, ReferenceMapping};
pub use noise::{NoiseClassifier, NoiseReport};
pub use references::{ReferenceResolver, ReferenceRule};
pub use render::{
    normalize_blank_lines, unescape_references, HtmdRenderer, MarkupRenderer, PageRenderer,
};

use crate::config::Config;
use crate::url::resolve_and_normalize;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while turning a page into text
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Markup conversion failed: {0}")]
    Convert(#[from] std::io::Error),
}

/// Result of processing one page
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// Body text without the footnotes section
    pub body: String,
    /// Extracted footnotes, numbered 1..N
    pub footnotes: Vec<FootnoteRecord>,
    /// The resolved, normalized "next page" link, if the page has one
    pub next_url: Option<Url>,
    /// What the noise classifier removed
    pub noise: NoiseReport,
    /// How the content root was found
    pub content_source: ContentSource,
}

/// The configured extraction pipeline
pub struct PagePipeline {
    next_link: Selector,
    noise: NoiseClassifier,
    content: ContentSelector,
    footnotes: FootnoteExtractor,
    references: ReferenceResolver,
    renderer: PageRenderer,
}

impl PagePipeline {
    /// Builds the pipeline with the htmd renderer
    pub fn new(config: &Config) -> Result<Self, RenderError> {
        Self::with_renderer(config, Box::new(HtmdRenderer::new()))
    }

    /// Builds the pipeline with a custom markup renderer
    pub fn with_renderer(config: &Config, renderer: Box<dyn MarkupRenderer>) -> Result<Self, RenderError> {
        let next_link = Selector::parse(&config.crawl.next_link_selector)
            .map_err(|e| RenderError::Selector(format!("{}: {}", config.crawl.next_link_selector, e)))?;

        Ok(Self {
            next_link,
            noise: NoiseClassifier::new(&config.noise)?,
            content: ContentSelector::new(&config.content),
            footnotes: FootnoteExtractor::new(&config.footnotes),
            references: ReferenceResolver::new(&config.footnotes)?,
            renderer: PageRenderer::new(config, renderer)?,
        })
    }

    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    /// Processes one page body fetched from `page_url`
    pub fn process(&self, body: &str, page_url: &Url) -> Result<ProcessedPage, RenderError> {
        let mut html = Html::parse_document(body);

        // Chrome removal may delete the element carrying the link
        let next_url = find_next_link(&html, &self.next_link, page_url);

        let stripped_tags = self.noise.strip_tags(&mut html);
        let footnotes = self.footnotes.extract(&mut html, self.renderer.markup_renderer());

        let noise = NoiseReport {
            stripped_tags,
            banner_image: self.noise.remove_banner_image(&mut html),
            banner_heading: self.noise.remove_banner_heading(&mut html),
            nav_tables: self.noise.remove_nav_tables(&mut html),
            nav_blocks: self.noise.remove_nav_blocks(&mut html),
        };

        let mapping = ReferenceMapping::from_records(&footnotes);
        let rewritten = self.references.resolve(&mut html, &mapping);

        let (root, content_source) = self.content.select(&mut html);
        let markup = html
            .tree
            .get(root)
            .and_then(ElementRef::wrap)
            .map(|el| el.html())
            .unwrap_or_default();

        let body = self.renderer.render_body(&markup)?;

        tracing::debug!(
            url = %page_url,
            footnotes = footnotes.len(),
            references = rewritten,
            ?content_source,
            ?noise,
            "Page processed"
        );

        Ok(ProcessedPage {
            body,
            footnotes,
            next_url,
            noise,
            content_source,
        })
    }

    /// Processes one page and renders it with its own footnotes section
    pub fn process_page(&self, body: &str, page_url: &Url) -> Result<(String, ProcessedPage), RenderError> {
        let page = self.process(body, page_url)?;
        let text = self.renderer.page_text(&page.body, &page.footnotes);
        Ok((text, page))
    }
}

/// Resolves the first link matching `selector` against `base`
///
/// Links that don't resolve to an http(s) URL are ignored.
pub fn find_next_link(html: &Html, selector: &Selector, base: &Url) -> Option<Url> {
    html.select(selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .and_then(|href| resolve_and_normalize(base, href).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> PagePipeline {
        PagePipeline::new(&Config::default()).unwrap()
    }

    fn base() -> Url {
        Url::parse("https://example.org/harililamrut/index.php?kalash=1&vishram=1").unwrap()
    }

    const PAGE: &str = r##"<html><head><title>Harililamrut</title><script>track()</script></head>
<body>
<div id="header"><h1><img src="/images/harililamrut-header.jpg"></h1></div>
<div class="menu">Kalash 1 Kalash 2 Kalash 3 Vishram 1 Vishram 2 Vishram 3</div>
<table style="margin: auto"><tr><td><a href="/vato/">Vato</a></td></tr></table>
<div id="content">
  <h2>Kalash 1 / Vishram 1</h2>
  <p>Shriji Maharaj arrived in the village<sup><a href="#fn1" id="r1">1</a></sup> at dawn.</p>
  <p>The devotees gathered<a href="#fn2" class="fnref">2</a> near the river.</p>
  <a class="nav_right" href="index.php?kalash=1&amp;vishram=2#top">Next</a>
</div>
<div id="footnotes"><ol>
  <li id="fn1">A small village in Saurashtra. <a href="#r1" class="back">↩</a></li>
  <li id="fn2">1. Known as the Ghela river.</li>
</ol></div>
</body></html>"##;

    #[test]
    fn test_full_page() {
        let (text, page) = pipeline().process_page(PAGE, &base()).unwrap();

        assert_eq!(
            page.next_url.as_ref().map(Url::as_str),
            Some("https://example.org/harililamrut/index.php?kalash=1&vishram=2")
        );
        assert_eq!(page.footnotes.len(), 2);
        assert!(page.noise.banner_image);
        assert!(page.noise.banner_heading);
        assert_eq!(page.noise.nav_tables, 1);
        assert_eq!(page.content_source, ContentSource::Keyword);

        assert!(text.contains("Shriji Maharaj arrived in the village[1] at dawn."));
        assert!(text.contains("The devotees gathered[2] near the river."));
        assert!(text.contains("## Footnotes\n\n[1] A small village in Saurashtra.\n\n[2] Known as the Ghela river."));

        assert!(!text.contains("Vishram 1"));
        assert!(!text.contains("Vato"));
        assert!(!text.contains("track()"));
        assert!(!text.contains("Next"));
        assert!(!text.contains("↩"));
        assert_eq!(text.matches("Saurashtra").count(), 1);
    }

    #[test]
    fn test_footnote_count_matches_lines() {
        let (text, page) = pipeline().process_page(PAGE, &base()).unwrap();
        let section = text.split("## Footnotes").nth(1).unwrap();
        let numbers: Vec<String> = section
            .lines()
            .filter(|l| l.starts_with('['))
            .map(|l| l.split(']').next().unwrap().trim_start_matches('[').to_string())
            .collect();
        let expected: Vec<String> = (1..=page.footnotes.len()).map(|n| n.to_string()).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_bare_page_falls_back_to_body() {
        let page = pipeline()
            .process("<html><body><p>Just text.</p></body></html>", &base())
            .unwrap();
        assert_eq!(page.content_source, ContentSource::Body);
        assert_eq!(page.body, "Just text.");
        assert!(page.footnotes.is_empty());
        assert!(page.next_url.is_none());
    }

    #[test]
    fn test_next_link_ignores_non_http() {
        let html = Html::parse_document("<a class=\"nav_right\" href=\"mailto:x@example.org\">n</a>");
        let sel = Selector::parse("a.nav_right").unwrap();
        assert!(find_next_link(&html, &sel, &base()).is_none());
    }
}
