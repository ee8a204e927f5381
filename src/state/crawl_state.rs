//! Persistent crawl progress
//!
//! `CrawlState` is the single mutable record of a crawl. It is owned by the
//! coordinator and written to the progress store after every page, so an
//! external supervisor can inspect it or restart the crawl from it.

use crate::extract::FootnoteRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Progress of one crawl, as persisted after every page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    /// When this record was last updated
    pub timestamp: DateTime<Utc>,

    /// Normalized URLs already appended to the output
    pub visited: BTreeSet<String>,

    /// URL the crawl would fetch next, if any
    pub next_url: Option<String>,

    /// Output document this crawl appends to
    pub output: String,

    /// Number of page blocks appended so far
    #[serde(default)]
    pub pages_written: u32,

    /// Phase the crawl was in when the record was written
    #[serde(default)]
    pub phase: String,

    /// Hash of the effective configuration
    #[serde(default)]
    pub config_hash: String,

    /// Footnotes held back for the end of the document, by page label
    #[serde(default)]
    pub deferred_footnotes: Vec<(String, Vec<FootnoteRecord>)>,
}

impl CrawlState {
    /// Creates the state for a fresh crawl starting at `seed`
    pub fn new(seed: &str, output: &str, config_hash: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            visited: BTreeSet::new(),
            next_url: Some(seed.to_string()),
            output: output.to_string(),
            pages_written: 0,
            phase: "start".to_string(),
            config_hash: config_hash.to_string(),
            deferred_footnotes: Vec::new(),
        }
    }

    /// Returns true if `url` (already normalized) has been appended
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Records a page that was appended to the output
    pub fn record_page(&mut self, url: &str) {
        self.visited.insert(url.to_string());
        self.pages_written += 1;
        self.touch();
    }

    /// Sets the pending URL (None once the chain has ended)
    pub fn set_next(&mut self, next: Option<String>) {
        self.next_url = next;
        self.touch();
    }

    /// Holds a page's footnotes back for the end-of-document section
    pub fn defer_footnotes(&mut self, label: &str, footnotes: Vec<FootnoteRecord>) {
        if !footnotes.is_empty() {
            self.deferred_footnotes.push((label.to_string(), footnotes));
            self.touch();
        }
    }

    /// Takes every deferred footnote group, leaving none behind
    pub fn take_deferred_footnotes(&mut self) -> Vec<(String, Vec<FootnoteRecord>)> {
        self.touch();
        std::mem::take(&mut self.deferred_footnotes)
    }

    /// Records the current orchestrator phase
    pub fn set_phase(&mut self, phase: &str) {
        self.phase = phase.to_string();
        self.touch();
    }

    fn touch(&mut self) {
        self.timestamp = Utc::now();
    }
}
