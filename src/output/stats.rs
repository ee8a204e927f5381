//! End-of-crawl report
//!
//! This module provides the summary the coordinator returns and a printer
//! for it.

use crate::state::CrawlPhase;
use std::fmt;
use std::time::Duration;

/// Why the crawl stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no "next" link
    EndOfChain,
    /// The "next" link pointed at a page already written
    AlreadyVisited(String),
    /// The configured page cap was reached
    PageCap(u32),
    /// A page could not be fetched
    FetchFailed(String),
    /// Resumed from a record with no pending URL
    NothingPending,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfChain => write!(f, "end of chain"),
            StopReason::AlreadyVisited(url) => write!(f, "next link already visited: {}", url),
            StopReason::PageCap(cap) => write!(f, "page cap of {} reached", cap),
            StopReason::FetchFailed(err) => write!(f, "fetch failed: {}", err),
            StopReason::NothingPending => write!(f, "no pending URL in progress record"),
        }
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Page blocks appended during this run
    pub pages_written: u32,

    /// Page blocks in the document, including earlier runs when resuming
    pub total_pages: u32,

    /// Footnotes extracted across all pages of this run
    pub footnotes: usize,

    /// Requests issued for pages (excluding robots.txt)
    pub fetch_attempts: u32,

    /// Terminal phase: Done or Aborted
    pub final_phase: CrawlPhase,

    pub stop_reason: StopReason,

    /// Path of the aggregated document
    pub output: String,

    /// Wall-clock duration of this run
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Requests beyond the first one per written page
    pub fn retries(&self) -> u32 {
        self.fetch_attempts.saturating_sub(self.pages_written)
    }

    pub fn succeeded(&self) -> bool {
        self.final_phase == CrawlPhase::Done
    }
}

/// Prints the report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Result: {} ({})", report.final_phase, report.stop_reason);
    println!("Output: {}", report.output);
    println!();

    println!("Pages:");
    println!("  Written this run: {}", report.pages_written);
    println!("  Total in document: {}", report.total_pages);
    println!("  Footnotes extracted: {}", report.footnotes);
    println!();

    println!("Fetching:");
    println!("  Requests issued: {}", report.fetch_attempts);
    println!("  Retries: {}", report.retries());
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}
