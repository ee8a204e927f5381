//! Output module for the aggregated document and crawl reports
//!
//! This module handles:
//! - Appending page blocks to the flat-text document
//! - Summarizing a finished crawl

mod document;
pub mod stats;
mod traits;

pub use document::FileDocument;
pub use stats::{print_report, CrawlReport, StopReason};
pub use traits::{page_block, DocumentSink, MemorySink, OutputError, OutputResult};
