//! Output sink traits and error types
//!
//! This module defines the trait interface for the aggregated document and
//! the associated error type.

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Formats one page block: a rule, the page label heading, then the text
pub fn page_block(label: &str, text: &str) -> String {
    format!("---\n\n## {}\n\n{}\n\n", label, text.trim())
}

/// Append-only stream of page blocks
///
/// Every append must reach durable storage before it returns, so a crawl
/// stopped at any point leaves a readable document behind.
pub trait DocumentSink {
    /// Appends one page block
    ///
    /// # Arguments
    ///
    /// * `label` - Human-readable page label used as the block heading
    /// * `text` - Rendered page text
    fn append_page(&mut self, label: &str, text: &str) -> OutputResult<()>;

    /// Appends a free-standing section (e.g. combined footnotes)
    fn append_section(&mut self, text: &str) -> OutputResult<()>;
}

/// Sink that collects the document in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub document: String,
}

impl DocumentSink for MemorySink {
    fn append_page(&mut self, label: &str, text: &str) -> OutputResult<()> {
        self.document.push_str(&page_block(label, text));
        Ok(())
    }

    fn append_section(&mut self, text: &str) -> OutputResult<()> {
        self.document.push_str(text.trim());
        self.document.push_str("\n\n");
        Ok(())
    }
}
