//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The orchestrator's state machine (fetching, processing, advancing, ...)
//! - `CrawlState`: The persisted progress record (visited set, pending URL, output target)

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::CrawlPhase;
