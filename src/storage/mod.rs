//! Storage module for persisting crawl progress
//!
//! The progress record holds a timestamp, the visited-URL set, the pending
//! next URL, and the output target. It is written after every page; reading
//! it back is advisory and only happens on an explicit resume.

mod json;
mod traits;

pub use json::JsonProgressStore;
pub use traits::{MemoryProgressStore, ProgressStore, StorageError, StorageResult};

use crate::state::CrawlState;
use std::path::Path;

/// Reads a progress record from `path`
///
/// # Arguments
///
/// * `path` - Path to the JSON progress record
///
/// # Returns
///
/// * `Ok(CrawlState)` - The last persisted state
/// * `Err(StorageError)` - The record is missing or unreadable
pub fn load_progress(path: &Path) -> StorageResult<CrawlState> {
    JsonProgressStore::new(path).load()
}
