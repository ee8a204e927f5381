//! Storage traits and error types
//!
//! This module defines the trait interface for progress stores and the
//! associated error type.

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No progress record at {0}")]
    NotFound(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl progress persistence
///
/// The coordinator calls `save` after every appended page. `load` is only
/// used when an operator explicitly asks to resume.
pub trait ProgressStore {
    /// Persists the full crawl state, replacing any previous record
    fn save(&mut self, state: &CrawlState) -> StorageResult<()>;

    /// Reads the last persisted crawl state
    fn load(&self) -> StorageResult<CrawlState>;
}

/// A store that keeps every saved snapshot in memory
///
/// Useful for embedding the crawler where no progress file is wanted, and
/// for asserting on the sequence of persisted states.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    pub snapshots: Vec<CrawlState>,
}

impl ProgressStore for MemoryProgressStore {
    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        self.snapshots.push(state.clone());
        Ok(())
    }

    fn load(&self) -> StorageResult<CrawlState> {
        self.snapshots
            .last()
            .cloned()
            .ok_or_else(|| StorageError::NotFound("memory".to_string()))
    }
}
