//! JSON progress record on disk

use crate::state::CrawlState;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Progress store backed by a pretty-printed JSON file
///
/// Writes go to a sibling temporary file which is then renamed over the
/// record, so a reader never observes a half-written file.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    /// Creates a store for the record at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the progress record
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgressStore for JsonProgressStore {
    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::trace!(path = %self.path.display(), "Progress record written");
        Ok(())
    }

    fn load(&self) -> StorageResult<CrawlState> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(self.path.display().to_string()));
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path().join("progress.json"));

        let mut state = CrawlState::new("https://example.com/?p=1", "book.md", "hash");
        state.record_page("https://example.com/?p=1");
        state.set_next(Some("https://example.com/?p=2".to_string()));
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path().join("progress.json"));

        let mut state = CrawlState::new("https://example.com/", "book.md", "hash");
        store.save(&state).unwrap();
        state.record_page("https://example.com/");
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap().pages_written, 1);
    }

    #[test]
    fn test_load_missing_record() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_load_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonProgressStore::new(path);
        assert!(matches!(store.load(), Err(StorageError::Serialization(_))));
    }
}
