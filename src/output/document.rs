//! Aggregated text document on disk

use crate::output::traits::{page_block, DocumentSink, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Flat-text document opened in append mode
///
/// Each block is written and flushed in one call, so already-written pages
/// survive any later failure.
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    file: File,
}

impl FileDocument {
    /// Opens the document for a fresh crawl, discarding earlier content
    pub fn create(path: &Path) -> OutputResult<Self> {
        Self::open_with(path, true)
    }

    /// Opens the document for a resumed crawl, keeping earlier content
    pub fn append(path: &Path) -> OutputResult<Self> {
        Self::open_with(path, false)
    }

    fn open_with(path: &Path, truncate: bool) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = if truncate {
            OpenOptions::new().create(true).write(true).truncate(true).open(path)?
        } else {
            OpenOptions::new().create(true).append(true).open(path)?
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&mut self, text: &str) -> OutputResult<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

impl DocumentSink for FileDocument {
    fn append_page(&mut self, label: &str, text: &str) -> OutputResult<()> {
        self.write_all(&page_block(label, text))
    }

    fn append_section(&mut self, text: &str) -> OutputResult<()> {
        self.write_all(&format!("{}\n\n", text.trim()))
    }
}
