//! Pagechain: a resilient extractor for paginated, footnoted documents
//!
//! This crate follows a chain of "next page" links across a document-publishing
//! site, strips navigational chrome from each page, extracts and renumbers its
//! footnotes, and appends the cleaned text of every page to one portable
//! document.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Pagechain operations
#[derive(Debug, Error)]
pub enum PagechainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Render error: {0}")]
    Render(#[from] extract::RenderError),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fetching a single URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The attempt budget was consumed without a clean result
    #[error("Gave up on {url} after {attempts} attempts (last status: {last_status:?}, last error: {last_error})")]
    Exhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
        last_error: String,
    },

    /// A single transport-level failure (connection, timeout, truncated body)
    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    /// A non-retryable client error under the `abort` policy
    #[error("Upstream rejected {url} with HTTP {status}")]
    Rejected { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Pagechain operations
pub type Result<T> = std::result::Result<T, PagechainError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOptions};
pub use output::CrawlReport;
pub use state::{CrawlPhase, CrawlState};
pub use url::{normalize_url, page_label};
