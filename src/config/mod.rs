//! Configuration module for Pagechain
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every threshold, keyword list, and pattern used by the extraction
//! pipeline lives here as one immutable value, so per-site tuning never
//! touches code.
//!
//! # Example
//!
//! ```no_run
//! use pagechain::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagechain.toml")).unwrap();
//! println!("Retry budget: {}", config.fetch.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientErrorPolicy, Config, ContentConfig, CrawlConfig, FetchConfig, FetchMode,
    FootnoteConfig, FootnotePlacement, NoiseConfig, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, parse_config};
pub use validation::validate;
