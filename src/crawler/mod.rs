//! Crawler module for fetching and following the page chain
//!
//! This module contains the core crawling logic, including:
//! - Transient-failure classification
//! - HTTP and headless-renderer transports
//! - Fetching with bounded exponential backoff
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod fetcher;
mod transport;

pub use classifier::{classify, is_transient, TransientReason};
pub use coordinator::{run_crawl, Coordinator, CrawlOptions, CrawlParts};
pub use fetcher::{Fetched, RecordingSleeper, ResilientFetcher, Sleeper, TokioSleeper};
pub use transport::{
    build_http_client, transport_for, HttpTransport, RawResponse, RenderTransport, Transport,
};
