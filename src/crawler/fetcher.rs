//! Resilient fetcher with bounded exponential backoff
//!
//! Every URL gets a fixed attempt budget. Transient results (see
//! [`classify`](super::classifier::classify)) are retried after a delay that
//! starts at `initial_backoff_ms` and is multiplied by `backoff_multiplier`
//! after each retry. Exactly `max_attempts` requests are issued in the worst
//! case and the fetcher sleeps only between them.

use crate::config::{ClientErrorPolicy, FetchConfig};
use crate::crawler::classifier::classify;
use crate::crawler::transport::{RawResponse, Transport};
use crate::FetchError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Grows a retry delay by `multiplier`, saturating at `Duration::MAX`
fn next_delay(delay: Duration, multiplier: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier).unwrap_or(Duration::MAX)
}

/// Waits between attempts and between pages
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every delay requested so far, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

/// A body accepted by the fetcher
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Status of the accepted response
    pub status: u16,
    /// Body handed to the extraction pipeline
    pub body: String,
    /// Requests issued to obtain it
    pub attempts: u32,
}

/// Fetches URLs through a [`Transport`], retrying transient failures
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    config: FetchConfig,
    requests: AtomicU32,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>, config: FetchConfig) -> Self {
        Self {
            transport,
            sleeper,
            config,
            requests: AtomicU32::new(0),
        }
    }

    /// Total requests issued by this fetcher across all URLs
    pub fn requests_issued(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Initial delay before the first retry
    fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.config.initial_backoff_ms)
    }

    /// Fetches `url`, returning the first non-transient body
    ///
    /// # Returns
    ///
    /// * `Ok(Fetched)` - A non-transient response body
    /// * `Err(FetchError::Exhausted)` - Every attempt was transient
    /// * `Err(FetchError::Rejected)` - A 3xx/4xx response under the `abort` policy
    pub async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.initial_delay();
        let mut last_status = None;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            self.requests.fetch_add(1, Ordering::Relaxed);
            match self.transport.get(url).await {
                Ok(RawResponse { status, body }) => {
                    last_status = Some(status);
                    match classify(Some(status), body.as_deref(), &self.config) {
                        Some(reason) => {
                            last_error = reason.as_str().to_string();
                            tracing::debug!(url, status, attempt, reason = reason.as_str(), "Transient response");
                        }
                        None => {
                            // classify() only returns None for a present body
                            let body = body.unwrap_or_default();
                            return self.accept(url, status, body, attempt);
                        }
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::debug!(url, attempt, error = %e, "Transport failure");
                }
            }

            if attempt < max_attempts {
                tracing::warn!(
                    url,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    last_error = %last_error,
                    "Fetch failed, retrying"
                );
                self.sleeper.sleep(delay).await;
                delay = next_delay(delay, self.config.backoff_multiplier);
            }
        }

        tracing::error!(
            url,
            attempts = max_attempts,
            last_status = ?last_status,
            "Fetch failed after all attempts exhausted"
        );

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_status,
            last_error,
        })
    }

    fn accept(&self, url: &str, status: u16, body: String, attempts: u32) -> Result<Fetched, FetchError> {
        if !(200..300).contains(&status) {
            match self.config.on_client_error {
                ClientErrorPolicy::Abort => {
                    tracing::error!(url, status, "Upstream rejected request");
                    return Err(FetchError::Rejected {
                        url: url.to_string(),
                        status,
                    });
                }
                ClientErrorPolicy::KeepBody => {
                    tracing::warn!(url, status, "Keeping body of non-success response");
                }
            }
        }

        if attempts > 1 {
            tracing::info!(url, attempts, "Fetch succeeded after retry");
        }

        Ok(Fetched {
            status,
            body,
            attempts,
        })
    }
}
