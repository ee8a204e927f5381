//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that follows the "next page" chain:
//!
//! ```text
//! START → FETCHING → PROCESSING → ADVANCING → FETCHING … | DONE | ABORTED
//! ```
//!
//! - FETCHING runs the resilient fetcher; exhaustion aborts without
//!   appending a partial page
//! - PROCESSING runs the extraction pipeline, appends the page block, marks
//!   the URL visited and persists the progress record
//! - ADVANCING vets the next link (absent, visited, or page cap → DONE) and
//!   observes the polite delay before the next fetch
//!
//! The crawl is strictly sequential: page order and per-page footnote
//! numbering depend on it.

use crate::config::{compute_config_hash, Config, FootnotePlacement};
use crate::crawler::fetcher::{ResilientFetcher, Sleeper, TokioSleeper};
use crate::crawler::transport::{transport_for, Transport};
use crate::extract::PagePipeline;
use crate::output::{CrawlReport, DocumentSink, FileDocument, StopReason};
use crate::robots::fetch_robots;
use crate::state::{CrawlPhase, CrawlState};
use crate::storage::{JsonProgressStore, ProgressStore};
use crate::url::{normalize_url, page_label};
use crate::PagechainError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Operator choices that are not part of the configuration file
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Continue from the progress record instead of starting fresh
    pub resume: bool,

    /// Skip the robots.txt pre-check
    pub ignore_robots: bool,
}

/// Collaborators the coordinator drives
///
/// [`Coordinator::new`] assembles the production set; tests and embedders
/// supply their own through [`Coordinator::with_parts`].
pub struct CrawlParts {
    pub transport: Arc<dyn Transport>,
    pub sleeper: Arc<dyn Sleeper>,
    pub sink: Box<dyn DocumentSink>,
    pub store: Box<dyn ProgressStore>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    fetcher: ResilientFetcher,
    pipeline: PagePipeline,
    sink: Box<dyn DocumentSink>,
    store: Box<dyn ProgressStore>,
    state: CrawlState,
    phase: CrawlPhase,
    ignore_robots: bool,
    page_delay: Duration,
    pages_written: u32,
    footnotes: usize,
}

impl Coordinator {
    /// Creates a coordinator writing to the configured output files
    ///
    /// A fresh crawl truncates the output document. With `options.resume`
    /// the progress record is read, the visited set restored, and pages are
    /// appended to the existing document.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `seed` - The first page of the chain
    /// * `options` - Resume and robots choices
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(PagechainError)` - Failed to initialize
    pub fn new(config: Config, seed: &str, options: &CrawlOptions) -> Result<Self, PagechainError> {
        let seed = normalize_url(seed)?;
        let config_hash = compute_config_hash(&config);
        let output = Path::new(&config.output.path);
        let store = JsonProgressStore::new(config.output.progress_path());

        let (state, sink) = if options.resume {
            let state = store.load()?;
            if state.config_hash != config_hash {
                tracing::warn!(
                    recorded = %state.config_hash,
                    current = %config_hash,
                    "Configuration changed since the progress record was written"
                );
            }
            if state.output != config.output.path {
                tracing::warn!(
                    recorded = %state.output,
                    current = %config.output.path,
                    "Resuming into a different output document"
                );
            }
            tracing::info!(
                visited = state.visited.len(),
                next = ?state.next_url,
                "Resuming crawl"
            );
            (state, FileDocument::append(output)?)
        } else {
            (
                CrawlState::new(seed.as_str(), &config.output.path, &config_hash),
                FileDocument::create(output)?,
            )
        };

        let parts = CrawlParts {
            transport: transport_for(&config)?,
            sleeper: Arc::new(TokioSleeper),
            sink: Box::new(sink),
            store: Box::new(store),
        };

        Self::with_parts(config, state, options.ignore_robots, parts)
    }

    /// Creates a coordinator from explicit collaborators and starting state
    pub fn with_parts(
        config: Config,
        state: CrawlState,
        ignore_robots: bool,
        parts: CrawlParts,
    ) -> Result<Self, PagechainError> {
        let pipeline = PagePipeline::new(&config)?;
        let fetcher = ResilientFetcher::new(
            parts.transport.clone(),
            parts.sleeper.clone(),
            config.fetch.clone(),
        );
        let page_delay = Duration::from_millis(config.crawl.page_delay_ms);

        Ok(Self {
            config: Arc::new(config),
            transport: parts.transport,
            sleeper: parts.sleeper,
            fetcher,
            pipeline,
            sink: parts.sink,
            store: parts.store,
            state,
            phase: CrawlPhase::Start,
            ignore_robots,
            page_delay,
            pages_written: 0,
            footnotes: 0,
        })
    }

    /// Current crawl state
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Current phase of the state machine
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the crawl to a terminal phase
    ///
    /// A fetch failure ends the crawl in `Aborted` and is reported through
    /// the returned [`CrawlReport`]; pages already appended stay valid.
    /// Robots denial, output and progress-record failures are returned as
    /// errors.
    pub async fn run(&mut self) -> Result<CrawlReport, PagechainError> {
        let started = Instant::now();

        let Some(first) = self.state.next_url.clone() else {
            tracing::info!("Progress record has no pending URL, nothing to do");
            return self.finish(CrawlPhase::Done, StopReason::NothingPending, started);
        };
        let first = normalize_url(&first)?;

        self.check_robots(&first).await?;

        let mut current = first;
        self.transition(CrawlPhase::Fetching);

        let stop = loop {
            // FETCHING
            let fetched = match self.fetcher.fetch(current.as_str()).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::error!(url = %current, error = %e, "Aborting crawl");
                    return self.finish(CrawlPhase::Aborted, StopReason::FetchFailed(e.to_string()), started);
                }
            };

            // PROCESSING
            self.transition(CrawlPhase::Processing);
            let next = match self.process(&current, &fetched.body) {
                Ok(next) => next,
                Err(e) => {
                    self.abort_after_error();
                    return Err(e);
                }
            };
            tracing::info!(
                url = %current,
                attempts = fetched.attempts,
                pages = self.state.pages_written,
                "Page written"
            );

            // ADVANCING
            self.transition(CrawlPhase::Advancing);
            let next = match next {
                None => break StopReason::EndOfChain,
                Some(next) if self.state.is_visited(next.as_str()) => {
                    break StopReason::AlreadyVisited(next.to_string());
                }
                Some(next) => next,
            };
            if let Some(cap) = self.config.crawl.max_pages {
                if self.pages_written >= cap {
                    break StopReason::PageCap(cap);
                }
            }

            self.sleeper.sleep(self.page_delay).await;
            current = next;
            self.transition(CrawlPhase::Fetching);
        };

        // Only a page cap leaves a pending URL worth resuming from
        if !matches!(stop, StopReason::PageCap(_)) {
            self.state.set_next(None);
        }
        self.finish(CrawlPhase::Done, stop, started)
    }

    /// Checks robots.txt for the first URL and adopts its crawl delay
    async fn check_robots(&mut self, url: &Url) -> Result<(), PagechainError> {
        if self.ignore_robots || !self.config.crawl.respect_robots {
            tracing::debug!("Skipping robots.txt check");
            return Ok(());
        }

        let user_agent = self.config.user_agent.user_agent_string();
        let policy = fetch_robots(self.transport.as_ref(), url).await;

        if !policy.allows(url.as_str(), &user_agent) {
            tracing::error!(url = %url, "Disallowed by robots.txt");
            return Err(PagechainError::RobotsDenied {
                url: url.to_string(),
            });
        }

        if let Some(delay) = policy.crawl_delay(&user_agent) {
            if delay > self.page_delay {
                tracing::info!(
                    delay_ms = delay.as_millis() as u64,
                    "Raising page delay to robots.txt Crawl-delay"
                );
                self.page_delay = delay;
            }
        }
        Ok(())
    }

    /// Extracts, appends and records one page; returns its next link
    fn process(&mut self, url: &Url, body: &str) -> Result<Option<Url>, PagechainError> {
        let (with_notes, page) = self.pipeline.process_page(body, url)?;
        let label = self.label_for(url);

        let text = match self.config.output.footnotes_placement {
            FootnotePlacement::PerPage => with_notes,
            FootnotePlacement::EndOfDocument => {
                self.state.defer_footnotes(&label, page.footnotes.clone());
                page.body.clone()
            }
        };

        self.sink.append_page(&label, &text)?;
        self.pages_written += 1;
        self.footnotes += page.footnotes.len();

        self.state.record_page(url.as_str());
        self.state
            .set_next(page.next_url.as_ref().map(|u| u.to_string()));
        self.store.save(&self.state)?;

        Ok(page.next_url)
    }

    fn label_for(&self, url: &Url) -> String {
        let label = page_label(url, &self.config.output.label_params);
        match self.config.output.label_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, label),
            _ => label,
        }
    }

    fn transition(&mut self, next: CrawlPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        self.state.set_phase(next.as_str());
    }

    /// Records an abort caused by an error that is about to be returned
    fn abort_after_error(&mut self) {
        self.phase = CrawlPhase::Aborted;
        self.state.set_phase(CrawlPhase::Aborted.as_str());
        if let Err(e) = self.store.save(&self.state) {
            tracing::error!(error = %e, "Failed to persist progress record");
        }
    }

    /// Enters a terminal phase and persists state
    ///
    /// Deferred footnotes are written only once the chain is complete. A
    /// page cap or a failed fetch leaves them in the progress record, so a
    /// resumed crawl still ends the document with a single section.
    fn finish(
        &mut self,
        phase: CrawlPhase,
        stop_reason: StopReason,
        started: Instant,
    ) -> Result<CrawlReport, PagechainError> {
        self.transition(phase);

        let chain_complete = matches!(
            stop_reason,
            StopReason::EndOfChain | StopReason::AlreadyVisited(_) | StopReason::NothingPending
        );
        if chain_complete && !self.state.deferred_footnotes.is_empty() {
            let deferred = self.state.take_deferred_footnotes();
            let section = self.pipeline.renderer().combined_footnotes_section(&deferred);
            self.sink.append_section(&section)?;
        } else if !self.state.deferred_footnotes.is_empty() {
            tracing::info!(
                pages = self.state.deferred_footnotes.len(),
                "Footnotes kept in progress record until the chain completes"
            );
        }

        self.store.save(&self.state)?;

        let report = CrawlReport {
            pages_written: self.pages_written,
            total_pages: self.state.pages_written,
            footnotes: self.footnotes,
            fetch_attempts: self.fetcher.requests_issued(),
            final_phase: phase,
            stop_reason,
            output: self.state.output.clone(),
            elapsed: started.elapsed(),
        };

        match phase {
            CrawlPhase::Aborted => tracing::error!(
                pages = report.pages_written,
                reason = %report.stop_reason,
                "Crawl aborted"
            ),
            _ => tracing::info!(
                pages = report.pages_written,
                footnotes = report.footnotes,
                attempts = report.fetch_attempts,
                reason = %report.stop_reason,
                "Crawl finished"
            ),
        }

        Ok(report)
    }
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - The first page of the chain
/// * `options` - Resume and robots choices
///
/// # Example
///
/// ```no_run
/// use pagechain::config::Config;
/// use pagechain::crawler::{run_crawl, CrawlOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(
///     Config::default(),
///     "https://example.org/book/index.php?kalash=1&vishram=1",
///     &CrawlOptions::default(),
/// )
/// .await?;
/// println!("{} pages", report.pages_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, seed: &str, options: &CrawlOptions) -> Result<CrawlReport, PagechainError> {
    let mut coordinator = Coordinator::new(config, seed, options)?;
    coordinator.run().await
}
