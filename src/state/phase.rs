/// Crawl phase definitions for the orchestrator state machine
///
/// `Start → Fetching → Processing → Advancing → Fetching … | Done | Aborted`
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// Crawl constructed, seed not yet requested
    Start,

    /// Resilient fetch of the pending URL in progress
    Fetching,

    /// Running the extraction pipeline on a fetched body
    Processing,

    /// Locating and vetting the next link
    Advancing,

    // ===== Terminal Phases =====
    /// Chain ended (no next link, revisit, or page cap)
    Done,

    /// A URL exhausted its fetch budget or output could not be written
    Aborted,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (*self, next),
            (Start, Fetching)
                | (Start, Done)
                | (Fetching, Processing)
                | (Fetching, Aborted)
                | (Processing, Advancing)
                | (Processing, Aborted)
                | (Advancing, Fetching)
                | (Advancing, Done)
        )
    }

    /// Stable lowercase name, used in logs and the progress record
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Advancing => "advancing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
