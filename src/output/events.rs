//! Progress events emitted by the scan loop
//!
//! Every notable step of a run (start/stop, cycle, category and page
//! boundaries, each accepted listing, every failure) is reported as one
//! `ScanEvent`. Events render to a human-readable line via `Display`.

use std::fmt;
use std::time::Duration;
use url::Url;

/// What a pacing pause is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseTarget {
    NextCategory,
    NextCycle,
}

/// A notable event during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// The scan loop started
    Started,

    /// `start` was called while a run was active
    AlreadyRunning,

    /// The scan loop ended after a stop request
    Stopped { cycles: u64 },

    /// A full pass over every category began
    CycleStarted { cycle: u64 },

    /// Scanning of one category began
    CategoryStarted { category: String },

    /// One search-result page was processed
    PageScanned {
        category: String,
        page: u32,
        listings: usize,
    },

    /// A private-sale listing was accepted
    ListingFound { title: String, price: u64, url: Url },

    /// The site answered HTTP 429; the scan pauses before continuing
    RateLimited { url: Url, backoff: Duration },

    /// A search-result page could not be fetched
    FetchFailed { url: Url, reason: String },

    /// A detail page could not be fetched and was skipped
    DetailSkipped { url: Url, reason: String },

    /// A whole category failed; the cycle continues with the next one
    CategoryFailed { category: String, error: String },

    /// A pacing pause before the next unit of work
    Pause {
        target: PauseTarget,
        duration: Duration,
    },

    /// A full pass finished
    CycleComplete { cycle: u64, listings: usize },

    /// A cycle failed; the loop recovers after a fixed delay
    CycleFailed {
        cycle: u64,
        error: String,
        recovery: Duration,
    },
}

impl ScanEvent {
    /// Returns true if this event describes a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::FetchFailed { .. }
                | Self::DetailSkipped { .. }
                | Self::CategoryFailed { .. }
                | Self::CycleFailed { .. }
        )
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Scanner started"),
            Self::AlreadyRunning => write!(f, "Scanner is already running"),
            Self::Stopped { cycles } => write!(f, "Scanner stopped after {} cycle(s)", cycles),
            Self::CycleStarted { cycle } => {
                write!(f, "Cycle {}: scanning all categories", cycle)
            }
            Self::CategoryStarted { category } => write!(f, "Scanning {}", category),
            Self::PageScanned {
                category,
                page,
                listings,
            } => write!(f, "Page {}: {} listing(s) in {}", page, listings, category),
            Self::ListingFound { title, price, url } => {
                let short: String = title.chars().take(50).collect();
                write!(f, "Found: {} - €{} ({})", short, price, url)
            }
            Self::RateLimited { url, backoff } => write!(
                f,
                "Rate limited on {}, waiting {}",
                url,
                format_duration(*backoff)
            ),
            Self::FetchFailed { url, reason } => write!(f, "Fetch failed for {}: {}", url, reason),
            Self::DetailSkipped { url, reason } => {
                write!(f, "Skipped listing {}: {}", url, reason)
            }
            Self::CategoryFailed { category, error } => {
                write!(f, "Category {} failed: {}", category, error)
            }
            Self::Pause { target, duration } => {
                let what = match target {
                    PauseTarget::NextCategory => "next category",
                    PauseTarget::NextCycle => "next cycle",
                };
                write!(f, "Pause: {} until {}", format_duration(*duration), what)
            }
            Self::CycleComplete { cycle, listings } => write!(
                f,
                "Cycle {} complete: {} new listing(s)",
                cycle, listings
            ),
            Self::CycleFailed {
                cycle,
                error,
                recovery,
            } => write!(
                f,
                "Cycle {} failed: {}; retrying in {}",
                cycle,
                error,
                format_duration(*recovery)
            ),
        }
    }
}

/// Formats a pause as whole minutes and seconds
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 60, secs % 60) {
        (0, s) => format!("{}s", s),
        (m, 0) => format!("{}min", m),
        (m, s) => format!("{}min {}s", m, s),
    }
}

/// Receives progress events synchronously from the scan loop
///
/// Implementations must not assume they are called from an async context
/// in any particular way; `report` is invoked inline and should return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ScanEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ScanEvent) + Send + Sync,
{
    fn report(&self, event: &ScanEvent) {
        self(event)
    }
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ScanEvent) {
        match event {
            ScanEvent::Pause { .. } | ScanEvent::CategoryStarted { .. } => {
                tracing::debug!("{}", event)
            }
            ScanEvent::CycleFailed { .. } | ScanEvent::CategoryFailed { .. } => {
                tracing::error!("{}", event)
            }
            e if e.is_error() => tracing::warn!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}
