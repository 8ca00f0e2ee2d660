//! Scheduler for the perpetual scan loop
//!
//! This module handles:
//! - Starting and stopping the scan loop
//! - Cycling over every category in a fresh random order
//! - Pacing between categories and between cycles
//! - Isolating a failed category from the rest of its cycle
//! - Recovering from a failed cycle after a fixed delay
//!
//! The run state lives behind a lock shared with [`ScanHandle`], so status
//! can be read and a stop requested while `start` is still running.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pacing::{pause, Pacer};
use crate::crawler::scanner::{CategoryScanner, ScanRules};
use crate::output::{PauseTarget, ProgressReporter, ScanEvent};
use crate::state::{lock, Category, Listing, RunState, RunStatus};
use crate::ScoutError;
use futures::FutureExt;
use rand::rngs::StdRng;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Cloneable control surface of a running scheduler
#[derive(Debug, Clone)]
pub struct ScanHandle {
    state: Arc<Mutex<RunState>>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl ScanHandle {
    /// Requests the loop to stop
    ///
    /// Takes effect at the next check: before a category, page or listing,
    /// or immediately during a pause. A request already in flight finishes.
    pub fn stop(&self) {
        lock(&self.state).is_running = false;
        lock(&self.cancel).cancel();
    }

    pub fn status(&self) -> RunStatus {
        lock(&self.state).status()
    }

    /// The most recent `limit` listings, oldest first
    pub fn recent(&self, limit: usize) -> Vec<Listing> {
        lock(&self.state).results.recent(limit)
    }
}

/// Drives the scan loop over all configured categories
pub struct ScanScheduler {
    config: Config,
    rules: ScanRules,
    categories: Vec<Category>,
    pacer: Pacer,
    handle: ScanHandle,
}

impl ScanScheduler {
    /// Creates a scheduler, compiling every selector and pattern up front
    ///
    /// # Returns
    ///
    /// * `Ok(ScanScheduler)` - Ready to start
    /// * `Err(ScoutError)` - A selector, pattern or URL in the config is invalid
    pub fn new(config: Config) -> Result<Self, ScoutError> {
        let rules = ScanRules::from_config(&config)?;
        let categories = config
            .categories
            .iter()
            .map(Category::from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let handle = ScanHandle {
            state: Arc::new(Mutex::new(RunState::new(config.scanner.result_capacity))),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        };

        Ok(Self {
            config,
            rules,
            categories,
            pacer: Pacer::from_entropy(),
            handle,
        })
    }

    /// Replaces the random source (for reproducible runs)
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.pacer = Pacer::new(rng);
        self
    }

    pub fn handle(&self) -> ScanHandle {
        self.handle.clone()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn stop(&self) {
        self.handle.stop()
    }

    pub fn status(&self) -> RunStatus {
        self.handle.status()
    }

    pub fn recent(&self, limit: usize) -> Vec<Listing> {
        self.handle.recent(limit)
    }

    /// Runs the scan loop until `stop` is called
    ///
    /// Returns immediately, reporting `AlreadyRunning`, when a loop is active.
    /// Page, listing and category failures are reported and skipped. A failed
    /// cycle is reported and retried after the error backoff.
    ///
    /// The only error returned is an HTTP client that cannot be built.
    pub async fn start(&self, reporter: &dyn ProgressReporter) -> Result<(), ScoutError> {
        let cancel = {
            let mut state = lock(&self.handle.state);
            if state.is_running {
                drop(state);
                reporter.report(&ScanEvent::AlreadyRunning);
                return Ok(());
            }
            state.is_running = true;

            let token = CancellationToken::new();
            *lock(&self.handle.cancel) = token.clone();
            token
        };

        let fetcher = match Fetcher::from_config(&self.config.http) {
            Ok(fetcher) => fetcher,
            Err(source) => {
                lock(&self.handle.state).is_running = false;
                return Err(ScoutError::Http { source });
            }
        };

        tracing::info!(
            "Scanning {} categories, {} pages each",
            self.categories.len(),
            self.config.scanner.pages_per_category
        );
        reporter.report(&ScanEvent::Started);

        let scanner = CategoryScanner {
            config: &self.config,
            rules: &self.rules,
            fetcher: &fetcher,
            pacer: &self.pacer,
            state: &self.handle.state,
        };

        while !cancel.is_cancelled() {
            let cycle = lock(&self.handle.state).begin_cycle();

            let outcome = AssertUnwindSafe(self.run_cycle(cycle, &scanner, &cancel, reporter))
                .catch_unwind()
                .await;

            if let Err(panic) = outcome {
                let recovery = self.config.pacing.error_backoff();
                reporter.report(&ScanEvent::CycleFailed {
                    cycle,
                    error: panic_message(panic.as_ref()),
                    recovery,
                });
                pause(recovery, &cancel).await;
            }
        }

        let cycles = {
            let mut state = lock(&self.handle.state);
            state.is_running = false;
            state.current_cycle
        };
        reporter.report(&ScanEvent::Stopped { cycles });

        Ok(())
    }

    /// One pass over every category in random order
    async fn run_cycle(
        &self,
        cycle: u64,
        scanner: &CategoryScanner<'_>,
        cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) {
        reporter.report(&ScanEvent::CycleStarted { cycle });

        let mut order: Vec<&Category> = self.categories.iter().collect();
        self.pacer.shuffle(&mut order);

        let mut listings = 0;
        for category in order {
            if cancel.is_cancelled() {
                return;
            }

            reporter.report(&ScanEvent::CategoryStarted {
                category: category.name.clone(),
            });
            let outcome = AssertUnwindSafe(scanner.scan(category, cancel, reporter))
                .catch_unwind()
                .await;
            match outcome {
                Ok(report) => {
                    tracing::debug!(
                        "Category {} done: {} pages, {} listings, {} failed pages",
                        category.name,
                        report.pages_scanned,
                        report.listings_found,
                        report.failed_pages
                    );
                    listings += report.listings_found;
                }
                Err(panic) => reporter.report(&ScanEvent::CategoryFailed {
                    category: category.name.clone(),
                    error: panic_message(panic.as_ref()),
                }),
            }

            if !self.pace(PauseTarget::NextCategory, cancel, reporter).await {
                return;
            }
        }

        reporter.report(&ScanEvent::CycleComplete { cycle, listings });
        self.pace(PauseTarget::NextCycle, cancel, reporter).await;
    }

    async fn pace(
        &self,
        target: PauseTarget,
        cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let window = match target {
            PauseTarget::NextCategory => self.config.pacing.category_delay,
            PauseTarget::NextCycle => self.config.pacing.cycle_delay,
        };
        let duration = self.pacer.draw(window);
        reporter.report(&ScanEvent::Pause { target, duration });

        pause(duration, cancel).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}
