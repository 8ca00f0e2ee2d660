//! Category scanner
//!
//! Walks the first N result pages of one search category, follows every
//! discovered listing to its detail page and records the private-sale
//! offers. Failures of single pages or listings are reported and skipped;
//! they never abort the category.

use crate::config::Config;
use crate::crawler::classify::{classify, Verdict};
use crate::crawler::extract::{DetailExtractor, SelectorChain};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::pacing::{pause, Pacer};
use crate::crawler::parser::discover_listing_urls;
use crate::output::{ProgressReporter, ScanEvent};
use crate::state::{lock, Category, Listing, RunState};
use crate::url::paginated_url;
use crate::ScoutError;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Selector chains and patterns compiled once per scheduler
#[derive(Debug, Clone)]
pub struct ScanRules {
    pub origin: Url,
    pub links: SelectorChain,
    pub extractor: DetailExtractor,
}

impl ScanRules {
    pub fn from_config(config: &Config) -> Result<Self, ScoutError> {
        Ok(Self {
            origin: Url::parse(&config.site.origin)?,
            links: SelectorChain::parse(&config.selectors.listing_links)?,
            extractor: DetailExtractor::new(&config.selectors)?,
        })
    }
}

/// Summary of one category scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryReport {
    /// Result pages visited, including failed ones
    pub pages_scanned: u32,

    /// Listings accepted and recorded
    pub listings_found: usize,

    /// Result pages that could not be fetched
    pub failed_pages: u32,
}

/// Scans one category at a time on behalf of the scheduler
pub struct CategoryScanner<'a> {
    pub config: &'a Config,
    pub rules: &'a ScanRules,
    pub fetcher: &'a Fetcher,
    pub pacer: &'a Pacer,
    pub state: &'a Mutex<RunState>,
}

impl<'a> CategoryScanner<'a> {
    /// Scans the result pages of a category in order
    ///
    /// Returns early once `cancel` fires.
    pub async fn scan(
        &self,
        category: &Category,
        cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> CategoryReport {
        let mut report = CategoryReport::default();

        for page in 1..=self.config.scanner.pages_per_category {
            if cancel.is_cancelled() {
                break;
            }

            let page_url = paginated_url(&category.search_url, page);
            tracing::debug!("Fetching result page {} of {}: {}", page, category.name, page_url);

            let listings = match self.fetch(&page_url, None).await {
                FetchOutcome::Ok(html) => {
                    let urls = discover_listing_urls(
                        &html,
                        &self.rules.origin,
                        &self.rules.links,
                        &self.config.site.listing_path_fragment,
                    );
                    tracing::debug!("Discovered {} listing links on {}", urls.len(), page_url);
                    self.scan_listings(category, urls, cancel, reporter).await
                }
                FetchOutcome::RateLimited => {
                    self.back_off(&page_url, cancel, reporter).await;
                    report.failed_pages += 1;
                    0
                }
                failure => {
                    reporter.report(&ScanEvent::FetchFailed {
                        url: page_url.clone(),
                        reason: failure.to_string(),
                    });
                    report.failed_pages += 1;
                    0
                }
            };

            report.pages_scanned += 1;
            report.listings_found += listings;
            reporter.report(&ScanEvent::PageScanned {
                category: category.name.clone(),
                page,
                listings,
            });

            if !pause(self.pacer.draw(self.config.pacing.page_delay), cancel).await {
                break;
            }
        }

        report
    }

    /// Visits each discovered detail page; returns the number accepted
    async fn scan_listings(
        &self,
        category: &Category,
        urls: impl IntoIterator<Item = Url>,
        cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> usize {
        let referer = self.config.site.detail_referer.as_deref();
        let mut accepted = 0;

        for url in urls {
            if cancel.is_cancelled() {
                break;
            }

            let html = match self.fetch(&url, referer).await {
                FetchOutcome::Ok(html) => html,
                FetchOutcome::RateLimited => {
                    self.back_off(&url, cancel, reporter).await;
                    continue;
                }
                failure => {
                    reporter.report(&ScanEvent::DetailSkipped {
                        url,
                        reason: failure.to_string(),
                    });
                    continue;
                }
            };

            let candidate = self.rules.extractor.extract(&html);
            match classify(&candidate, &self.config.scanner.private_keywords) {
                Verdict::Accept => {}
                Verdict::Reject(reason) => {
                    tracing::debug!("Rejected {}: {}", url, reason);
                    continue;
                }
            }

            let listing = Listing::from_candidate(candidate, url, category);
            reporter.report(&ScanEvent::ListingFound {
                title: listing.title.clone(),
                price: listing.price,
                url: listing.url.clone(),
            });
            lock(self.state).record_listing(listing);
            accepted += 1;

            if !pause(self.pacer.draw(self.config.pacing.listing_delay), cancel).await {
                break;
            }
        }

        accepted
    }

    async fn fetch(&self, url: &Url, referer: Option<&str>) -> FetchOutcome {
        let user_agent = self
            .pacer
            .choose(&self.config.http.user_agents)
            .map(String::as_str)
            .unwrap_or_default();

        self.fetcher.fetch(url, user_agent, referer).await
    }

    async fn back_off(&self, url: &Url, cancel: &CancellationToken, reporter: &dyn ProgressReporter) {
        let backoff = self.config.pacing.rate_limit_backoff();
        reporter.report(&ScanEvent::RateLimited {
            url: url.clone(),
            backoff,
        });
        pause(backoff, cancel).await;
    }
}
