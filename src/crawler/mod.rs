//! Crawler module for scanning listing categories
//!
//! This module contains the core scanning logic, including:
//! - HTTP fetching with a rotating browser identity
//! - Listing discovery on search pages and field extraction on detail pages
//! - Private-seller classification
//! - Randomized pacing and the perpetual scan loop

mod classify;
mod extract;
mod fetcher;
mod pacing;
mod parser;
mod scanner;
mod scheduler;

pub use classify::{classify, RejectReason, Verdict};
pub use extract::{
    extract_area, extract_description, extract_location, extract_phone, extract_price,
    extract_title, DetailExtractor, SelectorChain, DEFAULT_LOCATION, DEFAULT_TITLE,
};
pub use fetcher::{build_headers, build_http_client, FetchOutcome, Fetcher};
pub use pacing::{pause, Pacer};
pub use parser::discover_listing_urls;
pub use scanner::{CategoryReport, CategoryScanner, ScanRules};
pub use scheduler::{ScanHandle, ScanScheduler};
