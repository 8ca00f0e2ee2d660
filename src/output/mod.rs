//! Output module for progress reporting and run summaries
//!
//! This module handles:
//! - Progress events emitted during a run and the reporter interface
//! - Statistics over the buffered listings
//! - Printing listings as a table or JSON lines

mod events;
pub mod stats;

pub use events::{format_duration, PauseTarget, ProgressReporter, ScanEvent, TracingReporter};
pub use stats::{
    compute_statistics, print_listings, print_statistics, write_json_lines, ListingStatistics,
};
