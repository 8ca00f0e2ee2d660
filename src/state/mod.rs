//! State module for tracking scan progress
//!
//! # Components
//!
//! - `Listing`: an accepted offer with its derived fields
//! - `Category`: a configured search, with kind and region derived from its key
//! - `RunState`: run flag, cycle counter, and the bounded result buffer

mod listing;
mod run_state;

// Re-export main types
pub use listing::{price_per_area, Category, Listing, ListingCandidate, ListingKind, Region};
pub use run_state::{lock, ResultBuffer, RunState, RunStatus};
