use crate::state::Listing;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Ordered buffer of accepted listings with a fixed capacity
///
/// Appending to a full buffer evicts the oldest listing.
#[derive(Debug, Clone)]
pub struct ResultBuffer {
    listings: VecDeque<Listing>,
    capacity: usize,
}

impl ResultBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            listings: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a listing, returning the one evicted to make room (if any)
    pub fn push(&mut self, listing: Listing) -> Option<Listing> {
        let evicted = if self.listings.len() >= self.capacity {
            self.listings.pop_front()
        } else {
            None
        };
        self.listings.push_back(listing);
        evicted
    }

    /// The last `limit` listings, oldest first
    pub fn recent(&self, limit: usize) -> Vec<Listing> {
        let skip = self.listings.len().saturating_sub(limit);
        self.listings.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Run state shared between the scanning path and external readers
#[derive(Debug, Clone)]
pub struct RunState {
    /// Whether the scan loop is active
    pub is_running: bool,

    /// Number of cycles started since the process began
    pub current_cycle: u64,

    /// Total listings accepted, including any evicted from the buffer
    pub total_found: u64,

    /// Most recent accepted listings
    pub results: ResultBuffer,
}

impl RunState {
    pub fn new(result_capacity: usize) -> Self {
        Self {
            is_running: false,
            current_cycle: 0,
            total_found: 0,
            results: ResultBuffer::with_capacity(result_capacity),
        }
    }

    /// Starts the next cycle and returns its number
    pub fn begin_cycle(&mut self) -> u64 {
        self.current_cycle += 1;
        self.current_cycle
    }

    pub fn record_listing(&mut self, listing: Listing) {
        self.total_found += 1;
        if let Some(evicted) = self.results.push(listing) {
            tracing::trace!("Evicted oldest buffered listing {}", evicted.url);
        }
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            is_running: self.is_running,
            current_cycle: self.current_cycle,
            total_found: self.total_found,
            buffered: self.results.len(),
        }
    }
}

/// Locks shared state, recovering the guard if a holder panicked
///
/// Every mutation completes under the lock, so the data behind
/// a poisoned lock is still consistent.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Point-in-time snapshot of the run state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub is_running: bool,
    pub current_cycle: u64,
    pub total_found: u64,
    pub buffered: usize,
}
