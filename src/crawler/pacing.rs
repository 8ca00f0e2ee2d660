//! Randomized pacing
//!
//! All randomness of a run (category order, identity rotation, pause
//! lengths) is drawn from one injectable `StdRng`, so a seeded run is
//! reproducible. Pauses race the run's cancellation token.

use crate::config::DelayWindow;
use crate::state::lock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source of random pacing decisions
pub struct Pacer {
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        lock(&self.rng)
    }

    /// Draws a pause uniformly from the window (whole seconds)
    pub fn draw(&self, window: DelayWindow) -> Duration {
        if window.min_secs >= window.max_secs {
            return window.min();
        }
        Duration::from_secs(self.rng().gen_range(window.min_secs..=window.max_secs))
    }

    /// Applies a uniform random permutation
    pub fn shuffle<T>(&self, items: &mut [T]) {
        items.shuffle(&mut *self.rng());
    }

    /// Picks one entry uniformly
    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut *self.rng())
    }
}

/// Sleeps for `duration` unless the token is cancelled first
///
/// Returns `false` when the pause was cut short by cancellation.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
