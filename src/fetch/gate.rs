//! Request pacing: a minimum wall-clock interval between dispatches, plus a
//! whole-run deadline.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive dispatches.
///
/// `acquire` blocks until at least the configured delay has passed since the
/// previous acquire returned, then records the new dispatch time. The first
/// acquire never blocks. The last-dispatch instant sits behind a mutex so a
/// single gate can be shared (`Arc<RateGate>`) by every fetcher that must
/// pace against the same server.
#[derive(Debug)]
pub struct RateGate {
    delay: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_dispatch: Mutex::new(None),
        }
    }

    /// The configured minimum interval.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Block until the interval since the previous dispatch has elapsed, then
    /// record now as the new last-dispatch time.
    pub fn acquire(&self) {
        let mut last = self
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

/// A fixed point in time after which a run should stop starting new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `window` from now.
    pub fn after(window: Duration) -> Self {
        Self {
            at: Instant::now() + window,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}
