//! Time source used by the scheduler and for template ids.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Monotonic time, for pattern timing.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, for id allocation.
    fn epoch_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Hand-advanced clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    instant: Instant,
    epoch_millis: u64,
}

impl ManualClock {
    pub fn new(epoch_millis: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                instant: Instant::now(),
                epoch_millis,
            })),
        }
    }

    /// Moves both the monotonic and the wall clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.inner.lock() {
            state.instant += by;
            state.epoch_millis += by.as_millis() as u64;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.inner.lock() {
            Ok(state) => state.instant,
            Err(poisoned) => poisoned.into_inner().instant,
        }
    }

    fn epoch_millis(&self) -> u64 {
        match self.inner.lock() {
            Ok(state) => state.epoch_millis,
            Err(poisoned) => poisoned.into_inner().epoch_millis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_both_timelines() {
        let clock = ManualClock::new(1_000);
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
        assert_eq!(clock.epoch_millis(), 1_250);
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        let before = other.now();
        clock.advance(Duration::from_secs(1));
        assert_eq!(other.now() - before, Duration::from_secs(1));
    }
}
