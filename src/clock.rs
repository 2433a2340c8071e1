//! Wall-clock source for ingestion timestamps.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" as fractional seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Current time in seconds since 1970-01-01T00:00:00Z.
    fn now_epoch_seconds(&self) -> f64;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// A deterministic clock that starts at `start` and advances by `step` on every read.
///
/// A `step` of `0.0` gives a fixed clock.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<f64>,
    step: f64,
}

impl SteppingClock {
    /// First read returns `start`; each later read returns `step` seconds more than the last.
    pub fn new(start: f64, step: f64) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// A clock that always reads `at`.
    pub fn fixed(at: f64) -> Self {
        Self::new(at, 0.0)
    }
}

impl Clock for SteppingClock {
    fn now_epoch_seconds(&self) -> f64 {
        let mut next = match self.next.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = *next;
        *next += self.step;
        now
    }
}
