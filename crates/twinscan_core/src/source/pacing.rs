//! Politeness delay between calls to rate-limited sources.

use crate::config::PacingRange;
use rand::Rng;
use std::time::Duration;

/// Random delay drawn from a `[min, max]` millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    range: Option<PacingRange>,
}

impl Pacer {
    /// `min_ms > max_ms` is clamped to `max_ms`.
    pub fn new(range: PacingRange) -> Self {
        let min_ms = range.min_ms.min(range.max_ms);
        Self {
            range: Some(PacingRange::new(min_ms, range.max_ms)),
        }
    }

    /// Never sleeps.
    pub fn disabled() -> Self {
        Self { range: None }
    }

    pub fn next_delay(&self) -> Duration {
        match self.range {
            None => Duration::ZERO,
            Some(range) => {
                Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
            }
        }
    }

    /// Blocks the current thread for one drawn delay.
    pub fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
