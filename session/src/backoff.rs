//! Exponential retry backoff for ledger submissions.

use std::time::Duration;

/// Doubling delay schedule with a ceiling.
///
/// The first call yields the initial delay; each subsequent call doubles it
/// up to the maximum.
pub struct RetrySchedule {
    interval_ms: u64,
    max_ms: u64,
}

impl RetrySchedule {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            interval_ms: initial_ms,
            max_ms,
        }
    }

    /// The delay to sleep before the next retry.
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.interval_ms);
        self.interval_ms = (self.interval_ms.saturating_mul(2)).min(self.max_ms);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_ceiling() {
        let mut schedule = RetrySchedule::new(1_000, 60_000);
        let delays: Vec<u64> = (0..8).map(|_| schedule.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, [1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 60_000, 60_000]);
    }

    #[test]
    fn large_initial_clamps_immediately() {
        let mut schedule = RetrySchedule::new(100, 100);
        assert_eq!(schedule.next_delay().as_millis(), 100);
        assert_eq!(schedule.next_delay().as_millis(), 100);
    }
}
