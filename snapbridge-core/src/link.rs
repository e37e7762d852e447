//! Wi-Fi link recovery policy
//!
//! When the link drops, the main loop tears the radio down and re-runs
//! its bring-up, sleeping before every attempt. The sleeps grow
//! exponentially up to a ceiling; once every attempt has failed the
//! device restarts.

use crate::config::RetryConfig;

/// Link recovery errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Every re-initialization attempt failed
    Exhausted { attempts: u32 },
}

/// Delay schedule for link re-initialization
///
/// Yields the sleep before each attempt: the initial delay, then doubling
/// up to the ceiling. Ends after `max_attempts` items.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    config: RetryConfig,
    attempt: u32,
    delay_ms: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            delay_ms: config.initial_delay_ms,
        }
    }

    /// Attempts handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Error to report once the schedule has run out
    pub fn exhausted(&self) -> LinkError {
        LinkError::Exhausted {
            attempts: self.attempt,
        }
    }

    /// Start the schedule over
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.delay_ms = self.config.initial_delay_ms;
    }
}

impl Iterator for Backoff {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        self.attempt += 1;

        let delay = self.delay_ms;
        self.delay_ms = delay.saturating_mul(2).min(self.config.max_delay_ms);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn test_default_schedule() {
        let delays: Vec<u32> = Backoff::new(RetryConfig::default()).collect();
        assert_eq!(delays.len(), 100);
        assert_eq!(&delays[..6], &[1000, 2000, 4000, 8000, 10_000, 10_000]);
        assert!(delays[4..].iter().all(|&d| d == 10_000));
    }

    #[test]
    fn test_exhausted() {
        let mut backoff = Backoff::new(RetryConfig {
            initial_delay_ms: 5,
            max_delay_ms: 20,
            max_attempts: 3,
        });
        assert_eq!(backoff.next(), Some(5));
        assert_eq!(backoff.next(), Some(10));
        assert_eq!(backoff.next(), Some(20));
        assert_eq!(backoff.next(), None);
        assert_eq!(backoff.exhausted(), LinkError::Exhausted { attempts: 3 });
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(RetryConfig::default());
        backoff.by_ref().take(5).for_each(drop);
        assert_eq!(backoff.attempts(), 5);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next(), Some(1000));
    }

    #[test]
    fn test_initial_above_ceiling() {
        let mut backoff = Backoff::new(RetryConfig {
            initial_delay_ms: 50,
            max_delay_ms: 20,
            max_attempts: 2,
        });
        // The first sleep is taken as configured
        assert_eq!(backoff.next(), Some(50));
        assert_eq!(backoff.next(), Some(20));
    }
}
