//! Exponential backoff with jitter for sink delivery.

use std::time::{Duration, SystemTime};

/// Configuration for the backoff schedule of one sink.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the delay between retries, in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_ms: 100,
        }
    }
}

/// The backoff state of one sink.
///
/// Delivery in the collector is never abandoned after N attempts — a payload
/// is retried until its sink takes it — so this tracks delay growth only:
/// call [`Backoff::next_delay`] after each failure and [`Backoff::reset`]
/// after a success.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    delay_ms: u64,
    /// Failures since the last successful delivery.
    pub attempts: u64,
}

impl Backoff {
    /// Start a fresh schedule for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        let delay_ms = policy.initial_delay_ms;
        Backoff {
            policy,
            delay_ms,
            attempts: 0,
        }
    }

    /// The delay to sleep before the next attempt. Doubles per failure up
    /// to the policy maximum, plus jitter.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        let jitter = generate_jitter(self.policy.jitter_ms);
        let delay = std::cmp::min(self.delay_ms + jitter, self.policy.max_delay_ms);
        self.delay_ms = std::cmp::min(self.delay_ms * 2, self.policy.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Return to the initial delay after a successful delivery.
    pub fn reset(&mut self) {
        self.delay_ms = self.policy.initial_delay_ms;
        self.attempts = 0;
    }
}

// Derive jitter from the subsecond clock; good enough to de-synchronize
// sinks without pulling a RNG into the collector.
fn generate_jitter(max_jitter: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos as u64 % (max_jitter + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 100,
            max_delay_ms: 1_600,
            jitter_ms: 0,
        }
    }

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new(policy());
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_600, 1_600]);
        assert_eq!(backoff.attempts, 6);
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut backoff = Backoff::new(policy());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts, 0);
        assert_eq!(backoff.next_delay().as_millis(), 100);
    }

    #[test]
    fn jitter_stays_within_bound() {
        for _ in 0..100 {
            assert!(generate_jitter(50) <= 50);
        }
        assert_eq!(generate_jitter(0), 0);
    }
}
