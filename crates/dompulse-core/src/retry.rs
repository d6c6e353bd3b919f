//! Retry policy for the dispatch cycle: attempt budget, backoff, and the
//! bounded rate-limit wait.

use std::time::Duration;

/// Backoff strategy between transient-failure retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed {
        delay: Duration,
    },
    /// Delay grows with the attempt count: `attempt * step`, capped at `max`.
    Linear {
        step: Duration,
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_secs(2),
            max: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// Delay before the retry following the given attempt (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, max } => {
                let scaled = step.saturating_mul(attempt.max(1));
                scaled.min(max)
            }
        }
    }
}

/// Retry discipline for one dispatch cycle.
///
/// Provider and notifier transient failures draw from the same attempt
/// budget; rate-limit waits are tracked separately and capped so sustained
/// upstream throttling cannot hold a cycle open forever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts across fetch and send. The first attempt counts.
    pub max_attempts: u32,
    /// Backoff between transient-failure retries.
    pub backoff: Backoff,
    /// Maximum rate-limit waits honored per cycle.
    pub max_rate_limit_waits: u32,
    /// Bounds of the random jitter added to each rate-limit wait.
    pub rate_limit_jitter: (Duration, Duration),
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            max_rate_limit_waits: 5,
            rate_limit_jitter: (Duration::from_secs(1), Duration::from_secs(3)),
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// Delay before the retry following the given attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Full wait for an upstream-signaled rate limit: the signaled duration
    /// plus bounded random jitter, so co-scheduled processes do not retry in
    /// lockstep.
    pub fn rate_limit_wait(&self, retry_after: Duration) -> Duration {
        retry_after + self.sample_jitter()
    }

    fn sample_jitter(&self) -> Duration {
        let (min, max) = self.rate_limit_jitter;
        if max <= min {
            return min;
        }
        let span_ms = (max - min).as_millis() as u64;
        min + Duration::from_millis(fastrand::u64(0..=span_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(5), Duration::from_millis(100));
    }

    #[test]
    fn linear_backoff_grows_with_attempt_and_caps() {
        let backoff = Backoff::Linear {
            step: Duration::from_secs(2),
            max: Duration::from_secs(5),
        };

        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(5)); // capped
    }

    #[test]
    fn linear_backoff_is_monotonically_non_decreasing() {
        let backoff = Backoff::default();

        let mut previous = Duration::ZERO;
        for attempt in 1..=40 {
            let delay = backoff.delay(attempt);
            assert!(delay >= previous, "attempt {attempt} regressed");
            previous = delay;
        }
    }

    #[test]
    fn rate_limit_wait_adds_bounded_jitter() {
        let config = RetryConfig {
            rate_limit_jitter: (Duration::from_secs(1), Duration::from_secs(3)),
            ..RetryConfig::default()
        };
        let signaled = Duration::from_secs(5);

        for _ in 0..50 {
            let wait = config.rate_limit_wait(signaled);
            assert!(wait >= signaled + Duration::from_secs(1));
            assert!(wait <= signaled + Duration::from_secs(3));
        }
    }

    #[test]
    fn degenerate_jitter_range_collapses_to_minimum() {
        let config = RetryConfig {
            rate_limit_jitter: (Duration::from_millis(10), Duration::from_millis(10)),
            ..RetryConfig::default()
        };

        assert_eq!(
            config.rate_limit_wait(Duration::ZERO),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn default_budget_matches_cycle_contract() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_rate_limit_waits, 5);
    }
}
