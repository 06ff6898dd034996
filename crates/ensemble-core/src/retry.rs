//! Retry policies consumed by coordination clients
//!
//! A policy is asked before every retry whether another attempt is allowed
//! and, if so, how long to sleep first.

use rand::Rng;
use std::fmt::Debug;
use std::time::Duration;
use tracing::warn;

/// Strategy deciding whether and when to retry a failed attempt
pub trait RetryPolicy: Debug + Send + Sync {
    /// Decide on the retry following `retry_count` failed retries
    ///
    /// # Arguments
    /// * `retry_count` - Number of retries already performed (0 on first failure)
    /// * `elapsed` - Time spent since the first attempt
    ///
    /// # Returns
    /// `Some(sleep)` to retry after sleeping, `None` to give up
    fn allow_retry(&self, retry_count: u32, elapsed: Duration) -> Option<Duration>;
}

/// Retry a bounded number of times with randomized exponential backoff
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    base_sleep: Duration,
    max_retries: u32,
    max_sleep: Duration,
}

impl ExponentialBackoffRetry {
    /// Upper bound on retries; beyond this the backoff factor would overflow
    pub const MAX_RETRIES_LIMIT: u32 = 29;

    /// Create an unbounded-sleep exponential backoff policy
    pub fn new(base_sleep: Duration, max_retries: u32) -> Self {
        Self::bounded(base_sleep, max_retries, Duration::MAX)
    }

    /// Create an exponential backoff policy whose sleep never exceeds `max_sleep`
    pub fn bounded(base_sleep: Duration, max_retries: u32, max_sleep: Duration) -> Self {
        let max_retries = if max_retries > Self::MAX_RETRIES_LIMIT {
            warn!(
                requested = max_retries,
                limit = Self::MAX_RETRIES_LIMIT,
                "max_retries too large, clamping"
            );
            Self::MAX_RETRIES_LIMIT
        } else {
            max_retries
        };

        Self {
            base_sleep,
            max_retries,
            max_sleep,
        }
    }

    pub fn base_sleep(&self) -> Duration {
        self.base_sleep
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_sleep(&self) -> Duration {
        self.max_sleep
    }

    fn sleep_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(Self::MAX_RETRIES_LIMIT) + 1;
        let factor = rand::thread_rng().gen_range(1..=(1u32 << exponent));
        self.base_sleep.saturating_mul(factor).min(self.max_sleep)
    }
}

impl RetryPolicy for ExponentialBackoffRetry {
    fn allow_retry(&self, retry_count: u32, _elapsed: Duration) -> Option<Duration> {
        (retry_count < self.max_retries).then(|| self.sleep_for(retry_count))
    }
}

/// Retry up to `n` times with a fixed sleep between attempts
#[derive(Debug, Clone)]
pub struct RetryNTimes {
    n: u32,
    sleep_between: Duration,
}

impl RetryNTimes {
    pub fn new(n: u32, sleep_between: Duration) -> Self {
        Self { n, sleep_between }
    }
}

impl RetryPolicy for RetryNTimes {
    fn allow_retry(&self, retry_count: u32, _elapsed: Duration) -> Option<Duration> {
        (retry_count < self.n).then_some(self.sleep_between)
    }
}

/// Retry exactly once
#[derive(Debug, Clone)]
pub struct RetryOneTime {
    inner: RetryNTimes,
}

impl RetryOneTime {
    pub fn new(sleep: Duration) -> Self {
        Self {
            inner: RetryNTimes::new(1, sleep),
        }
    }
}

impl RetryPolicy for RetryOneTime {
    fn allow_retry(&self, retry_count: u32, elapsed: Duration) -> Option<Duration> {
        self.inner.allow_retry(retry_count, elapsed)
    }
}

/// Retry until a total amount of time has elapsed
#[derive(Debug, Clone)]
pub struct RetryUntilElapsed {
    max_elapsed: Duration,
    sleep_between: Duration,
}

impl RetryUntilElapsed {
    pub fn new(max_elapsed: Duration, sleep_between: Duration) -> Self {
        Self {
            max_elapsed,
            sleep_between,
        }
    }
}

impl RetryPolicy for RetryUntilElapsed {
    fn allow_retry(&self, _retry_count: u32, elapsed: Duration) -> Option<Duration> {
        (elapsed < self.max_elapsed).then_some(self.sleep_between)
    }
}

/// Never give up
#[derive(Debug, Clone)]
pub struct RetryForever {
    sleep_between: Duration,
}

impl RetryForever {
    pub fn new(sleep_between: Duration) -> Self {
        Self { sleep_between }
    }
}

impl RetryPolicy for RetryForever {
    fn allow_retry(&self, _retry_count: u32, _elapsed: Duration) -> Option<Duration> {
        Some(self.sleep_between)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_bounds() {
        let policy = ExponentialBackoffRetry::new(Duration::from_millis(10), 3);

        for retry in 0..3 {
            let sleep = policy.allow_retry(retry, Duration::ZERO).unwrap();
            let upper = Duration::from_millis(10) * (1 << (retry + 1));
            assert!(sleep >= Duration::from_millis(10));
            assert!(sleep <= upper, "retry {retry}: {sleep:?} > {upper:?}");
        }

        assert!(policy.allow_retry(3, Duration::ZERO).is_none());
    }

    #[test]
    fn test_exponential_backoff_respects_max_sleep() {
        let policy = ExponentialBackoffRetry::bounded(
            Duration::from_secs(1),
            10,
            Duration::from_millis(1500),
        );

        for retry in 0..10 {
            let sleep = policy.allow_retry(retry, Duration::ZERO).unwrap();
            assert!(sleep <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_exponential_backoff_clamps_retries() {
        let policy = ExponentialBackoffRetry::new(Duration::from_millis(1), 100);
        assert_eq!(policy.max_retries(), ExponentialBackoffRetry::MAX_RETRIES_LIMIT);
        assert!(policy.allow_retry(28, Duration::ZERO).is_some());
        assert!(policy.allow_retry(29, Duration::ZERO).is_none());
    }

    #[test]
    fn test_retry_n_times() {
        let policy = RetryNTimes::new(2, Duration::from_millis(50));
        assert_eq!(
            policy.allow_retry(0, Duration::ZERO),
            Some(Duration::from_millis(50))
        );
        assert!(policy.allow_retry(1, Duration::ZERO).is_some());
        assert!(policy.allow_retry(2, Duration::ZERO).is_none());

        let once = RetryOneTime::new(Duration::from_millis(5));
        assert!(once.allow_retry(0, Duration::ZERO).is_some());
        assert!(once.allow_retry(1, Duration::ZERO).is_none());
    }

    #[test]
    fn test_retry_until_elapsed() {
        let policy = RetryUntilElapsed::new(Duration::from_secs(5), Duration::from_millis(100));
        assert!(policy.allow_retry(1000, Duration::from_secs(4)).is_some());
        assert!(policy.allow_retry(0, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_retry_forever() {
        let policy = RetryForever::new(Duration::from_millis(20));
        assert_eq!(
            policy.allow_retry(u32::MAX, Duration::MAX),
            Some(Duration::from_millis(20))
        );
    }
}
