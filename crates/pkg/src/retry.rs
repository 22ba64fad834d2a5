//! Retry policy for transient registry and package-manager failures.
//!
//! Only failures classified as transient (timeouts, connection resets,
//! throttling, temporary unavailability) are retried; auth and validation
//! failures surface immediately. Delays grow exponentially with jitter and
//! are capped.

use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hash, Hasher};
use std::time::Duration;

/// Exponential backoff policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Multiplier applied per subsequent attempt
    pub factor: f64,
    /// Ceiling on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self { attempts: 1, ..Self::default() }
    }

    /// Delay before the given retry (1-based), with jitter applied.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let raw = self.base_delay.as_secs_f64() * self.factor.powf(f64::from(exponent));
        let capped = raw.min(self.max_delay.as_secs_f64());

        // Jitter between 50% and 100% of the computed delay. A hashed
        // counter stands in for an RNG so no extra dependency is needed.
        let jitter = 0.5 + 0.5 * hashed_fraction(retry);
        Duration::from_secs_f64(capped * jitter)
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts
    /// run out.
    ///
    /// `is_transient` decides whether an error is worth another attempt.
    pub async fn run<T, E, F, Fut, C>(&self, is_transient: C, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        C: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.attempts || !is_transient(&error) {
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "Transient failure (attempt {attempt}/{}): {error}; retrying in {delay:?}",
                        self.attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Deterministic-per-process pseudo-random fraction in [0, 1).
#[allow(clippy::cast_precision_loss)]
fn hashed_fraction(seed: u32) -> f64 {
    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    seed.hash(&mut hasher);
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0)
        .hash(&mut hasher);
    (hasher.finish() % 1_000_000) as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::default();

        let first = policy.delay_for(1);
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_secs(1));

        let second = policy.delay_for(2);
        assert!(second >= Duration::from_secs(1) && second <= Duration::from_secs(2));

        // Far past the cap, delays stay below it.
        let late = policy.delay_for(30);
        assert!(late <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_run_retries_transient_until_success() {
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            factor: 1.0,
            max_delay: Duration::from_millis(2),
        };

        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(
                |_| true,
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { if n < 2 { Err("flaky".to_string()) } else { Ok(n) } }
                },
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_failures() {
        let policy = RetryPolicy::default();

        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy
            .run(
                |_| false,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("unauthorized".to_string()) }
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
            factor: 1.0,
            max_delay: Duration::from_millis(1),
        };

        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy
            .run(
                |_| true,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("still down".to_string()) }
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
