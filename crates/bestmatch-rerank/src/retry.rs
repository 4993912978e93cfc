//! Attempt-bounded retry with pluggable backoff.
//!
//! A [`RetryPolicy`] decides two things for every failed attempt: whether
//! the error is worth retrying (a predicate over the error) and how long to
//! wait before the next attempt (a [`Backoff`]). The attempt counter lives
//! inside each `execute` call, so one policy can serve concurrent callers.
//!
//! ```ignore
//! let policy = RetryPolicy::transient(3);
//! let response = policy.execute(|| provider.rerank(request.clone())).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, ProviderError};

/// Delay before the next attempt, given how many attempts have failed.
pub trait Backoff: Send + Sync {
    /// `failed_attempts` starts at 1.
    fn delay(&self, failed_attempts: u32) -> Duration;
}

/// `min(initial * exp_base^(n-1) + U[0, jitter), max)`.
///
/// As long as `jitter <= initial * (exp_base - 1)` consecutive delays never
/// decrease; the defaults (1s, x2, 1s jitter, 16s cap) satisfy that.
/// [`ExponentialJitter::new`] clamps to that bound; setting the public
/// fields directly does not, and a larger jitter can yield a shorter delay
/// than the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialJitter {
    pub initial: Duration,
    pub max: Duration,
    pub exp_base: u32,
    pub jitter: Duration,
}

impl Default for ExponentialJitter {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(16),
            exp_base: 2,
            jitter: Duration::from_secs(1),
        }
    }
}

impl ExponentialJitter {
    /// `jitter` is clamped to `initial * (exp_base - 1)` so delays stay
    /// non-decreasing.
    pub fn new(initial: Duration, max: Duration, jitter: Duration) -> Self {
        let backoff = Self {
            initial,
            max,
            jitter,
            ..Self::default()
        };
        let bound = backoff.monotonic_jitter_bound();
        Self {
            jitter: jitter.min(bound),
            ..backoff
        }
    }

    /// Largest jitter that keeps consecutive delays non-decreasing.
    pub fn monotonic_jitter_bound(&self) -> Duration {
        self.initial
            .checked_mul(self.exp_base.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }

    /// Deterministic part of the delay, already capped.
    pub fn base_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        self.exp_base
            .checked_pow(exponent)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Backoff for ExponentialJitter {
    fn delay(&self, failed_attempts: u32) -> Duration {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.jitter.mul_f64(rand::random::<f64>())
        };
        self.base_delay(failed_attempts)
            .saturating_add(jitter)
            .min(self.max)
    }
}

/// Same delay after every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _failed_attempts: u32) -> Duration {
        self.0
    }
}

type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
    retry_if: RetryPredicate<E>,
    log_retries: bool,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: Arc::clone(&self.backoff),
            retry_if: Arc::clone(&self.retry_if),
            log_retries: self.log_retries,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("log_retries", &self.log_retries)
            .finish_non_exhaustive()
    }
}

impl<E: fmt::Display> RetryPolicy<E> {
    /// `max_attempts` counts every attempt including the first; values
    /// below 1 are treated as 1.
    pub fn new<P>(max_attempts: u32, retry_if: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts,
            backoff: Arc::new(ExponentialJitter::default()),
            retry_if: Arc::new(retry_if),
            log_retries: true,
        }
    }

    pub fn with_backoff<B: Backoff + 'static>(mut self, backoff: B) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn silent(mut self) -> Self {
        self.log_retries = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn should_retry(&self, err: &E) -> bool {
        (self.retry_if)(err)
    }

    /// Runs `operation` until it succeeds, fails with an error the
    /// predicate rejects, or the attempt budget runs out. The error of the
    /// last attempt is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => {
                    self.log_success(attempt);
                    return Ok(value);
                }
                Err(err) => err,
            };
            let Some(delay) = self.next_delay(attempt, &err) else {
                return Err(err);
            };
            drop(err);
            sleep(delay).await;
        }
    }

    /// Blocking counterpart of [`execute`](Self::execute) for callers that
    /// drive the operation on their own thread.
    pub fn execute_blocking<F, T>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match operation() {
                Ok(value) => {
                    self.log_success(attempt);
                    return Ok(value);
                }
                Err(err) => err,
            };
            let Some(delay) = self.next_delay(attempt, &err) else {
                return Err(err);
            };
            drop(err);
            std::thread::sleep(delay);
        }
    }

    fn next_delay(&self, attempt: u32, err: &E) -> Option<Duration> {
        let max_attempts = self.max_attempts();
        if !self.should_retry(err) {
            if self.log_retries {
                debug!(attempt, "error is not retryable, stopping: {err}");
            }
            return None;
        }
        if attempt >= max_attempts {
            if self.log_retries {
                warn!(attempt, max_attempts, "giving up after final attempt: {err}");
            }
            return None;
        }

        let delay = self.backoff.delay(attempt);
        if self.log_retries {
            warn!(
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "attempt failed, retrying: {err}"
            );
        }
        Some(delay)
    }

    fn log_success(&self, attempt: u32) {
        if attempt > 1 && self.log_retries {
            info!(attempts = attempt, "operation succeeded after retries");
        }
    }
}

impl RetryPolicy<ProviderError> {
    /// Retries rate limits, unavailability and timeouts.
    pub fn transient(max_attempts: u32) -> Self {
        Self::new(max_attempts, ProviderError::is_transient)
    }

    /// Retries only errors whose kind is listed.
    pub fn for_kinds(max_attempts: u32, kinds: &[ErrorKind]) -> Self {
        let kinds = kinds.to_vec();
        Self::new(max_attempts, move |err: &ProviderError| {
            kinds.contains(&err.kind())
        })
    }
}
