//! Optional policies wrapped around single-attempt calls.
//!
//! The client performs exactly one attempt per call. [`RetryExecutor`]
//! re-runs an operation on retryable errors; [`RateLimitGuard`] refuses to
//! send while the tracker knows the quota is gone.

use crate::config::RetryConfig;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::{Metrics, TracingHooks};
use crate::rate_limit::{RateLimitCategory, RateLimitTracker};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Retry executor with exponential backoff.
pub struct RetryExecutor {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter: f64,
    metrics: Option<Arc<Metrics>>,
}

impl RetryExecutor {
    /// Creates a new retry executor.
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
        jitter: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            multiplier,
            jitter: jitter.clamp(0.0, 1.0),
            metrics: None,
        }
    }

    /// Creates an executor from configuration. Disabled retries mean a single
    /// attempt.
    pub fn from_config(config: &RetryConfig) -> Self {
        let attempts = if config.enabled { config.max_attempts } else { 1 };
        Self::new(
            attempts,
            config.initial_backoff,
            config.max_backoff,
            config.multiplier,
            config.jitter,
        )
    }

    /// Counts retries in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Executes an operation with retry logic.
    ///
    /// Only errors for which [`GitHubError::is_retryable`] holds are retried.
    /// A server-provided wait longer than the maximum backoff is not slept
    /// through; the error is returned instead.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GitHubResult<T>>,
    {
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };
            attempt += 1;

            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(error);
            }

            let delay = match error.retry_after() {
                Some(wait) if wait > self.max_backoff => return Err(error),
                Some(wait) => wait,
                None => self.calculate_backoff(attempt),
            };

            TracingHooks::on_retry(attempt, &error, delay);
            if let Some(ref metrics) = self.metrics {
                metrics.record_retry();
            }
            sleep(delay).await;
        }
    }

    /// Calculates backoff duration for an attempt.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_backoff.as_millis() as f64);

        let jitter_range = capped * self.jitter;
        let jitter_value = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_delay = (capped + jitter_value).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Pre-flight check against the tracked rate limit state.
#[derive(Debug, Clone)]
pub struct RateLimitGuard {
    tracker: Arc<RateLimitTracker>,
}

impl RateLimitGuard {
    /// Creates a guard over `tracker`.
    pub fn new(tracker: Arc<RateLimitTracker>) -> Self {
        Self { tracker }
    }

    /// Fails without sending if a secondary limit is in effect or the
    /// category's quota is exhausted until a future reset.
    pub fn check(&self, category: &RateLimitCategory) -> GitHubResult<()> {
        if let Some(wait) = self.tracker.secondary_wait_time() {
            return Err(GitHubError::new(
                GitHubErrorKind::AbuseDetected,
                format!(
                    "Secondary rate limit in effect for another {}s; request not sent",
                    wait.as_secs()
                ),
            )
            .with_retry_after(wait));
        }

        if let Some(record) = self.tracker.snapshot(category) {
            if record.is_exhausted() {
                let mut error = GitHubError::new(
                    GitHubErrorKind::RateLimited,
                    format!(
                        "Rate limit for {} exhausted until {}; request not sent",
                        category, record.reset
                    ),
                )
                .with_rate_limit(record);
                if let Some(wait) = record.reset_in() {
                    error = error.with_retry_after(wait);
                }
                return Err(error);
            }
        }

        Ok(())
    }
}
