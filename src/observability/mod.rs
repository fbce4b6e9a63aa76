//! Logging and metrics for GitHub API calls.

use crate::errors::GitHubError;
use crate::rate_limit::{RateLimitCategory, RateLimitRecord};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

/// Metrics collector for GitHub API operations.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    requests_retried: AtomicU64,
    requests_rate_limited: AtomicU64,
    requests_cancelled: AtomicU64,
    /// Total request latency in microseconds.
    latency_total_us: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful request.
    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed request.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a retried request.
    pub fn record_retry(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request rejected by a primary or secondary rate limit.
    pub fn record_rate_limited(&self) {
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cancelled request.
    pub fn record_cancelled(&self) {
        self.requests_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records request latency.
    pub fn record_latency(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.latency_total_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total request count.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Gets the successful request count.
    pub fn successful_requests(&self) -> u64 {
        self.requests_success.load(Ordering::Relaxed)
    }

    /// Gets the failed request count.
    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Gets the retried request count.
    ///
    /// The client makes a single attempt per call and never counts retries
    /// itself. This stays at zero unless a
    /// [`RetryExecutor`](crate::resilience::RetryExecutor) is given these
    /// metrics with `with_metrics`.
    pub fn retried_requests(&self) -> u64 {
        self.requests_retried.load(Ordering::Relaxed)
    }

    /// Gets the rate-limited request count.
    pub fn rate_limited_requests(&self) -> u64 {
        self.requests_rate_limited.load(Ordering::Relaxed)
    }

    /// Gets the cancelled request count.
    pub fn cancelled_requests(&self) -> u64 {
        self.requests_cancelled.load(Ordering::Relaxed)
    }

    /// Gets the average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        let total = self.latency_total_us.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            total / count
        }
    }

    /// Gets a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.total_requests(),
            requests_success: self.successful_requests(),
            requests_failed: self.failed_requests(),
            requests_retried: self.retried_requests(),
            requests_rate_limited: self.rate_limited_requests(),
            requests_cancelled: self.cancelled_requests(),
            average_latency_us: self.average_latency_us(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total requests.
    pub requests_total: u64,
    /// Successful requests.
    pub requests_success: u64,
    /// Failed requests.
    pub requests_failed: u64,
    /// Retried requests.
    pub requests_retried: u64,
    /// Rate-limited requests.
    pub requests_rate_limited: u64,
    /// Cancelled requests.
    pub requests_cancelled: u64,
    /// Average latency in microseconds.
    pub average_latency_us: u64,
}

/// Measures one request and records its outcome.
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<Metrics>,
}

impl RequestTimer {
    /// Starts timing and counts the request.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        metrics.record_request();
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Records success and latency.
    pub fn success(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record_success();
        self.metrics.record_latency(elapsed);
        elapsed
    }

    /// Records failure and latency, classifying rate limits and cancellation.
    pub fn failure(self, error: &GitHubError) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record_failure();
        if error.is_rate_limit() {
            self.metrics.record_rate_limited();
        } else if error.kind() == crate::errors::GitHubErrorKind::Cancelled {
            self.metrics.record_cancelled();
        }
        self.metrics.record_latency(elapsed);
        elapsed
    }

    /// Gets elapsed time without recording.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Tracing hooks for GitHub API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &Method, url: &Url, headers: &HeaderMap) {
        debug!(
            method = %method,
            url = %url,
            "GitHub API request started"
        );
        trace!(headers = ?redacted_headers(headers), "GitHub API request headers");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &Method, url: &Url, status: u16, duration: Duration) {
        info!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(method: &Method, url: &Url, error: &GitHubError, duration: Duration) {
        let kind = error.kind();
        if error.is_transport() {
            warn!(
                method = %method,
                url = %url,
                kind = %kind,
                duration_ms = duration.as_millis() as u64,
                error = %error.message(),
                "GitHub API request failed without a response"
            );
        } else {
            debug!(
                method = %method,
                url = %url,
                kind = %kind,
                status = error.status_code(),
                duration_ms = duration.as_millis() as u64,
                error = %error.message(),
                "GitHub API request returned an error"
            );
        }
    }

    /// Logs a retry attempt.
    #[instrument(skip(error, delay))]
    pub fn on_retry(attempt: u32, error: &GitHubError, delay: Duration) {
        warn!(
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Retrying GitHub API request"
        );
    }

    /// Logs rate limit info.
    pub fn on_rate_limit_update(category: &RateLimitCategory, record: &RateLimitRecord) {
        debug!(
            resource = %category,
            limit = record.limit,
            remaining = record.remaining,
            used = record.used,
            reset_at = %record.reset,
            "Rate limit updated"
        );
    }

    /// Logs rate limit exceeded.
    pub fn on_rate_limit_exceeded(category: &RateLimitCategory, record: &RateLimitRecord) {
        warn!(
            resource = %category,
            limit = record.limit,
            remaining = record.remaining,
            reset_at = %record.reset,
            "Rate limit exceeded"
        );
    }

    /// Logs a secondary rate limit.
    pub fn on_secondary_limit(until: DateTime<Utc>) {
        warn!(until = %until, "Secondary rate limit triggered");
    }
}

/// Sensitive headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-github-token",
    "x-access-token",
    "cookie",
    "set-cookie",
];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Renders a header map with sensitive values redacted.
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            (name.to_string(), redact_header(name.as_str(), value))
        })
        .collect()
}
