//! Per-category rate limit tracking.
//!
//! Every response carrying `x-ratelimit-*` headers produces a
//! [`RateLimitRecord`]; the [`RateLimitTracker`] keeps the latest record for
//! each [`RateLimitCategory`]. Records are replaced whole, never merged, so a
//! reader always sees `limit`, `remaining` and `reset` from the same response.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::sleep;

/// Header carrying the request quota.
pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
/// Header carrying the remaining requests in the window.
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the requests used in the window.
pub const HEADER_USED: &str = "x-ratelimit-used";
/// Header carrying the window reset as a Unix timestamp.
pub const HEADER_RESET: &str = "x-ratelimit-reset";
/// Header naming the rate limit bucket.
pub const HEADER_RESOURCE: &str = "x-ratelimit-resource";

/// A rate limit bucket tracked independently by GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitCategory {
    /// REST API (default bucket).
    Core,
    /// Search API (except code search).
    Search,
    /// GraphQL API.
    Graphql,
    /// GitHub App manifest conversion.
    IntegrationManifest,
    /// Source imports.
    SourceImport,
    /// Code scanning SARIF uploads.
    CodeScanningUpload,
    /// Self-hosted runner registration.
    ActionsRunnerRegistration,
    /// SCIM provisioning.
    Scim,
    /// Dependency graph snapshots.
    DependencySnapshots,
    /// Code search.
    CodeSearch,
    /// Audit log.
    AuditLog,
    /// A bucket this client does not know about.
    Other(String),
}

impl RateLimitCategory {
    /// Maps the `x-ratelimit-resource` header value to a category.
    pub fn from_resource(resource: &str) -> Self {
        match resource {
            "core" => Self::Core,
            "search" => Self::Search,
            "graphql" => Self::Graphql,
            "integration_manifest" => Self::IntegrationManifest,
            "source_import" => Self::SourceImport,
            "code_scanning_upload" => Self::CodeScanningUpload,
            "actions_runner_registration" => Self::ActionsRunnerRegistration,
            "scim" => Self::Scim,
            "dependency_snapshots" => Self::DependencySnapshots,
            "code_search" => Self::CodeSearch,
            "audit_log" => Self::AuditLog,
            other => Self::Other(other.to_string()),
        }
    }

    /// Infers the category from a request path relative to the API root.
    pub fn for_path(path: &str) -> Self {
        let path = path.trim_start_matches('/');
        if path.starts_with("search/code") {
            Self::CodeSearch
        } else if path.starts_with("search/") {
            Self::Search
        } else if path == "graphql" || path.starts_with("graphql?") {
            Self::Graphql
        } else if path.starts_with("app-manifests/") && path.ends_with("/conversions") {
            Self::IntegrationManifest
        } else if path.starts_with("scim/") {
            Self::Scim
        } else if path.contains("/code-scanning/sarifs") {
            Self::CodeScanningUpload
        } else if path.contains("/actions/runners/registration-token") {
            Self::ActionsRunnerRegistration
        } else if path.contains("/dependency-graph/snapshots") {
            Self::DependencySnapshots
        } else if path.ends_with("/audit-log") {
            Self::AuditLog
        } else {
            Self::Core
        }
    }

    /// Returns the resource name GitHub uses for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Core => "core",
            Self::Search => "search",
            Self::Graphql => "graphql",
            Self::IntegrationManifest => "integration_manifest",
            Self::SourceImport => "source_import",
            Self::CodeScanningUpload => "code_scanning_upload",
            Self::ActionsRunnerRegistration => "actions_runner_registration",
            Self::Scim => "scim",
            Self::DependencySnapshots => "dependency_snapshots",
            Self::CodeSearch => "code_search",
            Self::AuditLog => "audit_log",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RateLimitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit state for one category, as reported by one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// Requests used in the current window.
    #[serde(default)]
    pub used: u32,
    /// Time when the window resets.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub reset: DateTime<Utc>,
}

impl RateLimitRecord {
    /// Parses a record from response headers.
    ///
    /// Returns `None` unless limit, remaining and reset are all present and
    /// well-formed. `x-ratelimit-used` is optional and derived when missing.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit: u32 = header_value(headers, HEADER_LIMIT)?;
        let remaining: u32 = header_value(headers, HEADER_REMAINING)?;
        let reset_timestamp: i64 = header_value(headers, HEADER_RESET)?;
        let reset = DateTime::from_timestamp(reset_timestamp, 0)?;
        let used = header_value(headers, HEADER_USED)
            .unwrap_or_else(|| limit.saturating_sub(remaining));

        Some(Self {
            limit,
            remaining,
            used,
            reset,
        })
    }

    /// Returns true if no requests remain and the window has not reset yet.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0 && self.reset > Utc::now()
    }

    /// Time until the window resets, if it lies in the future.
    pub fn reset_in(&self) -> Option<Duration> {
        (self.reset - Utc::now()).to_std().ok()
    }
}

/// Reads the category a response was counted against.
///
/// Prefers the `x-ratelimit-resource` header; falls back to inferring from
/// the request path.
pub fn category_for(headers: &HeaderMap, path: &str) -> RateLimitCategory {
    headers
        .get(HEADER_RESOURCE)
        .and_then(|v| v.to_str().ok())
        .map(RateLimitCategory::from_resource)
        .unwrap_or_else(|| RateLimitCategory::for_path(path))
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Default)]
struct TrackerState {
    records: HashMap<RateLimitCategory, RateLimitRecord>,
    secondary_until: Option<DateTime<Utc>>,
}

/// Shared rate limit state, one record per category.
///
/// Owned by a [`GitHubClient`](crate::GitHubClient) and shareable across
/// clients. Observation is last-write-wins by completion order.
#[derive(Debug)]
pub struct RateLimitTracker {
    state: RwLock<TrackerState>,
    /// Buffer percentage (0.0 to 1.0).
    buffer_percentage: f64,
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl RateLimitTracker {
    /// Creates a new rate limit tracker.
    pub fn new(buffer_percentage: f64) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            buffer_percentage: buffer_percentage.clamp(0.0, 1.0),
        }
    }

    /// Replaces the record for `category`.
    pub fn observe(&self, category: RateLimitCategory, record: RateLimitRecord) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.records.insert(category, record);
    }

    /// Parses rate limit headers and stores the result.
    ///
    /// Returns the category and record that were stored, if the headers
    /// carried a complete record.
    pub fn observe_headers(
        &self,
        headers: &HeaderMap,
        path: &str,
    ) -> Option<(RateLimitCategory, RateLimitRecord)> {
        let record = RateLimitRecord::from_headers(headers)?;
        let category = category_for(headers, path);
        self.observe(category.clone(), record);
        Some((category, record))
    }

    /// Returns the latest record for `category`.
    pub fn snapshot(&self, category: &RateLimitCategory) -> Option<RateLimitRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.records.get(category).copied()
    }

    /// Returns every known record.
    pub fn snapshot_all(&self) -> HashMap<RateLimitCategory, RateLimitRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.records.clone()
    }

    /// Records that a secondary rate limit applies until `until`.
    pub fn note_secondary_limit(&self, until: DateTime<Utc>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.secondary_until {
            Some(existing) if existing >= until => {}
            _ => state.secondary_until = Some(until),
        }
    }

    /// Time left on the last secondary rate limit, if still in effect.
    pub fn secondary_wait_time(&self) -> Option<Duration> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .secondary_until
            .and_then(|until| (until - Utc::now()).to_std().ok())
            .filter(|wait| !wait.is_zero())
    }

    /// Checks if the category is within the configured buffer of its limit.
    pub fn should_throttle(&self, category: &RateLimitCategory) -> bool {
        match self.snapshot(category) {
            Some(record) => {
                let threshold = record.limit as f64 * self.buffer_percentage;
                record.remaining as f64 <= threshold && record.reset > Utc::now()
            }
            None => false,
        }
    }

    /// Time to wait before the category has quota again, if it is exhausted.
    pub fn wait_time(&self, category: &RateLimitCategory) -> Option<Duration> {
        let record = self.snapshot(category)?;
        if record.remaining > 0 {
            return None;
        }
        record.reset_in()
    }

    /// Sleeps until the category (and any secondary limit) allows requests.
    pub async fn wait_if_needed(&self, category: &RateLimitCategory) {
        let wait = self.wait_time(category).max(self.secondary_wait_time());
        if let Some(wait_time) = wait {
            tracing::warn!(
                category = %category,
                wait_secs = wait_time.as_secs(),
                "Rate limit exceeded, waiting for reset"
            );
            sleep(wait_time).await;
        }
    }
}
