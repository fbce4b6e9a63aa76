//! Rate limit status.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::RateLimits;

/// Service for the rate limit endpoint.
pub struct RateLimitService<'a> {
    client: &'a GitHubClient,
}

impl<'a> RateLimitService<'a> {
    /// Creates a new rate limit service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets the status of every rate limit bucket.
    ///
    /// Does not count against the core limit. The returned buckets are also
    /// stored in the client's tracker.
    pub async fn get(&self) -> GitHubResult<RateLimits> {
        let limits: RateLimits = self.client.get("/rate_limit").await?.require()?;

        let tracker = self.client.rate_limit_tracker();
        for (category, record) in limits.iter() {
            tracker.observe(category, *record);
        }
        Ok(limits)
    }
}
