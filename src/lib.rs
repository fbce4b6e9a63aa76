//! # GitHub REST Client
//!
//! The request/response pipeline behind a typed GitHub REST binding:
//! - Request building (path resolution, query encoding, JSON bodies, headers)
//! - Single-attempt execution over a pluggable transport
//! - Error classification (validation, primary and secondary rate limits, server errors)
//! - `Link` header pagination
//! - Per-category rate limit tracking
//! - Opt-in retry and pre-flight rate limit policies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_rest::{AuthMethod, GitHubClient, GitHubConfig, RateLimitCategory};
//! use integrations_github_rest::services::ListOrgReposOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GitHubConfig::builder()
//!         .auth(AuthMethod::pat("ghp_xxxxxxxxxxxx"))
//!         .build()?;
//!
//!     let client = GitHubClient::new(config)?;
//!
//!     let repos = client
//!         .repositories()
//!         .list_all_for_org("rust-lang", &ListOrgReposOptions::default())
//!         .await?;
//!     for repo in repos {
//!         println!("{}", repo.full_name);
//!     }
//!
//!     let core = client.rate_limit_tracker().snapshot(&RateLimitCategory::Core);
//!     println!("core quota: {:?}", core);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Request construction and transport
pub mod request;
pub mod transport;

// Client facade
pub mod client;

// Pagination and rate limits
pub mod pagination;
pub mod rate_limit;

// API Services
pub mod services;

// Resilience patterns
pub mod resilience;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{AuthManager, AuthMethod, Authenticator};
pub use client::{GitHubClient, GitHubClientBuilder, Response, ResponseMeta};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use errors::{GitHubError, GitHubErrorKind, GitHubResult, TransportError};
pub use pagination::{Page, PageIterator, PaginationLinks};
pub use rate_limit::{RateLimitCategory, RateLimitRecord, RateLimitTracker};
pub use request::{QueryParams, RequestBuilder};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::*;
