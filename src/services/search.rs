//! GitHub Search API operations.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::request::MEDIA_TYPE_TEXT_MATCH;
use crate::types::{Issue, Repository, SearchResult, User};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Service for search operations.
pub struct SearchService<'a> {
    client: &'a GitHubClient,
}

impl<'a> SearchService<'a> {
    /// Creates a new search service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Searches repositories.
    pub async fn repositories(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GitHubResult<SearchResult<Repository>> {
        self.search("repositories", query, options).await
    }

    /// Searches issues and pull requests.
    pub async fn issues(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GitHubResult<SearchResult<Issue>> {
        self.search("issues", query, options).await
    }

    /// Searches users.
    pub async fn users(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GitHubResult<SearchResult<User>> {
        self.search("users", query, options).await
    }

    async fn search<T: DeserializeOwned>(
        &self,
        kind: &str,
        query: &str,
        options: &SearchOptions,
    ) -> GitHubResult<SearchResult<T>> {
        let mut request = self
            .client
            .request(Method::GET, &format!("/search/{}", kind))
            .query(&SearchQuery { q: query, options });
        if options.text_match {
            request = request.media_type(MEDIA_TYPE_TEXT_MATCH);
        }
        self.client.execute(request.build()?).await?.require()
    }
}

/// Options shared by the search endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOptions {
    /// Sort field; depends on the endpoint (`stars`, `forks`, `updated`...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// `asc` or `desc`; ignored unless `sort` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Ask for text match metadata on each result.
    #[serde(skip)]
    pub text_match: bool,
    /// Page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Results per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    #[serde(flatten)]
    options: &'a SearchOptions,
}
