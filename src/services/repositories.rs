//! Repository operations.

use crate::client::{GitHubClient, Response, ResponseMeta};
use crate::errors::GitHubResult;
use crate::pagination::Page;
use crate::types::{
    ContributorStats, CustomPropertyValue, Repository, RepositoryParticipation,
    WeeklyCommitActivity,
};
use reqwest::Method;
use serde::Serialize;

/// Service for repository operations.
pub struct RepositoriesService<'a> {
    client: &'a GitHubClient,
}

impl<'a> RepositoriesService<'a> {
    /// Creates a new repositories service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets a repository.
    pub async fn get(&self, owner: &str, repo: &str) -> GitHubResult<Repository> {
        self.client
            .get(&format!("/repos/{}/{}", owner, repo))
            .await?
            .require()
    }

    /// Lists public repositories for a user, one page at a time.
    pub async fn list_for_user(
        &self,
        username: &str,
        options: &ListUserReposOptions,
    ) -> GitHubResult<Page<Repository>> {
        let request = self
            .client
            .request(Method::GET, &format!("/users/{}/repos", username))
            .query(options)
            .build()?;
        self.client.get_page(request).await
    }

    /// Lists repositories for an organization, one page at a time.
    pub async fn list_for_org(
        &self,
        org: &str,
        options: &ListOrgReposOptions,
    ) -> GitHubResult<Page<Repository>> {
        let request = self
            .client
            .request(Method::GET, &format!("/orgs/{}/repos", org))
            .query(options)
            .build()?;
        self.client.get_page(request).await
    }

    /// Lists every repository of an organization.
    pub async fn list_all_for_org(
        &self,
        org: &str,
        options: &ListOrgReposOptions,
    ) -> GitHubResult<Vec<Repository>> {
        self.client
            .list_all(&format!("/orgs/{}/repos", org), options)
            .await
    }

    // Statistics. GitHub answers 202 with an empty body while it computes
    // these; the response then has no data and the caller should ask again.

    /// Gets additions, deletions and commits per contributor.
    pub async fn contributor_stats(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Response<Vec<ContributorStats>>> {
        self.client
            .get(&format!("/repos/{}/{}/stats/contributors", owner, repo))
            .await
    }

    /// Gets the last year of commit activity grouped by week.
    pub async fn commit_activity(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Response<Vec<WeeklyCommitActivity>>> {
        self.client
            .get(&format!("/repos/{}/{}/stats/commit_activity", owner, repo))
            .await
    }

    /// Gets weekly commit counts for the owner and everyone else.
    pub async fn participation(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Response<RepositoryParticipation>> {
        self.client
            .get(&format!("/repos/{}/{}/stats/participation", owner, repo))
            .await
    }

    // Custom properties

    /// Gets all custom property values set for a repository.
    pub async fn custom_property_values(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Vec<CustomPropertyValue>> {
        let response = self
            .client
            .get(&format!("/repos/{}/{}/properties/values", owner, repo))
            .await?;
        Ok(response.into_data().unwrap_or_default())
    }

    /// Creates or updates custom property values. A value of `None` removes
    /// the property from the repository.
    pub async fn set_custom_property_values(
        &self,
        owner: &str,
        repo: &str,
        properties: &[CustomPropertyValue],
    ) -> GitHubResult<ResponseMeta> {
        let request = self
            .client
            .request(
                Method::PATCH,
                &format!("/repos/{}/{}/properties/values", owner, repo),
            )
            .json(&SetCustomPropertyValues { properties })
            .build()?;
        self.client.execute_empty(request).await
    }
}

#[derive(Serialize)]
struct SetCustomPropertyValues<'a> {
    properties: &'a [CustomPropertyValue],
}

/// Options for listing a user's repositories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListUserReposOptions {
    /// `all`, `owner` or `member`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    /// `created`, `updated`, `pushed` or `full_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Results per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// Options for listing an organization's repositories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListOrgReposOptions {
    /// `all`, `public`, `private`, `forks`, `sources`, `member`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    /// `created`, `updated`, `pushed` or `full_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Results per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}
