//! User operations.

use crate::client::{GitHubClient, ResponseMeta};
use crate::errors::GitHubResult;
use crate::pagination::PaginationParams;
use crate::types::User;

/// Service for user operations.
pub struct UsersService<'a> {
    client: &'a GitHubClient,
}

impl<'a> UsersService<'a> {
    /// Creates a new users service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets the authenticated user.
    pub async fn get_authenticated(&self) -> GitHubResult<User> {
        self.client.get("/user").await?.require()
    }

    /// Gets a user by username.
    pub async fn get(&self, username: &str) -> GitHubResult<User> {
        self.client
            .get(&format!("/users/{}", username))
            .await?
            .require()
    }

    // Blocking

    /// Lists users blocked by the authenticated user.
    pub async fn list_blocked(&self, options: &PaginationParams) -> GitHubResult<Vec<User>> {
        let response = self
            .client
            .get_with_params("/user/blocks", options)
            .await?;
        Ok(response.into_data().unwrap_or_default())
    }

    /// Checks if the authenticated user has blocked a user.
    pub async fn is_blocked(&self, username: &str) -> GitHubResult<bool> {
        self.client
            .check(&format!("/user/blocks/{}", username))
            .await
    }

    /// Blocks a user.
    pub async fn block(&self, username: &str) -> GitHubResult<ResponseMeta> {
        self.client
            .put_empty(&format!("/user/blocks/{}", username))
            .await
    }

    /// Unblocks a user.
    pub async fn unblock(&self, username: &str) -> GitHubResult<ResponseMeta> {
        self.client
            .delete(&format!("/user/blocks/{}", username))
            .await
    }
}
