//! Shared helpers for the WireMock integration tests.

#![allow(dead_code)]

use integrations_github_rest::{AuthMethod, GitHubClient, GitHubConfig, GitHubConfigBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const TOKEN: &str = "ghp_integration";

/// Starts a fresh mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client pointed at `server` with a personal access token and no retries.
pub fn client_for(server: &MockServer) -> GitHubClient {
    client_with(server, |builder| builder)
}

/// Client pointed at `server`, with extra configuration applied.
pub fn client_with(
    server: &MockServer,
    configure: impl FnOnce(GitHubConfigBuilder) -> GitHubConfigBuilder,
) -> GitHubClient {
    let builder = GitHubConfig::builder()
        .base_url(server.uri())
        .auth(AuthMethod::pat(TOKEN))
        .timeout(Duration::from_secs(5))
        .no_retry();
    let config = configure(builder).build().expect("valid config");
    GitHubClient::new(config).expect("client builds")
}

/// Mock expecting the standard headers plus the bearer token.
pub fn authenticated(method_name: &str, path_str: &str) -> MockBuilder {
    Mock::given(method(method_name))
        .and(path(path_str))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
}

/// GitHub style error response.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    }))
}

pub fn user_json(login: &str, id: u64) -> Value {
    json!({
        "login": login,
        "id": id,
        "node_id": "MDQ6VXNlcjE=",
        "type": "User",
        "site_admin": false
    })
}

pub fn repo_json(owner: &str, name: &str, id: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "owner": user_json(owner, 1),
        "private": false,
        "fork": false,
        "default_branch": "main",
        "created_at": "2011-01-26T19:01:12Z",
        "pushed_at": 1296068472
    })
}

/// Rate limit headers for a response.
pub fn with_rate_limit(
    template: ResponseTemplate,
    resource: &str,
    limit: u32,
    remaining: u32,
    reset: i64,
) -> ResponseTemplate {
    template
        .insert_header("x-ratelimit-limit", limit.to_string().as_str())
        .insert_header("x-ratelimit-remaining", remaining.to_string().as_str())
        .insert_header("x-ratelimit-used", (limit - remaining).to_string().as_str())
        .insert_header("x-ratelimit-reset", reset.to_string().as_str())
        .insert_header("x-ratelimit-resource", resource)
}
