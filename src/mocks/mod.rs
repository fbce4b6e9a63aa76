//! Mock transport for testing code built on the GitHub client.
//!
//! [`MockTransport`] plugs into [`GitHubClientBuilder::transport`] so the
//! whole pipeline (request building, classification, rate limit tracking,
//! decoding) runs against canned responses.
//!
//! [`GitHubClientBuilder::transport`]: crate::client::GitHubClientBuilder::transport

use crate::errors::TransportError;
use crate::rate_limit::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_RESOURCE, HEADER_USED};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::*;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LINK, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use url::Url;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Headers.
    pub headers: HeaderMap,
    /// Delay before responding.
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    /// Creates a response with a raw body.
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HeaderMap::new(),
            delay: None,
        }
    }

    /// Creates a successful response with the given body.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::raw(200, serde_json::to_string(body).unwrap_or_default())
    }

    /// Creates a 201 Created response.
    pub fn created<T: Serialize>(body: &T) -> Self {
        Self::raw(201, serde_json::to_string(body).unwrap_or_default())
    }

    /// Creates a 202 Accepted response with an empty body.
    pub fn accepted() -> Self {
        Self::raw(202, "")
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::raw(204, "")
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: &str) -> Self {
        Self::raw(
            404,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(message: &str) -> Self {
        Self::raw(
            403,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a 422 Validation Failed response.
    pub fn validation_failed(message: &str, errors: Vec<(&str, &str, &str)>) -> Self {
        let errors: Vec<_> = errors
            .into_iter()
            .map(|(resource, field, code)| {
                serde_json::json!({
                    "resource": resource,
                    "field": field,
                    "code": code
                })
            })
            .collect();

        Self::raw(
            422,
            serde_json::json!({
                "message": message,
                "errors": errors,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a primary rate limit exceeded response.
    pub fn rate_limited() -> Self {
        let reset_at = Utc::now() + Duration::minutes(1);
        Self::raw(
            403,
            serde_json::json!({
                "message": "API rate limit exceeded for user ID 1.",
                "documentation_url": "https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting"
            })
            .to_string(),
        )
        .with_rate_limit(5000, 0, reset_at.timestamp())
    }

    /// Creates a secondary rate limit response with a `retry-after` header.
    pub fn secondary_rate_limited(retry_after_secs: u64) -> Self {
        Self::raw(
            403,
            serde_json::json!({
                "message": "You have exceeded a secondary rate limit. Please wait a few minutes before you try again.",
                "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api#about-secondary-rate-limits"
            })
            .to_string(),
        )
        .with_header(RETRY_AFTER.as_str(), &retry_after_secs.to_string())
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(message: &str) -> Self {
        Self::raw(500, serde_json::json!({ "message": message }).to_string())
    }

    /// Adds a delay to the response.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Adds a header to the response. Invalid names or values are skipped.
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds rate limit headers.
    pub fn with_rate_limit(self, limit: u32, remaining: u32, reset_timestamp: i64) -> Self {
        self.with_header(HEADER_LIMIT, &limit.to_string())
            .with_header(HEADER_REMAINING, &remaining.to_string())
            .with_header(HEADER_USED, &limit.saturating_sub(remaining).to_string())
            .with_header(HEADER_RESET, &reset_timestamp.to_string())
    }

    /// Sets the `x-ratelimit-resource` header.
    pub fn with_rate_limit_resource(self, resource: &str) -> Self {
        self.with_header(HEADER_RESOURCE, resource)
    }

    /// Sets the `Link` header.
    pub fn with_link(self, link: &str) -> Self {
        self.with_header(LINK.as_str(), link)
    }

    fn into_http(self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::new(status, self.headers, Bytes::from(self.body))
    }
}

/// A transport failure to inject instead of a response.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Connection refused.
    Connect(String),
    /// Deadline exceeded.
    Timeout,
    /// Any other HTTP failure.
    Http(String),
}

impl From<MockFailure> for TransportError {
    fn from(failure: MockFailure) -> Self {
        match failure {
            MockFailure::Connect(msg) => TransportError::Connect(msg),
            MockFailure::Timeout => TransportError::Timeout("mock timeout".to_string()),
            MockFailure::Http(msg) => TransportError::Http(msg),
        }
    }
}

#[derive(Debug, Clone)]
enum Queued {
    Respond(MockResponse),
    Fail(MockFailure),
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL.
    pub url: Url,
    /// Request headers, as sent.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MockRequest {
    /// URL path of the request.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Decodes the JSON body.
    pub fn body_json<T: DeserializeOwned>(&self) -> Option<T> {
        self.body
            .as_ref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

/// Default behavior for unmatched requests.
#[derive(Debug, Clone, Copy, Default)]
pub enum DefaultBehavior {
    /// Return 404 for unmatched requests.
    #[default]
    NotFound,
    /// Fail with a transport error for unmatched requests.
    Error,
    /// Panic on unmatched requests.
    Panic,
}

/// Transport that answers from queued responses keyed by method and path.
///
/// Responses registered for the same method and path are returned in order;
/// the last one is repeated once the queue runs dry.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<Queued>>>,
    requests: Mutex<Vec<MockRequest>>,
    default_behavior: DefaultBehavior,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default behavior for unmatched requests.
    pub fn with_default_behavior(mut self, behavior: DefaultBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    fn key(method: Method, path: &str) -> (Method, String) {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        (method, path)
    }

    fn enqueue(&self, method: Method, path: &str, item: Queued) {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        responses
            .entry(Self::key(method, path))
            .or_default()
            .push_back(item);
    }

    /// Registers a response for a given method and path (without query).
    pub fn register(&self, method: Method, path: &str, response: MockResponse) {
        self.enqueue(method, path, Queued::Respond(response));
    }

    /// Registers a transport failure for a given method and path.
    pub fn register_failure(&self, method: Method, path: &str, failure: MockFailure) {
        self.enqueue(method, path, Queued::Fail(failure));
    }

    /// Registers a GET response.
    pub fn on_get(&self, path: &str, response: MockResponse) {
        self.register(Method::GET, path, response);
    }

    /// Registers a POST response.
    pub fn on_post(&self, path: &str, response: MockResponse) {
        self.register(Method::POST, path, response);
    }

    /// Registers a PUT response.
    pub fn on_put(&self, path: &str, response: MockResponse) {
        self.register(Method::PUT, path, response);
    }

    /// Registers a PATCH response.
    pub fn on_patch(&self, path: &str, response: MockResponse) {
        self.register(Method::PATCH, path, response);
    }

    /// Registers a DELETE response.
    pub fn on_delete(&self, path: &str, response: MockResponse) {
        self.register(Method::DELETE, path, response);
    }

    fn next_for(&self, method: &Method, path: &str) -> Option<Queued> {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = responses.get_mut(&Self::key(method.clone(), path))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Gets requests matching a method and path.
    pub fn requests_matching(&self, method: Method, path: &str) -> Vec<MockRequest> {
        let (_, path) = Self::key(method.clone(), path);
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }

    /// Verifies that a specific request was made.
    pub fn verify_request(&self, method: Method, path: &str) -> bool {
        !self.requests_matching(method, path).is_empty()
    }

    /// Gets the count of requests made.
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Clears recorded requests and registered responses.
    pub fn reset(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method.clone();
        let path = request.url.path().to_string();

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body: request.body,
                timestamp: Utc::now(),
            });

        match self.next_for(&method, &path) {
            Some(Queued::Respond(response)) => {
                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response.into_http())
            }
            Some(Queued::Fail(failure)) => Err(failure.into()),
            None => match self.default_behavior {
                DefaultBehavior::NotFound => Ok(MockResponse::not_found(&format!(
                    "No mock response for {} {}",
                    method, path
                ))
                .into_http()),
                DefaultBehavior::Error => Err(TransportError::Http(format!(
                    "No mock response for {} {}",
                    method, path
                ))),
                DefaultBehavior::Panic => {
                    panic!("No mock response for {} {}", method, path);
                }
            },
        }
    }
}

/// Test fixtures for common GitHub types.
pub mod fixtures {
    use super::*;

    /// Creates a test user.
    pub fn user(login: &str) -> User {
        User {
            id: 1,
            login: login.to_string(),
            node_id: Some("MDQ6VXNlcjE=".to_string()),
            avatar_url: Some("https://avatars.githubusercontent.com/u/1?v=4".to_string()),
            html_url: Some(format!("https://github.com/{}", login)),
            user_type: Some("User".to_string()),
            site_admin: false,
            name: None,
            email: None,
            created_at: None,
            text_matches: Vec::new(),
        }
    }

    /// Creates a test team.
    pub fn team(slug: &str) -> Team {
        Team {
            id: 7,
            name: slug.replace('-', " "),
            slug: Some(slug.to_string()),
            node_id: None,
            description: None,
            privacy: Some("closed".to_string()),
            permission: Some("pull".to_string()),
            html_url: None,
        }
    }

    /// Creates a test repository.
    pub fn repository(owner: &str, name: &str) -> Repository {
        Repository {
            id: 1,
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            owner: Some(user(owner)),
            node_id: Some("MDEwOlJlcG9zaXRvcnkx".to_string()),
            private: false,
            description: Some("A test repository".to_string()),
            fork: false,
            html_url: Some(format!("https://github.com/{}/{}", owner, name)),
            default_branch: Some("main".to_string()),
            language: Some("Rust".to_string()),
            forks_count: 10,
            stargazers_count: 100,
            open_issues_count: 5,
            topics: vec!["rust".to_string(), "api".to_string()],
            visibility: Some("public".to_string()),
            archived: false,
            license: None,
            created_at: None,
            updated_at: None,
            pushed_at: None,
            text_matches: Vec::new(),
        }
    }

    /// Creates a Copilot seat held by a user.
    pub fn copilot_seat(login: &str) -> CopilotSeatDetails {
        CopilotSeatDetails {
            assignee: Assignee::User(user(login)),
            assigning_team: None,
            pending_cancellation_date: None,
            last_activity_at: None,
            last_activity_editor: None,
            created_at: Timestamp::new(Utc::now()),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(
            method,
            Url::parse("https://api.github.com/").unwrap().join(path).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_queued_responses_in_order() {
        let mock = MockTransport::new();
        mock.on_get("/repos/o/r", MockResponse::server_error("boom"));
        mock.on_get("/repos/o/r", MockResponse::ok(&fixtures::repository("o", "r")));

        let first = mock.send(request(Method::GET, "repos/o/r")).await.unwrap();
        let second = mock.send(request(Method::GET, "repos/o/r")).await.unwrap();
        let third = mock.send(request(Method::GET, "repos/o/r")).await.unwrap();

        assert_eq!(first.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(third.status, StatusCode::OK);
        assert_eq!(mock.requests_matching(Method::GET, "repos/o/r").len(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_request_is_not_found() {
        let mock = MockTransport::new();
        let response = mock.send(request(Method::GET, "nothing")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(mock.verify_request(Method::GET, "/nothing"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mock = MockTransport::new();
        mock.register_failure(Method::GET, "user", MockFailure::Connect("refused".into()));

        let err = mock.send(request(Method::GET, "user")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[test]
    fn test_rate_limited_fixture_headers() {
        let response = MockResponse::rate_limited();
        assert_eq!(response.headers[HEADER_REMAINING], "0");
        assert_eq!(response.headers[HEADER_USED], "5000");
    }
}
