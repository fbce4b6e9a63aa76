//! GitHub API client implementation.
//!
//! [`GitHubClient`] performs exactly one transport attempt per call. Every
//! response is first observed by the rate limit tracker, then classified,
//! then decoded. Retrying and pre-emptive throttling live in
//! [`resilience`](crate::resilience).

mod classify;

use crate::auth::{AuthManager, AuthMethod, Authenticator};
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{GitHubError, GitHubResult, TransportError};
use crate::observability::{Metrics, RequestTimer, TracingHooks};
use crate::pagination::{merge_cursor, Page, PageIterator, PaginationLinks};
use crate::rate_limit::{category_for, RateLimitCategory, RateLimitRecord, RateLimitTracker};
use crate::request::{encode_query, RequestBuilder, RequestDefaults};
use crate::resilience::RateLimitGuard;
use crate::services::*;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Header carrying GitHub's request identifier.
pub const HEADER_REQUEST_ID: &str = "x-github-request-id";

/// Header carrying the expiry of the token used for the request.
pub const HEADER_TOKEN_EXPIRATION: &str = "github-authentication-token-expiration";

/// Metadata of a received response.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    status: StatusCode,
    headers: HeaderMap,
    links: PaginationLinks,
    category: RateLimitCategory,
    rate_limit: Option<RateLimitRecord>,
    request_id: Option<String>,
    token_expiration: Option<DateTime<Utc>>,
}

impl ResponseMeta {
    /// Derives the metadata from a status line and headers. `path` is the
    /// request path relative to the API root, used to infer the rate limit
    /// category when the response does not name one.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, path: &str) -> Self {
        let links = PaginationLinks::from_headers(&headers);
        let category = category_for(&headers, path);
        let rate_limit = RateLimitRecord::from_headers(&headers);
        let request_id = headers
            .get(HEADER_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let token_expiration = headers
            .get(HEADER_TOKEN_EXPIRATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_token_expiration);

        Self {
            status,
            headers,
            links,
            category,
            rate_limit,
            request_id,
            token_expiration,
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Pagination cursors from the `Link` header.
    pub fn links(&self) -> &PaginationLinks {
        &self.links
    }

    /// Rate limit category the request was counted against.
    pub fn category(&self) -> &RateLimitCategory {
        &self.category
    }

    /// Rate limit record carried by this response.
    pub fn rate_limit(&self) -> Option<&RateLimitRecord> {
        self.rate_limit.as_ref()
    }

    /// GitHub request id.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// When the token used for the request expires, if the server said.
    pub fn token_expiration(&self) -> Option<DateTime<Utc>> {
        self.token_expiration
    }
}

/// GitHub sends `2024-05-01 12:00:00 UTC` or `2024-05-01 12:00:00 +0000`.
fn parse_token_expiration(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value.trim_end_matches("UTC").trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A decoded response.
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// Response metadata.
    pub meta: ResponseMeta,
    /// Decoded body; `None` when the body was empty (204, or a 202 with no
    /// body or `{}` while GitHub is still computing).
    pub data: Option<T>,
}

impl<T> Response<T> {
    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.meta.status
    }

    /// Borrows the decoded body.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Takes the decoded body.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Takes the decoded body, failing if the response had none.
    pub fn require(self) -> GitHubResult<T> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(GitHubError::decode("Expected a response body, got none")
                .with_response(self.meta)),
        }
    }

    /// Maps the decoded body.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            meta: self.meta,
            data: self.data.map(f),
        }
    }
}

/// GitHub API client.
///
/// Cheap to clone; clones share the transport, tracker and metrics.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    authenticator: Option<Arc<dyn Authenticator>>,
    tracker: Arc<RateLimitTracker>,
    metrics: Arc<Metrics>,
    defaults: Arc<RequestDefaults>,
    config: Arc<GitHubConfig>,
    guard: Option<RateLimitGuard>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.defaults.base_url().as_str())
            .field("authenticated", &self.authenticator.is_some())
            .field("preemptive_throttling", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Creates a new GitHub client using the reqwest transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        GitHubClientBuilder::new().config(config).build()
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        self.defaults.base_url().as_str()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Gets the request metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Gets the rate limit tracker.
    pub fn rate_limit_tracker(&self) -> &Arc<RateLimitTracker> {
        &self.tracker
    }

    // Service accessors

    /// Gets the repositories service.
    pub fn repositories(&self) -> RepositoriesService<'_> {
        RepositoriesService::new(self)
    }

    /// Gets the users service.
    pub fn users(&self) -> UsersService<'_> {
        UsersService::new(self)
    }

    /// Gets the search service.
    pub fn search(&self) -> SearchService<'_> {
        SearchService::new(self)
    }

    /// Gets the Copilot service.
    pub fn copilot(&self) -> CopilotService<'_> {
        CopilotService::new(self)
    }

    /// Gets the rate limit service.
    pub fn rate_limit(&self) -> RateLimitService<'_> {
        RateLimitService::new(self)
    }

    // Request pipeline

    /// Starts a request bound to this client's defaults.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        RequestBuilder::new(self.defaults.clone(), method, path)
    }

    /// Sends a request and decodes the body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> GitHubResult<Response<T>> {
        let (meta, data) = self.dispatch(request, None, decode_body::<T>).await?;
        Ok(Response { meta, data })
    }

    /// Like [`execute`](Self::execute), but gives up with a `Cancelled`
    /// error as soon as `token` fires.
    pub async fn execute_with_cancel<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        token: &CancellationToken,
    ) -> GitHubResult<Response<T>> {
        let (meta, data) = self.dispatch(request, Some(token), decode_body::<T>).await?;
        Ok(Response { meta, data })
    }

    /// Sends a request and decodes the body into `target`. The target is
    /// left untouched when the body is empty.
    pub async fn execute_into<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        target: &mut T,
    ) -> GitHubResult<ResponseMeta> {
        let (meta, data) = self.dispatch(request, None, decode_body::<T>).await?;
        if let Some(data) = data {
            *target = data;
        }
        Ok(meta)
    }

    /// Sends a request and ignores the body.
    pub async fn execute_empty(&self, request: HttpRequest) -> GitHubResult<ResponseMeta> {
        let (meta, ()) = self.dispatch(request, None, |_, _| Ok(())).await?;
        Ok(meta)
    }

    async fn dispatch<R>(
        &self,
        mut request: HttpRequest,
        cancel: Option<&CancellationToken>,
        decode: impl FnOnce(&ResponseMeta, &Bytes) -> GitHubResult<R>,
    ) -> GitHubResult<(ResponseMeta, R)> {
        let method = request.method.clone();
        let url = request.url.clone();
        let path = url
            .path()
            .strip_prefix(self.defaults.base_url().path())
            .unwrap_or(url.path())
            .to_string();
        let tag = |error: GitHubError| error.with_request(method.clone(), url.as_str());

        if let Some(ref guard) = self.guard {
            guard.check(&RateLimitCategory::for_path(&path)).map_err(tag)?;
        }
        if let Some(ref authenticator) = self.authenticator {
            authenticator.authenticate(&mut request).await.map_err(tag)?;
        }

        let timer = RequestTimer::new(self.metrics.clone());
        TracingHooks::on_request_start(&method, &url, &request.headers);

        let sent = self.transport.send(request);
        let received = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Cancelled),
                received = sent => received,
            },
            None => sent.await,
        };

        let response = match received {
            Ok(response) => response,
            Err(e) => {
                let error = tag(GitHubError::from(e));
                let elapsed = timer.failure(&error);
                TracingHooks::on_request_error(&method, &url, &error, elapsed);
                return Err(error);
            }
        };

        let meta = ResponseMeta::from_parts(response.status, response.headers, &path);
        if let Some(record) = meta.rate_limit {
            self.tracker.observe(meta.category.clone(), record);
            TracingHooks::on_rate_limit_update(&meta.category, &record);
        }

        let outcome = classify::classify(meta, &response.body)
            .map_err(|error| self.note_throttling(error))
            .and_then(|meta| {
                let decoded = decode(&meta, &response.body)?;
                Ok((meta, decoded))
            })
            .map_err(tag);

        match outcome {
            Ok((meta, decoded)) => {
                let elapsed = timer.success();
                TracingHooks::on_request_complete(&method, &url, meta.status.as_u16(), elapsed);
                Ok((meta, decoded))
            }
            Err(error) => {
                let elapsed = timer.failure(&error);
                TracingHooks::on_request_error(&method, &url, &error, elapsed);
                Err(error)
            }
        }
    }

    fn note_throttling(&self, error: GitHubError) -> GitHubError {
        match error.kind() {
            crate::errors::GitHubErrorKind::AbuseDetected => {
                if let Some(wait) = error.retry_after() {
                    if let Ok(wait) = chrono::Duration::from_std(wait) {
                        let until = Utc::now() + wait;
                        self.tracker.note_secondary_limit(until);
                        TracingHooks::on_secondary_limit(until);
                    }
                }
            }
            crate::errors::GitHubErrorKind::RateLimited => {
                if let (Some(record), Some(meta)) = (error.rate_limit(), error.response()) {
                    TracingHooks::on_rate_limit_exceeded(meta.category(), record);
                }
            }
            _ => {}
        }
        error
    }

    // HTTP methods

    /// Makes a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<Response<T>> {
        let request = self.request(Method::GET, path).build()?;
        self.execute(request).await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_params<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        params: &Q,
    ) -> GitHubResult<Response<T>> {
        let request = self.request(Method::GET, path).query(params).build()?;
        self.execute(request).await
    }

    /// Makes a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<Response<T>> {
        let request = self.request(Method::POST, path).json(body).build()?;
        self.execute(request).await
    }

    /// Makes a PUT request.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<Response<T>> {
        let request = self.request(Method::PUT, path).json(body).build()?;
        self.execute(request).await
    }

    /// Makes a PUT request without a body.
    pub async fn put_empty(&self, path: &str) -> GitHubResult<ResponseMeta> {
        let request = self.request(Method::PUT, path).build()?;
        self.execute_empty(request).await
    }

    /// Makes a PATCH request.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<Response<T>> {
        let request = self.request(Method::PATCH, path).json(body).build()?;
        self.execute(request).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, path: &str) -> GitHubResult<ResponseMeta> {
        let request = self.request(Method::DELETE, path).build()?;
        self.execute_empty(request).await
    }

    /// Makes a DELETE request with a JSON body.
    pub async fn delete_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<Response<T>> {
        let request = self.request(Method::DELETE, path).json(body).build()?;
        self.execute(request).await
    }

    /// Calls a boolean endpoint: 2xx is `true`, 404 is `false`.
    pub async fn check(&self, path: &str) -> GitHubResult<bool> {
        let request = self.request(Method::GET, path).build()?;
        match self.execute_empty(request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // Pagination

    /// Fetches one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(&self, request: HttpRequest) -> GitHubResult<Page<T>> {
        let response = self.execute::<Vec<T>>(request).await?;
        let links = response.meta.links.clone();
        let current = links
            .prev_page()
            .map(|prev| prev + 1)
            .or_else(|| links.next_page().map(|next| next.saturating_sub(1)));

        let mut page = Page::new(response.data.unwrap_or_default(), links);
        if let Some(current) = current {
            page = page.with_page(current);
        }
        Ok(page)
    }

    /// Iterates the pages of a list endpoint, following `rel="next"`
    /// cursors merged into `options`.
    pub fn pages<T, Q>(
        &self,
        path: &str,
        options: &Q,
    ) -> GitHubResult<
        PageIterator<T, impl Fn(Option<String>) -> BoxFuture<'static, GitHubResult<Page<T>>>>,
    >
    where
        T: DeserializeOwned + Send + 'static,
        Q: Serialize + ?Sized,
    {
        let base = encode_query(options)?;
        let client = self.clone();
        let path = path.to_string();

        Ok(PageIterator::new(move |cursor: Option<String>| {
            let client = client.clone();
            let path = path.clone();
            let query = match cursor {
                Some(url) => merge_cursor(&url, &base),
                None => Ok(base.clone()),
            };
            async move {
                let request = client.request(Method::GET, &path).query(&query?).build()?;
                client.get_page(request).await
            }
            .boxed()
        }))
    }

    /// Fetches every item of a list endpoint.
    pub async fn list_all<T, Q>(&self, path: &str, options: &Q) -> GitHubResult<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
        Q: Serialize + ?Sized,
    {
        self.pages(path, options)?.collect_all().await
    }
}

/// Empty bodies decode to `None`, as does the `{}` placeholder GitHub sends
/// with a 202 while a result is still being computed. Anything else must be
/// valid JSON for `T`.
fn decode_body<T: DeserializeOwned>(meta: &ResponseMeta, body: &Bytes) -> GitHubResult<Option<T>> {
    if meta.status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if meta.status == StatusCode::ACCEPTED && is_empty_object(body) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        GitHubError::decode(format!("Failed to decode response body: {}", e))
            .with_body(String::from_utf8_lossy(body))
            .with_response(meta.clone())
            .with_cause(e)
    })
}

fn is_empty_object(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(body)
        .map(|map| map.is_empty())
        .unwrap_or(false)
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
    config: Option<GitHubConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    tracker: Option<Arc<RateLimitTracker>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: GitHubConfig::builder(),
            config: None,
            transport: None,
            authenticator: None,
            tracker: None,
        }
    }

    /// Uses a complete configuration, ignoring the individual setters.
    pub fn config(mut self, config: GitHubConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Sets a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Sends requests through `transport` instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attaches credentials with `authenticator` instead of the configured
    /// auth method.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Shares an existing rate limit tracker.
    pub fn rate_limit_tracker(mut self, tracker: Arc<RateLimitTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => self.config_builder.build()?,
        };

        let defaults = Arc::new(RequestDefaults::from_config(&config)?);
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };
        let authenticator = self.authenticator.or_else(|| {
            config
                .auth
                .clone()
                .map(|method| Arc::new(AuthManager::new(method)) as Arc<dyn Authenticator>)
        });
        let tracker = self
            .tracker
            .unwrap_or_else(|| Arc::new(RateLimitTracker::new(config.rate_limit.buffer_percentage)));
        let guard = config
            .rate_limit
            .preemptive_throttling
            .then(|| RateLimitGuard::new(tracker.clone()));

        Ok(GitHubClient {
            transport,
            authenticator,
            tracker,
            metrics: Arc::new(Metrics::new()),
            defaults,
            config: Arc::new(config),
            guard,
        })
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
