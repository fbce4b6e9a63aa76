//! Error types for the GitHub client.

use crate::client::ResponseMeta;
use crate::rate_limit::RateLimitRecord;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Error kinds for categorizing GitHub errors.
///
/// The kinds fall into three groups: the request was never sent
/// (configuration, authentication, path or encoding problems), the request
/// never produced a response (transport kinds), or a response arrived and
/// was rejected or could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubErrorKind {
    // Configuration errors
    /// Invalid configuration.
    InvalidConfiguration,
    /// Invalid base URL.
    InvalidBaseUrl,

    // Request construction errors
    /// Credentials could not be attached to the request.
    Authentication,
    /// The relative path could not be resolved against the base URL.
    InvalidPath,
    /// The query options or body could not be serialized.
    Encode,

    // Transport errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,
    /// The call was cancelled before a response arrived.
    Cancelled,
    /// Any other transport failure.
    Transport,

    // Response errors
    /// The body of a successful response did not match the decode target.
    Decode,
    /// A 4xx response carrying per-field validation errors.
    Validation,
    /// Primary rate limit exhausted.
    RateLimited,
    /// Secondary rate limit / abuse detection triggered.
    AbuseDetected,
    /// 5xx response without a structured error body.
    Server,
    /// Any other non-2xx response.
    Api,
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::InvalidBaseUrl => write!(f, "invalid_base_url"),
            Self::Authentication => write!(f, "authentication"),
            Self::InvalidPath => write!(f, "invalid_path"),
            Self::Encode => write!(f, "encode_error"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Transport => write!(f, "transport_error"),
            Self::Decode => write!(f, "decode_error"),
            Self::Validation => write!(f, "validation_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::AbuseDetected => write!(f, "abuse_detected"),
            Self::Server => write!(f, "server_error"),
            Self::Api => write!(f, "api_error"),
        }
    }
}

/// Failure reported by an [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The request was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
    /// Any other HTTP-level failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// One entry of the `errors` array in a GitHub error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    /// Resource the error refers to.
    #[serde(default)]
    pub resource: Option<String>,
    /// Field the error refers to.
    #[serde(default)]
    pub field: Option<String>,
    /// Validation code (`missing`, `invalid`, `already_exists`, `custom`...).
    #[serde(default)]
    pub code: Option<String>,
    /// Free-form message, used with the `custom` code.
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error caused by {} field on {} resource",
            self.code.as_deref().unwrap_or("unknown"),
            self.field.as_deref().unwrap_or("unknown"),
            self.resource.as_deref().unwrap_or("unknown"),
        )?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Method and URL of the request that produced an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
}

/// GitHub API error with detailed information.
#[derive(Error, Debug)]
pub struct GitHubError {
    /// Error kind.
    kind: GitHubErrorKind,
    /// Error message.
    message: String,
    /// HTTP status code.
    status_code: Option<u16>,
    /// GitHub request ID.
    request_id: Option<String>,
    /// Documentation URL.
    documentation_url: Option<String>,
    /// Per-field validation errors.
    errors: Vec<FieldError>,
    /// Raw response body.
    body: Option<String>,
    /// Rate limit record (if applicable).
    rate_limit: Option<RateLimitRecord>,
    /// Server-provided or computed wait before retrying.
    retry_after: Option<Duration>,
    /// The request that failed.
    request: Option<RequestSummary>,
    /// Metadata of the response, absent when none was received.
    response: Option<Box<ResponseMeta>>,
    /// Underlying cause.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref request) = self.request {
            write!(f, " {} {}", request.method, request.url)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl GitHubError {
    /// Creates a new GitHub error.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            documentation_url: None,
            errors: Vec::new(),
            body: None,
            rate_limit: None,
            retry_after: None,
            request: None,
            response: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the GitHub request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Sets the per-field validation errors.
    pub fn with_field_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    /// Sets the raw response body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the rate limit record.
    pub fn with_rate_limit(mut self, record: RateLimitRecord) -> Self {
        self.rate_limit = Some(record);
        self
    }

    /// Sets the retry-after hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Records the request that failed.
    pub fn with_request(mut self, method: Method, url: impl Into<String>) -> Self {
        self.request = Some(RequestSummary {
            method,
            url: url.into(),
        });
        self
    }

    /// Attaches the response metadata. Also fills in status and request id.
    pub fn with_response(mut self, meta: ResponseMeta) -> Self {
        self.status_code = Some(meta.status().as_u16());
        if self.request_id.is_none() {
            self.request_id = meta.request_id().map(String::from);
        }
        self.response = Some(Box::new(meta));
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> GitHubErrorKind {
        self.kind
    }

    /// Gets the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Gets the per-field validation errors.
    pub fn field_errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Gets the raw response body.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Gets the rate limit record.
    pub fn rate_limit(&self) -> Option<&RateLimitRecord> {
        self.rate_limit.as_ref()
    }

    /// Gets the failed request.
    pub fn request(&self) -> Option<&RequestSummary> {
        self.request.as_ref()
    }

    /// Gets the response metadata.
    ///
    /// `None` means no response was ever received: the request failed to
    /// build, was rejected before sending, or the transport failed.
    pub fn response(&self) -> Option<&ResponseMeta> {
        self.response.as_deref()
    }

    /// Returns how long to wait before retrying, if known.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after.or_else(|| {
            let record = self.rate_limit.as_ref()?;
            if record.remaining > 0 {
                return None;
            }
            (record.reset - Utc::now()).to_std().ok()
        })
    }

    /// Returns true if no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            GitHubErrorKind::ConnectionFailed
                | GitHubErrorKind::Timeout
                | GitHubErrorKind::Cancelled
                | GitHubErrorKind::Transport
        )
    }

    /// Returns true for primary and secondary rate limit errors.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self.kind,
            GitHubErrorKind::RateLimited | GitHubErrorKind::AbuseDetected
        )
    }

    /// Returns true if the response was a 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            GitHubErrorKind::RateLimited
            | GitHubErrorKind::AbuseDetected
            | GitHubErrorKind::ConnectionFailed
            | GitHubErrorKind::Timeout
            | GitHubErrorKind::Transport
            | GitHubErrorKind::Server => true,
            GitHubErrorKind::Api => matches!(self.status_code, Some(502..=504)),
            _ => false,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Authentication, message)
    }

    /// Creates an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidPath, message)
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Encode, message)
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Decode, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Timeout, message)
    }
}

impl From<TransportError> for GitHubError {
    fn from(e: TransportError) -> Self {
        let kind = match e {
            TransportError::Connect(_) => GitHubErrorKind::ConnectionFailed,
            TransportError::Timeout(_) => GitHubErrorKind::Timeout,
            TransportError::Cancelled => GitHubErrorKind::Cancelled,
            TransportError::Body(_) | TransportError::Http(_) => GitHubErrorKind::Transport,
        };
        GitHubError::new(kind, e.to_string()).with_cause(e)
    }
}
