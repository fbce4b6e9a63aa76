//! Maps a non-2xx response onto a [`GitHubError`].

use super::ResponseMeta;
use crate::errors::{FieldError, GitHubError, GitHubErrorKind, GitHubResult};
use crate::rate_limit::{HEADER_REMAINING, HEADER_RESET};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    documentation_url: Option<String>,
}

/// Passes 2xx responses through and turns everything else into an error
/// carrying the status, raw body, parsed fields and response metadata.
pub(crate) fn classify(meta: ResponseMeta, body: &[u8]) -> GitHubResult<ResponseMeta> {
    let status = meta.status();
    if status.is_success() {
        return Ok(meta);
    }

    let text = String::from_utf8_lossy(body).into_owned();
    let parsed = serde_json::from_slice::<ErrorBody>(body).ok();

    let (message, field_errors, documentation_url) = match parsed {
        Some(ref parsed) => (
            parsed.message.clone(),
            parsed.errors.iter().map(field_error).collect::<Vec<_>>(),
            parsed.documentation_url.clone(),
        ),
        None => {
            let raw = text.trim();
            let detail = if raw.is_empty() {
                status.canonical_reason().unwrap_or("")
            } else {
                raw
            };
            (format!("HTTP {}: {}", status.as_u16(), detail), Vec::new(), None)
        }
    };

    let headers = meta.headers();
    let throttling_status =
        status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;
    let header_retry_after = retry_after_header(headers);

    let (kind, retry_after) = if throttling_status && remaining(headers) == Some(0) {
        (GitHubErrorKind::RateLimited, reset_wait(headers))
    } else if throttling_status
        && (header_retry_after.is_some()
            || is_secondary_limit(&message, documentation_url.as_deref()))
    {
        (
            GitHubErrorKind::AbuseDetected,
            header_retry_after.or_else(|| reset_wait(headers)),
        )
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        (GitHubErrorKind::RateLimited, reset_wait(headers))
    } else if status.is_client_error() && !field_errors.is_empty() {
        (GitHubErrorKind::Validation, None)
    } else if status.is_server_error() && parsed.is_none() {
        (GitHubErrorKind::Server, None)
    } else {
        (GitHubErrorKind::Api, None)
    };

    let mut error = GitHubError::new(kind, message)
        .with_body(text)
        .with_field_errors(field_errors);
    if let Some(url) = documentation_url {
        error = error.with_documentation_url(url);
    }
    if let Some(record) = meta.rate_limit() {
        error = error.with_rate_limit(*record);
    }
    if let Some(wait) = retry_after {
        error = error.with_retry_after(wait);
    }
    Err(error.with_response(meta))
}

/// GitHub returns either objects or bare strings in the `errors` array.
fn field_error(value: &Value) -> FieldError {
    match value {
        Value::String(message) => FieldError {
            resource: None,
            field: None,
            code: None,
            message: Some(message.clone()),
        },
        other => serde_json::from_value(other.clone()).unwrap_or_else(|_| FieldError {
            resource: None,
            field: None,
            code: None,
            message: Some(other.to_string()),
        }),
    }
}

fn is_secondary_limit(message: &str, documentation_url: Option<&str>) -> bool {
    if let Some(url) = documentation_url {
        if url.ends_with("secondary-rate-limits") || url.contains("abuse-rate-limits") {
            return true;
        }
    }
    let message = message.to_ascii_lowercase();
    message.contains("secondary rate limit") || message.contains("abuse detection")
}

fn remaining(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(HEADER_REMAINING)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Time until `x-ratelimit-reset`, zero if it already passed.
fn reset_wait(headers: &HeaderMap) -> Option<Duration> {
    let reset: i64 = headers
        .get(HEADER_RESET)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())?;
    let reset = DateTime::<Utc>::from_timestamp(reset, 0)?;
    Some((reset - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// `retry-after` as delta seconds, or as an HTTP date.
fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (at.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}
