//! Request construction.
//!
//! A [`RequestBuilder`] turns a relative path, an optional options struct
//! and an optional JSON body into a fully-formed [`HttpRequest`] with the
//! headers every GitHub call carries. Nothing here performs I/O.

use crate::config::GitHubConfig;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::transport::HttpRequest;
use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Method;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Header carrying the REST API version.
pub const HEADER_API_VERSION: &str = "x-github-api-version";

/// Media type that adds `text_matches` to search results.
pub const MEDIA_TYPE_TEXT_MATCH: &str = "application/vnd.github.text-match+json";

/// Per-client values applied to every request.
#[derive(Debug, Clone)]
pub struct RequestDefaults {
    base_url: Url,
    accept: HeaderValue,
    user_agent: HeaderValue,
    api_version: HeaderValue,
}

impl RequestDefaults {
    /// Derives the defaults from a validated configuration.
    pub fn from_config(config: &GitHubConfig) -> GitHubResult<Self> {
        Ok(Self {
            base_url: config.parsed_base_url()?,
            accept: config_header("media type", &config.media_type)?,
            user_agent: config_header("User-Agent", &config.user_agent)?,
            api_version: config_header("API version", &config.api_version)?,
        })
    }

    /// Base URL every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn config_header(what: &str, value: &str) -> GitHubResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        GitHubError::configuration(format!("Invalid {} {:?}: {}", what, value, e)).with_cause(e)
    })
}

/// Builder for a single API request.
///
/// Encoding errors are held until [`build`](Self::build) so that calls can
/// be chained without intermediate `?`.
#[derive(Debug)]
pub struct RequestBuilder {
    defaults: Arc<RequestDefaults>,
    method: Method,
    path: String,
    query: QueryParams,
    body: Option<Bytes>,
    media_type: Option<String>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    error: Option<GitHubError>,
}

impl RequestBuilder {
    /// Starts a request for `path`, relative to the base URL.
    pub fn new(defaults: Arc<RequestDefaults>, method: Method, path: impl Into<String>) -> Self {
        Self {
            defaults,
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            media_type: None,
            headers: HeaderMap::new(),
            timeout: None,
            error: None,
        }
    }

    /// Adds query parameters from an options value.
    ///
    /// Keys set here replace keys of the same name already present in the
    /// path. Calling this more than once merges in order.
    pub fn query<Q: Serialize + ?Sized>(mut self, options: &Q) -> Self {
        match encode_query(options) {
            Ok(params) => self.query.overlay(params),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(
                GitHubError::encode(format!("Failed to serialize request body: {}", e))
                    .with_cause(e),
            ),
        }
        self
    }

    /// Overrides the `Accept` media type for this request.
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Adds an extra header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a timeout for this request only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn fail(&mut self, error: GitHubError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Resolves the URL, applies headers and returns the request.
    pub fn build(self) -> GitHubResult<HttpRequest> {
        if let Some(error) = self.error {
            return Err(error.with_request(self.method, self.path));
        }

        let mut url = resolve_path(&self.defaults.base_url, &self.path)?;

        let mut query = QueryParams::from_url(&url);
        query.overlay(self.query);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query.to_query_string()?));
        }

        let mut request = HttpRequest::new(self.method, url);

        let accept = match self.media_type {
            Some(media_type) => HeaderValue::from_str(&media_type).map_err(|e| {
                GitHubError::encode(format!("Invalid media type {:?}: {}", media_type, e))
                    .with_cause(e)
            })?,
            None => self.defaults.accept.clone(),
        };
        request.headers.insert(ACCEPT, accept);
        request
            .headers
            .insert(USER_AGENT, self.defaults.user_agent.clone());
        request.headers.insert(
            HeaderName::from_static(HEADER_API_VERSION),
            self.defaults.api_version.clone(),
        );
        if self.body.is_some() {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        request.headers.extend(self.headers);

        request.body = self.body;
        request.timeout = self.timeout;
        Ok(request)
    }
}

/// Joins a relative path onto the base URL.
///
/// A leading `/` is ignored so that enterprise prefixes such as `/api/v3/`
/// survive the join. Absolute URLs and paths that escape the base are
/// rejected.
pub fn resolve_path(base: &Url, path: &str) -> GitHubResult<Url> {
    let invalid = |reason: &str| {
        GitHubError::invalid_path(format!("Invalid request path {:?}: {}", path, reason))
    };

    if Url::parse(path).is_ok() {
        return Err(invalid("expected a path relative to the base URL"));
    }

    let relative = path.trim_start_matches('/');
    let url = base
        .join(relative)
        .map_err(|e| invalid(&e.to_string()))?;

    if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
        return Err(invalid("path escapes the base URL"));
    }
    Ok(url)
}

/// Query parameters sorted by key, possibly with repeated keys. Values of a
/// repeated key keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    /// Creates empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the query string of `url`.
    pub fn from_url(url: &Url) -> Self {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Replaces every value of `key` with `values`.
    pub fn set_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    /// Adds a value to `key`, keeping existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the distinct keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Applies `other` on top of `self`; keys in `other` replace keys here.
    pub fn overlay(&mut self, other: QueryParams) {
        for (key, values) in other.0 {
            self.0.insert(key, values);
        }
    }

    /// Encodes as `application/x-www-form-urlencoded`.
    pub fn to_query_string(&self) -> GitHubResult<String> {
        let pairs: Vec<(&str, &str)> = self.pairs().collect();
        serde_urlencoded::to_string(pairs).map_err(|e| {
            GitHubError::encode(format!("Failed to encode query string: {}", e)).with_cause(e)
        })
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, values) in &self.0 {
            match values.as_slice() {
                [single] => map.serialize_entry(key, single)?,
                many => map.serialize_entry(key, &Repeated(many))?,
            }
        }
        map.end()
    }
}

struct Repeated<'a>(&'a [String]);

impl Serialize for Repeated<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// Serializes a list as one comma-joined value.
///
/// Use with `#[serde(serialize_with = "crate::request::comma_separated")]`
/// on fields GitHub expects as `key=a,b,c` rather than `key=a&key=b`.
pub fn comma_separated<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: fmt::Display,
{
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    serializer.serialize_str(&joined)
}

/// Flattens an options value into query parameters.
///
/// The value must serialize to a map (or to nothing). `null` fields, empty
/// strings and empty lists are omitted, lists become repeated keys, and
/// nested objects are rejected.
pub fn encode_query<Q: Serialize + ?Sized>(options: &Q) -> GitHubResult<QueryParams> {
    let value = serde_json::to_value(options).map_err(|e| {
        GitHubError::encode(format!("Failed to serialize query options: {}", e)).with_cause(e)
    })?;

    let fields = match value {
        Value::Null => return Ok(QueryParams::new()),
        Value::Object(fields) => fields,
        other => {
            return Err(GitHubError::encode(format!(
                "Query options must serialize to a map, got {}",
                json_type(&other)
            )))
        }
    };

    let mut params = QueryParams::new();
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar(&key, item)? {
                        params.append(key.clone(), s);
                    }
                }
            }
            other => {
                if let Some(s) = scalar(&key, other)? {
                    params.set(key, s);
                }
            }
        }
    }
    Ok(params)
}

fn scalar(key: &str, value: Value) -> GitHubResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(GitHubError::new(
            GitHubErrorKind::Encode,
            format!(
                "Query option {:?} must be a scalar or a list of scalars, got {}",
                key,
                json_type(&other)
            ),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
