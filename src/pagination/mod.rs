//! Pagination handling for GitHub API.
//!
//! GitHub paginates through the `Link` response header. Each relation
//! (`first`, `prev`, `next`, `last`) is a full URL whose query string carries
//! either a page number or an opaque cursor. [`merge_cursor`] turns such a
//! URL back into options for the next request.

use crate::errors::{GitHubError, GitHubResult};
use crate::request::{encode_query, QueryParams};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, LINK};
use serde::Serialize;
use url::Url;

/// Query keys that identify a position in a listing.
pub const CURSOR_KEYS: &[&str] = &["page", "after", "before", "cursor", "since"];

/// Pagination links parsed from Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses pagination links from the Link header (RFC 8288).
    ///
    /// Unknown relations and malformed entries are ignored.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for entry in split_entries(header_value) {
            let mut url = None;
            let mut rels = Vec::new();

            for segment in entry.split(';') {
                let segment = segment.trim();
                if segment.starts_with('<') && segment.ends_with('>') {
                    url = Some(segment[1..segment.len() - 1].to_string());
                } else if let Some((name, value)) = segment.split_once('=') {
                    if name.trim().eq_ignore_ascii_case("rel") {
                        // A single entry may carry several space-separated relations.
                        rels.extend(
                            value
                                .trim()
                                .trim_matches('"')
                                .split_whitespace()
                                .map(str::to_ascii_lowercase),
                        );
                    }
                }
            }

            let Some(url) = url else { continue };
            for rel in rels {
                match rel.as_str() {
                    "next" => links.next = Some(url.clone()),
                    "prev" => links.prev = Some(url.clone()),
                    "first" => links.first = Some(url.clone()),
                    "last" => links.last = Some(url.clone()),
                    _ => {}
                }
            }
        }

        links
    }

    /// Parses pagination links from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Returns true if there is a previous page.
    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }

    /// Returns true if no relation was present.
    pub fn is_empty(&self) -> bool {
        self.next.is_none() && self.prev.is_none() && self.first.is_none() && self.last.is_none()
    }

    /// Page number of the next page.
    pub fn next_page(&self) -> Option<u32> {
        self.next.as_deref().and_then(page_number)
    }

    /// Page number of the previous page.
    pub fn prev_page(&self) -> Option<u32> {
        self.prev.as_deref().and_then(page_number)
    }

    /// Page number of the first page.
    pub fn first_page(&self) -> Option<u32> {
        self.first.as_deref().and_then(page_number)
    }

    /// Page number of the last page.
    pub fn last_page(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_number)
    }

    /// Gets the total page count from the last link.
    pub fn total_pages(&self) -> Option<u32> {
        self.last_page()
    }

    /// Opaque token for the next page: a non-numeric `page` or `since` value.
    pub fn next_page_token(&self) -> Option<String> {
        let url = self.next.as_deref()?;
        query_value(url, "page")
            .or_else(|| query_value(url, "since"))
            .filter(|value| value.parse::<u32>().is_err())
    }

    /// Cursor for the next page (`after` or `cursor`).
    pub fn next_cursor(&self) -> Option<String> {
        let url = self.next.as_deref()?;
        query_value(url, "after").or_else(|| query_value(url, "cursor"))
    }

    /// Cursor for the previous page (`before` or `cursor`).
    pub fn prev_cursor(&self) -> Option<String> {
        let url = self.prev.as_deref()?;
        query_value(url, "before").or_else(|| query_value(url, "cursor"))
    }
}

/// Splits a Link header on the commas that separate entries, ignoring
/// commas inside `<...>`.
fn split_entries(header: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&header[start..]);
    entries.into_iter().filter(|e| !e.trim().is_empty()).collect()
}

fn query_value(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Extracts the numeric `page` parameter (or `since`, for listings that page
/// by id) from a URL.
pub fn page_number(url: &str) -> Option<u32> {
    query_value(url, "page")
        .or_else(|| query_value(url, "since"))
        .and_then(|v| v.parse().ok())
}

/// Builds the options for the request a cursor URL points at.
///
/// Cursor keys (`page`, `after`, `before`, `cursor`, `since`) are taken from
/// the cursor only; a cursor key the caller set but the cursor lacks is
/// dropped. Every other key keeps the caller's value, and keys present only
/// in the cursor are carried over.
pub fn merge_cursor<Q: Serialize + ?Sized>(cursor_url: &str, current: &Q) -> GitHubResult<QueryParams> {
    let cursor = Url::parse(cursor_url).map_err(|e| {
        GitHubError::invalid_path(format!("Invalid pagination cursor {:?}: {}", cursor_url, e))
            .with_cause(e)
    })?;
    let cursor = QueryParams::from_url(&cursor);

    let mut merged = encode_query(current)?;
    for key in CURSOR_KEYS {
        merged.remove(key);
    }
    for key in cursor.keys() {
        if CURSOR_KEYS.contains(&key) || !merged.contains_key(key) {
            merged.set_all(key, cursor.get_all(key).to_vec());
        }
    }
    Ok(merged)
}

/// A single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Pagination links.
    pub links: PaginationLinks,
    /// Current page number (if known).
    pub page: Option<u32>,
    /// Total count (if provided by API).
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, links: PaginationLinks) -> Self {
        Self {
            items,
            links,
            page: None,
            total_count: None,
        }
    }

    /// Sets the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets total count.
    pub fn with_total_count(mut self, count: u64) -> Self {
        self.total_count = Some(count);
        self
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.links.has_next()
    }

    /// Returns the URL for the next page.
    pub fn next_url(&self) -> Option<&str> {
        self.links.next.as_deref()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Maps the items in this page.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            links: self.links,
            page: self.page,
            total_count: self.total_count,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Page-number options accepted by most list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationParams {
    /// Page number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets items per page.
    pub fn per_page(mut self, per_page: u32) -> Self {
        // GitHub API limits to 100
        self.per_page = Some(per_page.min(100));
        self
    }
}

/// Cursor options accepted by cursor-paginated endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CursorParams {
    /// Return results after this cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Return results before this cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Opaque cursor used by a few endpoints instead of `after`/`before`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// Async iterator for paginating through all results.
pub struct PageIterator<T, F>
where
    F: Fn(Option<String>) -> BoxFuture<'static, GitHubResult<Page<T>>>,
{
    /// Function to fetch a page, given the cursor URL (`None` for the first).
    fetch_fn: F,
    next_url: Option<String>,
    exhausted: bool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> PageIterator<T, F>
where
    F: Fn(Option<String>) -> BoxFuture<'static, GitHubResult<Page<T>>>,
{
    /// Creates a new page iterator.
    pub fn new(fetch_fn: F) -> Self {
        Self {
            fetch_fn,
            next_url: None,
            exhausted: false,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Creates a page iterator starting from a URL.
    pub fn from_url(fetch_fn: F, start_url: String) -> Self {
        Self {
            fetch_fn,
            next_url: Some(start_url),
            exhausted: false,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Fetches the next page.
    pub async fn next_page(&mut self) -> GitHubResult<Option<Page<T>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match (self.fetch_fn)(self.next_url.take()).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if page.has_next() {
            self.next_url = page.links.next.clone();
        } else {
            self.exhausted = true;
        }

        Ok(Some(page))
    }

    /// Collects all items from all pages.
    pub async fn collect_all(mut self) -> GitHubResult<Vec<T>> {
        let mut all_items = Vec::new();

        while let Some(page) = self.next_page().await? {
            all_items.extend(page.into_items());
        }

        Ok(all_items)
    }

    /// Returns true if there are more pages.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GitHubErrorKind;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_link_header() {
        let header = r#"<https://api.github.com/repos?page=2>; rel="next", <https://api.github.com/repos?page=5>; rel="last""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.next, Some("https://api.github.com/repos?page=2".to_string()));
        assert_eq!(links.last, Some("https://api.github.com/repos?page=5".to_string()));
        assert!(links.prev.is_none());
        assert!(links.first.is_none());
    }

    #[test]
    fn test_next_and_prev_pages() {
        let header = r#"<https://api.example/x?page=2>; rel="next", <https://api.example/x?page=1>; rel="prev""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.next_page(), Some(2));
        assert_eq!(links.prev_page(), Some(1));
        assert!(links.first.is_none());
        assert!(links.last.is_none());
    }

    #[test]
    fn test_missing_header_yields_no_links() {
        let links = PaginationLinks::from_headers(&HeaderMap::new());
        assert!(links.is_empty());
        assert_eq!(links.next_page(), None);
        assert_eq!(links.next_cursor(), None);
    }

    #[test]
    fn test_unknown_relations_ignored() {
        let header = r#"<https://api.github.com/x?page=3>; rel="canonical", <https://api.github.com/x?page=4>; rel="next""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.next_page(), Some(4));
        assert!(links.prev.is_none() && links.first.is_none() && links.last.is_none());
    }

    #[test]
    fn test_relaxed_rel_parameter() {
        let header = r#"<https://api.github.com/x?page=2>; rel = "next", <https://api.github.com/x?page=9>;REL="Last""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.next_page(), Some(2));
        assert_eq!(links.last_page(), Some(9));
    }

    #[test]
    fn test_unencoded_comma_inside_url() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                r#"<https://api.github.com/user/repos?affiliation=owner,member&page=2>; rel="next""#,
            ),
        );
        let links = PaginationLinks::from_headers(&headers);
        assert_eq!(links.next_page(), Some(2));
    }

    #[test]
    fn test_cursors() {
        let header = r#"<https://api.github.com/orgs/o/audit-log?after=MTYw&per_page=30>; rel="next", <https://api.github.com/orgs/o/audit-log?before=MTUw&per_page=30>; rel="prev""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.next_cursor().as_deref(), Some("MTYw"));
        assert_eq!(links.prev_cursor().as_deref(), Some("MTUw"));
        assert_eq!(links.next_page(), None);
    }

    #[test]
    fn test_since_paging() {
        let links = PaginationLinks::from_header(r#"<https://api.github.com/users?since=46>; rel="next""#);
        assert_eq!(links.next_page(), Some(46));

        let links = PaginationLinks::from_header(r#"<https://api.github.com/events?page=abc>; rel="next""#);
        assert_eq!(links.next_page_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_total_pages() {
        let header = r#"<https://api.github.com/repos?page=2>; rel="next", <https://api.github.com/repos?page=10>; rel="last""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links.total_pages(), Some(10));
    }

    #[test]
    fn test_merge_cursor_keeps_caller_options() {
        #[derive(Serialize)]
        struct Options {
            per_page: u32,
            state: &'static str,
            page: u32,
        }

        let merged = merge_cursor(
            "https://api.github.com/repos/o/r/issues?per_page=100&state=closed&page=3&sort=created",
            &Options {
                per_page: 50,
                state: "open",
                page: 1,
            },
        )
        .unwrap();

        assert_eq!(merged.get("page"), Some("3"));
        assert_eq!(merged.get("per_page"), Some("50"));
        assert_eq!(merged.get("state"), Some("open"));
        assert_eq!(merged.get("sort"), Some("created"));
    }

    #[test]
    fn test_merge_cursor_replaces_position() {
        let current = CursorParams {
            before: Some("old".to_string()),
            per_page: Some(10),
            ..Default::default()
        };

        let merged = merge_cursor("https://api.github.com/x?after=next-token", &current).unwrap();

        assert_eq!(merged.get("after"), Some("next-token"));
        assert!(!merged.contains_key("before"));
        assert_eq!(merged.get("per_page"), Some("10"));
    }

    #[test]
    fn test_merge_cursor_rejects_relative_url() {
        let err = merge_cursor("repos?page=2", &PaginationParams::new()).unwrap_err();
        assert_eq!(err.kind(), GitHubErrorKind::InvalidPath);
    }

    #[test]
    fn test_per_page_limit() {
        let params = PaginationParams::new().per_page(200);
        assert_eq!(params.per_page, Some(100));
    }

    #[test]
    fn test_page_operations() {
        let page: Page<i32> = Page::new(vec![1, 2, 3], PaginationLinks::default())
            .with_page(1)
            .with_total_count(100);

        assert_eq!(page.len(), 3);
        assert!(!page.is_empty());
        assert!(!page.has_next());
        assert_eq!(page.page, Some(1));
        assert_eq!(page.total_count, Some(100));
    }

    #[tokio::test]
    async fn test_page_iterator_follows_next() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let iter = PageIterator::new(move |cursor: Option<String>| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let links = match (n, cursor) {
                    (0, None) => PaginationLinks::from_header(
                        r#"<https://api.github.com/x?page=2>; rel="next""#,
                    ),
                    (1, Some(url)) if page_number(&url) == Some(2) => PaginationLinks::default(),
                    other => panic!("unexpected fetch {:?}", other),
                };
                Ok::<_, crate::errors::GitHubError>(Page::new(vec![n], links))
            }
            .boxed()
        });

        let items = iter.collect_all().await.unwrap();
        assert_eq!(items, vec![0, 1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
