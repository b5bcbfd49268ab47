//! Pagination for Upwind list endpoints.
//!
//! The API mixes two addressing schemes. Cursor endpoints return a
//! `Link: <...>; rel="next"` header carrying an opaque `page-token`;
//! offset endpoints take `page`/`per-page` and signal the end with a short
//! page. Endpoints that return everything at once use [`PageCursor::Unpaged`].
//! [`next_page`] hides the difference: each call is exactly one request.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::LINK;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::UpwindClient;
use crate::error::{Result, UpwindError};
use crate::executor::RequestDescriptor;

const PAGE_TOKEN_PARAM: &str = "page-token";
const PER_PAGE_PARAM: &str = "per-page";
const PAGE_PARAM: &str = "page";

/// Where the next page request points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Server-issued continuation. `token: None` requests the first page.
    Cursor {
        token: Option<String>,
        per_page: Option<u32>,
    },
    /// 1-indexed page number and page size.
    Offset { page: u32, per_page: u32 },
    /// The endpoint returns the whole collection in one response.
    Unpaged,
}

impl PageCursor {
    /// First page of a cursor-paginated listing.
    pub fn first_cursor(per_page: Option<u32>) -> Self {
        PageCursor::Cursor {
            token: None,
            per_page,
        }
    }

    /// First page of an offset-paginated listing.
    pub fn first_offset(per_page: u32) -> Self {
        PageCursor::Offset { page: 1, per_page }
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items on this page, in server order.
    pub items: Vec<T>,
    /// Cursor for the following page, or `None` when this was the last one.
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, next: Option<PageCursor>) -> Self {
        Self { items, next }
    }

    /// Whether another page follows.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A list endpoint: organization-relative path plus filter parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Entity name used in `NotFound` errors.
    pub entity_type: &'static str,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, entity_type: &'static str) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            entity_type,
        }
    }

    /// Add a single query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add every set field of a query struct as a parameter.
    ///
    /// Field names are used verbatim, so query structs rename to
    /// kebab-case. `None`, empty strings and empty lists are skipped;
    /// lists are comma-joined.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` doesn't serialize to a JSON object.
    pub fn with_query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        self.query.extend(query_pairs(query)?);
        Ok(self)
    }
}

/// Flatten a serializable query struct into `(name, value)` pairs.
///
/// # Errors
///
/// Returns an error if `query` doesn't serialize to a JSON object.
pub fn query_pairs<Q: Serialize + ?Sized>(query: &Q) -> Result<Vec<(String, String)>> {
    let fields = match serde_json::to_value(query)? {
        serde_json::Value::Object(fields) => fields,
        serde_json::Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(UpwindError::Config(
                "query parameters must serialize to an object".to_string(),
            ))
        }
    };

    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let rendered = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::Array(values) => {
                let joined: Vec<String> = values.iter().map(scalar_to_string).collect();
                joined.join(",")
            }
            other => scalar_to_string(&other),
        };
        if !rendered.is_empty() {
            pairs.push((key, rendered));
        }
    }
    Ok(pairs)
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn next_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("valid next-link regex"))
}

/// Target of the `rel="next"` relation in a `Link` header, if any.
pub fn extract_next_link(link_header: &str) -> Option<&str> {
    if link_header.is_empty() {
        return None;
    }
    next_link_regex()
        .captures(link_header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Continuation token carried by a next link.
///
/// When the link has a `page-token` query parameter its value is the
/// token; otherwise the whole link is the token.
pub fn page_token_from_link(link: &str) -> String {
    if link.contains("page-token=") {
        if let Some((_, query)) = link.split_once('?') {
            let query = query.split('#').next().unwrap_or_default();
            let token = url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == PAGE_TOKEN_PARAM)
                .map(|(_, value)| value.into_owned());
            if let Some(token) = token {
                return token;
            }
        }
    }
    link.to_string()
}

fn page_url(client: &UpwindClient, endpoint: &Endpoint, cursor: &PageCursor) -> Result<Url> {
    // A token that is itself an absolute URL is followed as-is.
    if let PageCursor::Cursor {
        token: Some(token), ..
    } = cursor
    {
        if let Ok(url) = Url::parse(token) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
        }
    }

    let mut url = client.org_url(&endpoint.path)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &endpoint.query {
            pairs.append_pair(key, value);
        }
        match cursor {
            PageCursor::Cursor { token, per_page } => {
                if let Some(token) = token {
                    pairs.append_pair(PAGE_TOKEN_PARAM, token);
                }
                if let Some(per_page) = per_page {
                    pairs.append_pair(PER_PAGE_PARAM, &per_page.to_string());
                }
            }
            PageCursor::Offset { page, per_page } => {
                pairs.append_pair(PAGE_PARAM, &page.to_string());
                pairs.append_pair(PER_PAGE_PARAM, &per_page.to_string());
            }
            PageCursor::Unpaged => {}
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

/// Fetch the page addressed by `cursor`.
///
/// Performs exactly one executor call and no buffering.
///
/// # Errors
///
/// Returns the executor's error, a classified status error for any status
/// other than 200/206, or [`UpwindError::Decode`] for a malformed body.
#[tracing::instrument(skip(client, cancel), fields(path = %endpoint.path))]
pub async fn next_page<T: DeserializeOwned>(
    client: &UpwindClient,
    endpoint: &Endpoint,
    cursor: &PageCursor,
    cancel: &CancellationToken,
) -> Result<Page<T>> {
    let url = page_url(client, endpoint, cursor)?;
    let response = client.execute(&RequestDescriptor::get(url), cancel).await?;
    let response = crate::client::expect_status(
        response,
        &[StatusCode::OK, StatusCode::PARTIAL_CONTENT],
        endpoint.entity_type,
        &endpoint.path,
    )
    .await?;

    let link = response
        .headers()
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");

    let body = response.bytes().await?;
    let items: Vec<T> = serde_json::from_slice(&body)?;

    let next = match cursor {
        PageCursor::Cursor { per_page, .. } => extract_next_link(&link)
            .map(page_token_from_link)
            .filter(|token| !token.is_empty())
            .map(|token| PageCursor::Cursor {
                token: Some(token),
                per_page: *per_page,
            }),
        PageCursor::Offset { page, per_page } => {
            let full = !items.is_empty() && items.len() >= *per_page as usize;
            full.then(|| PageCursor::Offset {
                page: page + 1,
                per_page: *per_page,
            })
        }
        PageCursor::Unpaged => None,
    };

    tracing::debug!(items = items.len(), has_more = next.is_some(), "fetched page");
    Ok(Page::new(items, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_next_link() {
        let header = r#"<https://api.upwind.io/v1/organizations/o/vulnerability-findings?page-token=abc>; rel="next""#;
        assert_eq!(
            extract_next_link(header),
            Some("https://api.upwind.io/v1/organizations/o/vulnerability-findings?page-token=abc")
        );

        let multi = r#"<https://x/prev>; rel="prev", <https://x/next?page-token=t2>;rel="next""#;
        assert_eq!(extract_next_link(multi), Some("https://x/next?page-token=t2"));

        assert_eq!(extract_next_link(""), None);
        assert_eq!(extract_next_link(r#"<https://x/prev>; rel="prev""#), None);
    }

    #[test]
    fn test_page_token_from_link() {
        assert_eq!(
            page_token_from_link("https://x/findings?per-page=50&page-token=abc%3D%3D"),
            "abc=="
        );
        assert_eq!(page_token_from_link("/findings?page-token=rel"), "rel");
        // no page-token parameter: the whole link is the token
        assert_eq!(page_token_from_link("opaque-123"), "opaque-123");
    }

    #[test]
    fn test_query_pairs_skip_unset() {
        #[derive(Serialize)]
        #[serde(rename_all = "kebab-case")]
        struct Query {
            image_name: Option<String>,
            in_use: Option<bool>,
            severity: Vec<String>,
            framework: String,
            per_page: Option<u32>,
        }

        let pairs = query_pairs(&Query {
            image_name: Some("nginx".to_string()),
            in_use: Some(true),
            severity: vec!["HIGH".to_string(), "CRITICAL".to_string()],
            framework: String::new(),
            per_page: None,
        })
        .unwrap();

        assert_eq!(
            pairs,
            vec![
                ("image-name".to_string(), "nginx".to_string()),
                ("in-use".to_string(), "true".to_string()),
                ("severity".to_string(), "HIGH,CRITICAL".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_rejects_scalar() {
        assert!(query_pairs(&42).is_err());
    }

    #[test]
    fn test_page_helpers() {
        let page = Page::new(vec![1, 2, 3], Some(PageCursor::first_offset(3)));
        assert!(page.has_more());
        assert_eq!(page.len(), 3);
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);

        let last: Page<i32> = Page::new(vec![], None);
        assert!(last.is_empty());
        assert!(!last.has_more());
    }

    #[test]
    fn test_first_cursors() {
        assert_eq!(
            PageCursor::first_cursor(Some(50)),
            PageCursor::Cursor {
                token: None,
                per_page: Some(50)
            }
        );
        assert_eq!(
            PageCursor::first_offset(25),
            PageCursor::Offset {
                page: 1,
                per_page: 25
            }
        );
    }
}
