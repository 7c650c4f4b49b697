//! Paged collection responses.

use serde::{Deserialize, Serialize};
use url::Url;

/// A response containing one page of a collection.
///
/// Every field is optional on the wire. A missing `links.next` is the only
/// signal that the collection is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PagedResult<T> {
    /// The resources on this page.
    #[serde(default)]
    pub data: Option<Vec<T>>,

    /// Navigation links, including `next` when more pages exist.
    #[serde(default)]
    pub links: Option<PagedLinks>,

    /// Paging information.
    #[serde(default)]
    pub meta: Option<PagingInformation>,

    /// Related resources requested through `include`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<serde_json::Value>,
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            data: None,
            links: None,
            meta: None,
            included: None,
        }
    }
}

impl<T> PagedResult<T> {
    /// The `next` link, if the server reported one.
    pub fn next_link(&self) -> Option<&str> {
        self.links.as_ref().and_then(|links| links.next.as_deref())
    }
}

/// Links related to a paged response.
///
/// Links are kept as text: servers send absolute URLs, but relative
/// path-and-query links are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedLinks {
    /// The first page.
    #[serde(default)]
    pub first: Option<String>,

    /// The next page.
    #[serde(default)]
    pub next: Option<String>,

    /// The link that produced this page.
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
}

/// Paging information for data responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInformation {
    #[serde(default)]
    pub paging: Option<PagingMeta>,
}

/// Per-page limit and, when reported, the collection total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingMeta {
    /// Total number of resources matching the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Maximum number of resources per page.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Extract the path and query of a link, dropping scheme, host and fragment.
///
/// Absolute URLs and path-relative links (`/v1/users?cursor=..`) are both accepted.
pub fn link_path_and_query(link: &str) -> Result<String, url::ParseError> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost")?.join(link)?
        }
        Err(e) => return Err(e),
    };

    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}
