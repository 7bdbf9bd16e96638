// Page-index pagination shared by every list endpoint.
//
// Pages are 1-based. A listing always has at least one page, so links stay
// valid when the collection is empty or the caller asks past the end.

use serde::Serialize;
use tnt_common::types::PageLinks;
use url::form_urlencoded;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub after: u64,
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { after: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Resolves raw `page[after]` / `page[size]` values. Indices below 1
    /// clamp to 1; a missing or non-positive size falls back to the default
    /// and sizes above [`MAX_PAGE_SIZE`] are capped.
    pub fn resolve(after: Option<i64>, size: Option<i64>) -> Self {
        let after = after.and_then(|after| u64::try_from(after).ok()).unwrap_or(1).max(1);
        let size = match size.and_then(|size| u64::try_from(size).ok()) {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        };

        Self { after, size }
    }

    pub fn offset(&self) -> u64 {
        (self.after - 1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> u64 {
        self.size
    }
}

pub fn page_count(total: u64, size: u64) -> u64 {
    total.div_ceil(size.max(1)).max(1)
}

/// Path plus the non-page query parameters of a listing, used to render
/// `self` and navigation links.
#[derive(Debug, Clone)]
pub struct PageUrl {
    path: String,
    filters: Vec<(&'static str, String)>,
}

impl PageUrl {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), filters: Vec::new() }
    }

    pub fn filter(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.filters.push((key, value.to_owned()));
        }
        self
    }

    pub fn page(&self, after: u64, size: u64) -> String {
        let mut query = String::new();
        for (key, value) in &self.filters {
            query.push_str(key);
            query.push('=');
            query.extend(form_urlencoded::byte_serialize(value.as_bytes()));
            query.push('&');
        }

        format!("{}?{query}page[after]={after}&page[size]={size}", self.path)
    }
}

pub fn page_links(url: &PageUrl, page: PageRequest, total: u64) -> PageLinks {
    let last = page_count(total, page.size);
    let prev = page.after.saturating_sub(1).min(last).max(1);
    let next = page.after.saturating_add(1).min(last);

    PageLinks {
        first: url.page(1, page.size),
        prev: url.page(prev, page.size),
        next: url.page(next, page.size),
        last: url.page(last, page.size),
    }
}

/// Wire shape of every paginated listing.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct PageEnvelope<T> {
    #[serde(rename = "self")]
    pub self_link: String,
    pub items: Vec<T>,
    pub total: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
    pub links: PageLinks,
}

impl<T> PageEnvelope<T> {
    pub fn new(url: &PageUrl, page: PageRequest, total: u64, items: Vec<T>) -> Self {
        Self {
            self_link: url.page(page.after, page.size),
            items,
            total,
            page_size: page.size,
            links: page_links(url, page, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{page_count, page_links, PageEnvelope, PageRequest, PageUrl, DEFAULT_PAGE_SIZE};

    fn docs() -> PageUrl {
        PageUrl::new("/documents")
    }

    #[test]
    fn resolve_applies_defaults_and_clamps() {
        assert_eq!(PageRequest::resolve(None, None), PageRequest { after: 1, size: 10 });
        assert_eq!(PageRequest::resolve(Some(0), Some(0)), PageRequest { after: 1, size: 10 });
        assert_eq!(PageRequest::resolve(Some(-4), Some(-1)), PageRequest { after: 1, size: 10 });
        assert_eq!(PageRequest::resolve(Some(3), Some(500)), PageRequest { after: 3, size: 100 });
        assert_eq!(PageRequest::resolve(Some(2), Some(25)).offset(), 25);
        assert_eq!(PageRequest::default().size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_count_is_at_least_one() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(95, 10), 10);
    }

    #[test]
    fn empty_collection_links_all_point_at_page_one() {
        let links = page_links(&docs(), PageRequest::default(), 0);
        let page_one = "/documents?page[after]=1&page[size]=10";

        assert_eq!(links.first, page_one);
        assert_eq!(links.prev, page_one);
        assert_eq!(links.next, page_one);
        assert_eq!(links.last, page_one);
    }

    #[test]
    fn middle_page_links_step_by_one() {
        let links = page_links(&docs(), PageRequest { after: 2, size: 10 }, 35);

        assert_eq!(links.first, "/documents?page[after]=1&page[size]=10");
        assert_eq!(links.prev, "/documents?page[after]=1&page[size]=10");
        assert_eq!(links.next, "/documents?page[after]=3&page[size]=10");
        assert_eq!(links.last, "/documents?page[after]=4&page[size]=10");
    }

    #[test]
    fn past_the_end_prev_names_an_existing_page() {
        let links = page_links(&docs(), PageRequest { after: 9, size: 10 }, 25);

        assert_eq!(links.prev, "/documents?page[after]=3&page[size]=10");
        assert_eq!(links.next, "/documents?page[after]=3&page[size]=10");
        assert_eq!(links.last, "/documents?page[after]=3&page[size]=10");
    }

    #[test]
    fn links_preserve_filters() {
        let url = PageUrl::new("/accesses").filter("subject", Some("did:ebsi:z 1")).filter(
            "documentId",
            None,
        );
        let links = page_links(&url, PageRequest { after: 1, size: 5 }, 12);

        assert_eq!(links.next, "/accesses?subject=did%3Aebsi%3Az+1&page[after]=2&page[size]=5");
    }

    #[test]
    fn envelope_serializes_with_wire_names() {
        let envelope: PageEnvelope<u8> =
            PageEnvelope::new(&docs(), PageRequest::default(), 0, Vec::new());
        let value = serde_json::to_value(&envelope).expect("serialize");

        assert_eq!(value["self"], "/documents?page[after]=1&page[size]=10");
        assert_eq!(value["pageSize"], 10);
        assert_eq!(value["total"], 0);
        assert!(value["items"].as_array().is_some_and(Vec::is_empty));
    }
}
