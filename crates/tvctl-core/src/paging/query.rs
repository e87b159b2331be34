//! Query and result types for paginated collection views

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::store::EntityId;

/// Page size used when a query does not set one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const PAGE_KEY: &str = "page";
const PAGE_SIZE_KEY: &str = "page_size";

/// Filter, sort and page descriptor for a collection view
///
/// Queries are values: every builder method returns a new query and the
/// original is left untouched. Two queries are equal exactly when their
/// serialized forms are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
    page: u32,
    page_size: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Query {
    /// First page, default page size, no filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter or sort parameter
    ///
    /// An existing key keeps its position; a new key is appended.
    /// `page` and `page_size` are routed to their dedicated setters.
    pub fn with_param(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();

        match key.as_str() {
            PAGE_KEY => return self.with_page(value.parse().unwrap_or(1)),
            PAGE_SIZE_KEY => {
                return self.with_page_size(value.parse().unwrap_or(DEFAULT_PAGE_SIZE))
            }
            _ => {}
        }

        let mut next = self.clone();
        match next.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => next.params.push((key, value)),
        }
        next
    }

    /// Drop a filter or sort parameter
    pub fn without_param(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.params.retain(|(k, _)| k != key);
        next
    }

    /// Same filters, different page (1-based; 0 is treated as 1)
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    pub fn with_page_size(&self, page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..self.clone()
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_unfiltered(&self) -> bool {
        self.params.is_empty()
    }

    /// Filter and sort parameters only, as sent to the id-snapshot endpoint
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.params.clone()
    }

    /// Filter and sort parameters followed by the page parameters
    pub fn page_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filter_pairs();
        pairs.push((PAGE_KEY.to_string(), self.page.to_string()));
        pairs.push((PAGE_SIZE_KEY.to_string(), self.page_size.to_string()));
        pairs
    }

    /// URL-encoded form of the full parameter set
    pub fn serialize(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.page_pairs())
            .finish()
    }

    /// Parse a URL-encoded parameter string back into a query
    pub fn parse(encoded: &str) -> Self {
        url::form_urlencoded::parse(encoded.trim_start_matches('?').as_bytes())
            .fold(Self::new(), |query, (k, v)| query.with_param(k, v))
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// One page of a collection, valid only for the query that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
}

/// Paginated response envelope returned by list endpoints
///
/// `next`/`previous` links are ignored; navigation goes through [`Query`].
#[derive(Debug, Deserialize)]
struct PageEnvelope<T> {
    count: u64,
    results: Vec<T>,
}

impl<T: DeserializeOwned> QueryResult<T> {
    /// Decode a page envelope, stamping it with the page that was requested
    pub fn from_envelope(body: Value, page: u32) -> ApiResult<Self> {
        let envelope: PageEnvelope<T> = serde_json::from_value(body)?;
        Ok(Self {
            items: envelope.results,
            total_count: envelope.count,
            page,
        })
    }
}

impl<T> QueryResult<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages at the given page size
    pub fn page_count(&self, page_size: u32) -> u64 {
        let size = u64::from(page_size.max(1));
        self.total_count.div_ceil(size)
    }
}

/// Every id matching a query's filters, independent of pagination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllIdsSnapshot(Vec<EntityId>);

impl AllIdsSnapshot {
    pub fn new(ids: Vec<EntityId>) -> Self {
        Self(ids)
    }

    /// Decode the id endpoint's response; an empty body means no ids
    pub fn from_value(body: Value) -> ApiResult<Self> {
        if body.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(body)?)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }
}
