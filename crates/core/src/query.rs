//! Query keys and pagination metadata
//!
//! A [`QueryKey`] is the identity of one list request: the resource, the page
//! window, and the filters. Two keys that compare equal are the same query
//! and must share one cached result.
//!
//! [`PaginationMeta`] is always derived from `page`, `limit`, and `total`, so
//! the invariants below hold for every page the core hands out, no matter
//! which optional fields the server sent:
//!
//! - `total_pages == ceil(total / limit)`
//! - `has_next == page < total_pages`
//! - `has_previous == page > 1`

use crate::error::{ConsoleError, ConsoleResult};
use crate::types::{Entity, EntityId, Resource, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default page size for list views
pub const DEFAULT_LIMIT: u32 = 10;

// ============================================================================
// Pagination
// ============================================================================

/// Requested page window (1-based page)
///
/// Both fields are at least 1. The only ways in are [`Pagination::new`] and
/// deserialization, which goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct Pagination {
    page: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct RawPagination {
    page: u32,
    limit: u32,
}

impl TryFrom<RawPagination> for Pagination {
    type Error = ConsoleError;

    fn try_from(raw: RawPagination) -> ConsoleResult<Self> {
        Self::new(raw.page, raw.limit)
    }
}

impl Pagination {
    /// Create a page window, rejecting zero page or limit
    pub fn new(page: u32, limit: u32) -> ConsoleResult<Self> {
        if page == 0 {
            return Err(ConsoleError::invalid_query("page must be at least 1"));
        }
        if limit == 0 {
            return Err(ConsoleError::invalid_query("limit must be at least 1"));
        }
        Ok(Self { page, limit })
    }

    /// First page with the given limit
    pub fn first(limit: u32) -> ConsoleResult<Self> {
        Self::new(1, limit)
    }

    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero-based offset of the first row on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.limit as usize
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Filter set of a list query
///
/// `scope` holds parent-scoping parameters such as `program_id=1`. A `BTreeMap`
/// keeps the key order stable so equal filter sets hash equally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryFilters {
    pub status: Option<Status>,
    pub search: Option<String>,
    pub scope: BTreeMap<String, EntityId>,
}

impl QueryFilters {
    /// Filters with nothing set
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the search term; blank input clears it
    pub fn with_search(mut self, search: impl AsRef<str>) -> Self {
        self.search = normalize_search(search.as_ref());
        self
    }

    /// Set the status filter
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a parent-scoping parameter
    pub fn with_scope(mut self, param: impl Into<String>, id: EntityId) -> Self {
        self.scope.insert(param.into(), id);
        self
    }
}

/// Trim search input; empty input means "no search"
pub fn normalize_search(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// QueryKey
// ============================================================================

/// Identity of a cached list query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    pub resource: Resource,
    pub pagination: Pagination,
    pub filters: QueryFilters,
}

impl QueryKey {
    /// Create a key for the given resource and page window
    pub fn new(resource: Resource, pagination: Pagination, filters: QueryFilters) -> Self {
        Self {
            resource,
            pagination,
            filters,
        }
    }

    /// First page of a resource with no filters
    pub fn first_page(resource: Resource, limit: u32) -> ConsoleResult<Self> {
        Ok(Self::new(resource, Pagination::first(limit)?, QueryFilters::none()))
    }

    /// Same query on another page
    pub fn with_page(&self, page: u32) -> ConsoleResult<Self> {
        Ok(Self {
            pagination: Pagination::new(page, self.pagination.limit())?,
            ..self.clone()
        })
    }

    /// Same query with another search term, back on page 1
    pub fn with_search(&self, search: &str) -> Self {
        Self {
            pagination: Pagination {
                page: 1,
                limit: self.pagination.limit(),
            },
            filters: self.filters.clone().with_search(search),
            ..self.clone()
        }
    }

    /// Query-string parameters in the order the API documents them
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.pagination.page().to_string()),
            ("limit".to_string(), self.pagination.limit().to_string()),
        ];
        if let Some(search) = &self.filters.search {
            params.push(("search".to_string(), search.clone()));
        }
        if let Some(status) = self.filters.status {
            params.push(("status".to_string(), status.code().to_string()));
        }
        for (param, id) in &self.filters.scope {
            params.push((param.clone(), id.to_string()));
        }
        params
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let query = self
            .query_params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        write!(f, "/{}?{}", self.resource.path(), query)
    }
}

// ============================================================================
// Pagination Meta
// ============================================================================

/// Normalized pagination metadata of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PaginationMeta {
    /// Derive every field from page, limit and total
    pub fn derive(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit > 0 {
            total.div_ceil(u64::from(limit)) as u32
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }

    /// Normalize server metadata against the page that was requested
    ///
    /// Server-supplied `totalPages`/`lastPage`/`hasNext`/`hasPrevious` never
    /// override the derived values; a disagreement is logged.
    pub fn from_wire(wire: &WireMeta, requested: Pagination) -> Self {
        let page = wire.page.filter(|p| *p > 0).unwrap_or(requested.page);
        let limit = wire.limit.filter(|l| *l > 0).unwrap_or(requested.limit);
        let meta = Self::derive(page, limit, wire.total);

        if let Some(reported) = wire.total_pages.or(wire.last_page) {
            if reported != meta.total_pages {
                tracing::warn!(
                    reported,
                    derived = meta.total_pages,
                    "server page count disagrees with total/limit"
                );
            }
        }
        if wire.has_next.is_some_and(|v| v != meta.has_next)
            || wire.has_previous.is_some_and(|v| v != meta.has_previous)
        {
            tracing::warn!(page, "server hasNext/hasPrevious disagree with derived values");
        }

        meta
    }

    /// Whether the requested page lies past the last page
    pub fn is_past_end(&self) -> bool {
        self.page > self.total_pages.max(1)
    }
}

/// Pagination metadata as the server sends it
///
/// Older endpoints send `lastPage` instead of `totalPages`, and some omit the
/// navigation flags entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMeta {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    pub total: u64,
    #[serde(default, alias = "total_pages")]
    pub total_pages: Option<u32>,
    #[serde(default, alias = "last_page")]
    pub last_page: Option<u32>,
    #[serde(default, alias = "has_next")]
    pub has_next: Option<bool>,
    #[serde(default, alias = "has_previous")]
    pub has_previous: Option<bool>,
}

/// List response body as the server sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireListResponse {
    pub data: Vec<Entity>,
    pub meta: WireMeta,
}

impl WireListResponse {
    /// Normalize into a [`ListPage`] for the page that was requested
    pub fn into_page(self, requested: Pagination) -> ListPage {
        ListPage {
            meta: PaginationMeta::from_wire(&self.meta, requested),
            data: self.data,
        }
    }
}

// ============================================================================
// ListPage
// ============================================================================

/// One resolved page of a list query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub data: Vec<Entity>,
    pub meta: PaginationMeta,
}

impl ListPage {
    /// Whether the page holds no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Find a row by id
    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.data.iter().find(|e| e.id == id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_pagination_rejects_zero() {
        assert!(Pagination::new(0, 10).unwrap_err().is_programmer_error());
        assert!(Pagination::new(1, 0).unwrap_err().is_programmer_error());
        assert_eq!(Pagination::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_deserialized_pagination_is_checked() {
        let err = serde_json::from_value::<Pagination>(json!({"page": 0, "limit": 10}))
            .unwrap_err();
        assert!(err.to_string().contains("page must be at least 1"));

        let ok: Pagination = serde_json::from_value(json!({"page": 2, "limit": 25})).unwrap();
        assert_eq!((ok.page(), ok.limit(), ok.offset()), (2, 25, 25));
    }

    #[test]
    fn test_equal_keys_hash_equal() {
        let a = QueryKey::new(
            Resource::Specialization,
            Pagination::default(),
            QueryFilters::none().with_scope("program_id", 1).with_search("  info "),
        );
        let b = QueryKey::new(
            Resource::Specialization,
            Pagination::default(),
            QueryFilters::none().with_search("info").with_scope("program_id", 1),
        );
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_blank_search_is_no_search() {
        let key = QueryKey::first_page(Resource::Student, 10).unwrap();
        assert_eq!(key.with_search("   "), key);
    }

    #[test]
    fn test_with_search_resets_page() {
        let key = QueryKey::first_page(Resource::Student, 10)
            .unwrap()
            .with_page(4)
            .unwrap();
        assert_eq!(key.with_search("ali").pagination.page(), 1);
    }

    #[test]
    fn test_query_params_and_display() {
        let key = QueryKey::new(
            Resource::Level,
            Pagination::new(2, 5).unwrap(),
            QueryFilters::none()
                .with_status(Status::Active)
                .with_search("L1")
                .with_scope("specialization_id", 4),
        );
        assert_eq!(
            key.to_string(),
            "/levels?page=2&limit=5&search=L1&status=1&specialization_id=4"
        );
    }

    #[test]
    fn test_meta_derivation_invariants() {
        for total in 0..40u64 {
            for limit in 1..7u32 {
                for page in 1..10u32 {
                    let meta = PaginationMeta::derive(page, limit, total);
                    assert_eq!(meta.total_pages as u64, total.div_ceil(limit as u64));
                    assert_eq!(meta.has_next, page < meta.total_pages);
                    assert_eq!(meta.has_previous, page > 1);
                }
            }
        }
    }

    #[test]
    fn test_meta_from_wire_with_last_page() {
        let wire: WireMeta = serde_json::from_value(json!({
            "page": 3,
            "limit": 10,
            "total": 20,
            "lastPage": 3,
            "hasNext": true
        }))
        .unwrap();
        let meta = PaginationMeta::from_wire(&wire, Pagination::new(3, 10).unwrap());
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
        assert!(meta.has_previous);
        assert!(meta.is_past_end());
    }

    #[test]
    fn test_meta_from_wire_falls_back_to_request() {
        let wire: WireMeta = serde_json::from_value(json!({ "total": 7 })).unwrap();
        let meta = PaginationMeta::from_wire(&wire, Pagination::new(1, 5).unwrap());
        assert_eq!(meta.page, 1);
        assert_eq!(meta.limit, 5);
        assert_eq!(meta.total_pages, 2);
        assert!(meta.has_next);
    }

    #[test]
    fn test_empty_total_is_not_past_end_on_first_page() {
        let meta = PaginationMeta::derive(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.is_past_end());
        assert!(!meta.has_next);
    }
}
