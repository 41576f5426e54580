//! Offset pagination for grant listings

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Requested page of results (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamp out-of-range values instead of rejecting them
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        let normalized = self.normalized();
        u64::from(normalized.page - 1) * u64::from(normalized.limit)
    }

    /// Split a fetched window of `limit + 1` rows into a page and its metadata
    pub fn paginate<T>(self, mut rows: Vec<T>) -> Paginated<T> {
        let normalized = self.normalized();
        let has_next_page = rows.len() > normalized.limit as usize;
        rows.truncate(normalized.limit as usize);

        Paginated {
            items: rows,
            meta: PageMeta {
                page: normalized.page,
                limit: normalized.limit,
                has_next_page,
                has_prev_page: normalized.page > 1,
            },
        }
    }
}

/// Metadata describing where a page sits in the full result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps() {
        let p = Pagination::new(0, 0).normalized();
        assert_eq!(p, Pagination::new(1, 1));

        let p = Pagination::new(3, 1_000).normalized();
        assert_eq!(p, Pagination::new(3, MAX_PAGE_LIMIT));
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 10).offset(), 20);
        assert_eq!(Pagination::new(0, 10).offset(), 0);
    }

    #[test]
    fn test_paginate_with_more_rows() {
        let page = Pagination::new(1, 2).paginate(vec![1, 2, 3]);
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.meta.has_next_page);
        assert!(!page.meta.has_prev_page);
    }

    #[test]
    fn test_paginate_last_page() {
        let page = Pagination::new(2, 2).paginate(vec![3]);
        assert_eq!(page.items, vec![3]);
        assert!(!page.meta.has_next_page);
        assert!(page.meta.has_prev_page);
    }
}
