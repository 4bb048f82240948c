//! Page arithmetic shared by the list endpoints

use serde::{Deserialize, Serialize};

/// Default and maximum page sizes
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// A normalized, 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Page below 1 becomes 1; limit falls back to the default and is clamped to `1..=max`.
    /// Raw values are signed so `?page=-1` normalizes instead of failing to decode.
    pub fn normalize(page: Option<i64>, limit: Option<i64>, limits: PageLimits) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = limit
            .unwrap_or(i64::from(limits.default_limit))
            .clamp(1, i64::from(limits.max_limit.max(1)));

        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: u32::try_from(limit).unwrap_or(1),
        }
    }

    /// Rows to skip: `(page - 1) * limit`
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Pagination block returned beside every list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit));
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_more: u64::from(request.page) < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let limits = PageLimits::default();
        assert_eq!(
            PageRequest::normalize(None, None, limits),
            PageRequest { page: 1, limit: 10 }
        );
        assert_eq!(
            PageRequest::normalize(Some(0), Some(0), limits),
            PageRequest { page: 1, limit: 1 }
        );
        assert_eq!(
            PageRequest::normalize(Some(3), Some(500), limits),
            PageRequest { page: 3, limit: 100 }
        );
        assert_eq!(
            PageRequest::normalize(Some(-1), Some(-5), limits),
            PageRequest { page: 1, limit: 1 }
        );
        assert_eq!(
            PageRequest::normalize(Some(i64::MAX), None, limits),
            PageRequest { page: u32::MAX, limit: 10 }
        );
    }

    #[test]
    fn test_skip() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.skip(), 0);
        assert_eq!(PageRequest { page: 4, limit: 25 }.skip(), 75);
    }

    #[test]
    fn test_total_pages_and_has_more() {
        let cases = [
            // (total, page, limit, total_pages, has_more)
            (0, 1, 10, 0, false),
            (10, 1, 10, 1, false),
            (11, 1, 10, 2, true),
            (11, 2, 10, 2, false),
            (95, 9, 10, 10, true),
            (95, 12, 10, 10, false),
        ];
        for (total, page, limit, total_pages, has_more) in cases {
            let pagination = Pagination::new(total, PageRequest { page, limit });
            assert_eq!(pagination.total_pages, total_pages, "total={total} limit={limit}");
            assert_eq!(pagination.has_more, has_more, "total={total} page={page}");
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(11, PageRequest { page: 1, limit: 10 }))
            .unwrap();
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["hasMore"], true);
    }
}
