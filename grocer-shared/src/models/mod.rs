/// Database models and their queries
///
/// - `user`: accounts, refresh tokens, password-reset OTPs
/// - `category` / `sub_category` / `product`: the catalog
/// - `cart`: per-user cart lines
/// - `address`: delivery addresses (soft-deleted)
/// - `order`: one row per purchased product
///
/// All queries are runtime-checked (`sqlx::query_as`) so the crate builds
/// without a live database.

pub mod address;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod sub_category;
pub mod user;

/// Default page size for paged listings
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page number accepted; keeps `offset()` within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Page defaults to 1 and limit to [`DEFAULT_PAGE_SIZE`]; both are clamped
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default(), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, limit: 1 });
        assert_eq!(Pagination::new(Some(-3), Some(5000)).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_offset_and_total_pages() {
        let page = Pagination::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(21), 3);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = Pagination::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() >= 0);

        let page = Pagination::new(Some(i64::MAX), Some(10));
        assert_eq!(page.offset(), (MAX_PAGE - 1) * 10);

        // fields are public, so offset() must hold up without new()
        let raw = Pagination { page: i64::MAX, limit: MAX_PAGE_SIZE };
        assert_eq!(raw.offset(), i64::MAX);
    }
}
