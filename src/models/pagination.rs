//! Pagination parameters and paged responses for list endpoints.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalised pagination parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub page_size: u32,
}

impl Pagination {
    /// Clamp raw query values to sane defaults.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the totals a client needs to render paging.
///
/// ```json
/// {
///   "items": [...],
///   "page": 2,
///   "page_size": 25,
///   "total_count": 61,
///   "total_pages": 3
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total_count: i64) -> Self {
        let page_size = i64::from(pagination.page_size);
        let total_pages = if total_count <= 0 {
            0
        } else {
            (total_count + page_size - 1) / page_size
        };
        Self {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total_count,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_missing_values_use_defaults() {
        let p = Pagination::new(Some(0), None);
        assert_eq!(p, Pagination { page: 1, page_size: DEFAULT_PAGE_SIZE });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(Pagination::new(None, Some(0)).page_size, 1);
        assert_eq!(Pagination::new(None, Some(1000)).page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let p = Pagination::new(Some(3), Some(20));
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination::new(Some(1), Some(25));
        assert_eq!(Paged::new(vec![1], p, 61).total_pages, 3);
        assert_eq!(Paged::new(Vec::<i32>::new(), p, 0).total_pages, 0);
        assert_eq!(Paged::new(vec![1], p, 25).total_pages, 1);
    }
}
