use crate::config::SearchConfig;
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::warn;

/// Offset/limit window of one result page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Validate a 1-indexed page request against the engine bounds.
    ///
    /// Oversized pages are clamped to `max_page_size`; a window reaching past
    /// `max_result_window` is an error, never clamped.
    pub fn new(current_page: u32, requested_size: Option<u32>, search: &SearchConfig) -> Result<Self> {
        let mut page_size = requested_size.unwrap_or(search.default_page_size);
        if page_size > search.max_page_size {
            warn!(
                "Page size {} exceeds maximum {}, clamping",
                page_size, search.max_page_size
            );
            page_size = search.max_page_size;
        }

        let invalid = || Error::InvalidPagination {
            page: current_page,
            size: page_size,
            window: search.max_result_window,
        };
        if current_page == 0 {
            return Err(invalid());
        }
        let end = u64::from(current_page - 1) * u64::from(page_size) + u64::from(page_size);
        if end > u64::from(search.max_result_window) {
            return Err(invalid());
        }

        Ok(Self {
            current_page,
            page_size,
        })
    }

    pub fn from(&self) -> u32 {
        (self.current_page - 1) * self.page_size
    }

    pub fn size(&self) -> u32 {
        self.page_size
    }

    pub fn info(&self, total_count: u64) -> PaginationInfo {
        PaginationInfo {
            current_page: self.current_page,
            items_per_page: self.page_size,
            last_page: last_page(total_count, self.page_size),
            total_count,
        }
    }
}

/// Page metadata returned next to the hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub items_per_page: u32,
    pub last_page: u32,
    pub total_count: u64,
}

impl PaginationInfo {
    /// Number of hits the current page holds
    pub fn page_items(&self) -> u64 {
        expected_items(self.total_count, self.current_page, self.items_per_page)
    }
}

/// `ceil(total / per_page)`, never below 1
pub fn last_page(total_count: u64, items_per_page: u32) -> u32 {
    if items_per_page == 0 {
        return 1;
    }
    let pages = total_count.div_ceil(u64::from(items_per_page));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Hits on a 1-indexed page of `items_per_page`
pub fn expected_items(total_count: u64, current_page: u32, items_per_page: u32) -> u64 {
    if current_page == 0 {
        return 0;
    }
    let start = u64::from(current_page - 1) * u64::from(items_per_page);
    total_count.saturating_sub(start).min(u64::from(items_per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn test_fourteen_items_by_ten() {
        let first = Pagination::new(1, Some(10), &search()).unwrap();
        let info = first.info(14);
        assert_eq!(info.last_page, 2);
        assert_eq!(info.page_items(), 10);

        let second = Pagination::new(2, Some(10), &search()).unwrap();
        assert_eq!(second.from(), 10);
        assert_eq!(second.info(14).page_items(), 4);
    }

    #[test]
    fn test_page_size_clamped() {
        let pagination = Pagination::new(1, Some(1000), &search()).unwrap();
        assert_eq!(pagination.size(), 100);
        let info = pagination.info(12);
        assert_eq!(info.total_count, 12);
        assert_eq!(info.last_page, 1);
        assert_eq!(info.items_per_page, 100);
    }

    #[test]
    fn test_default_page_size() {
        let pagination = Pagination::new(1, None, &search()).unwrap();
        assert_eq!(pagination.size(), 30);
    }

    #[test]
    fn test_window_bound() {
        // 100 pages of 100 reach exactly the 10 000 window
        assert!(Pagination::new(100, Some(100), &search()).is_ok());
        let err = Pagination::new(101, Some(100), &search()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPagination { page: 101, size: 100, window: 10_000 }
        ));
    }

    #[test]
    fn test_page_zero_rejected() {
        assert!(matches!(
            Pagination::new(0, Some(10), &search()),
            Err(Error::InvalidPagination { .. })
        ));
    }

    #[test]
    fn test_last_page_at_least_one() {
        assert_eq!(last_page(0, 10), 1);
        assert_eq!(last_page(10, 10), 1);
        assert_eq!(last_page(11, 10), 2);
        assert_eq!(last_page(5, 0), 1);
    }

    #[test]
    fn test_expected_items_past_the_end() {
        assert_eq!(expected_items(14, 3, 10), 0);
        assert_eq!(expected_items(14, 0, 10), 0);
    }
}
