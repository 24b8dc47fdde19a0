//! Paging for list endpoints

use serde::{Deserialize, Serialize};

/// Rows per page
pub const PAGE_SIZE: usize = 50;

/// Page metadata returned alongside a page of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

impl Pagination {
    /// Clamp the requested page into `[1, total_pages]`
    ///
    /// ```
    /// use bandstand_server::pagination::Pagination;
    ///
    /// // 120 results = 3 pages (50 + 50 + 20)
    /// let p = Pagination::new(120, 2);
    /// assert_eq!((p.page, p.total_pages), (2, 3));
    ///
    /// // Out-of-range pages are clamped to the last page
    /// assert_eq!(Pagination::new(120, 99).page, 3);
    /// ```
    pub fn new(total_results: usize, requested_page: usize) -> Self {
        let total_pages = total_results.div_ceil(PAGE_SIZE);
        let page = requested_page.clamp(1, total_pages.max(1));

        Self {
            page,
            page_size: PAGE_SIZE,
            total_pages,
            total_results,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Take this page out of a full result list
    pub fn window<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset())
            .take(self.page_size)
            .collect()
    }
}
