use serde::{Deserialize, Serialize};

/// Pagination metadata for a loaded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total number of items known to the server.
    pub count: u32,
    /// Last page loaded, starting at 1.
    pub current_page: u32,
    /// Whether a further page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_previous: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            count: 0,
            current_page: 1,
            has_next: false,
            has_previous: false,
        }
    }
}

/// One page of records returned by a list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records in server order.
    pub items: Vec<T>,
    /// Pagination metadata for this page.
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }

    /// Creates a single complete page.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Self {
            items,
            pagination: Pagination {
                count,
                ..Pagination::default()
            },
        }
    }
}
