//! Page slicing for list endpoints.

use serde::Serialize;
use std::ops::Range;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 50;

/// Page metadata returned next to a page of flights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_flights: usize,
    pub flights_per_page: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// `page` is 1-based. A zero `limit` is treated as 1.
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            current_page: page,
            total_pages,
            total_flights: total,
            flights_per_page: limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Index range of this page, clamped to the item count.
    pub fn range(&self) -> Range<usize> {
        let start = self
            .current_page
            .saturating_sub(1)
            .saturating_mul(self.flights_per_page)
            .min(self.total_flights);
        let end = start
            .saturating_add(self.flights_per_page)
            .min(self.total_flights);
        start..end
    }
}

/// Slice out one page of `items`. Pages past the end are empty.
pub fn paginate<T>(items: &[T], page: usize, limit: usize) -> (&[T], Pagination) {
    let pagination = Pagination::new(page, limit, items.len());
    (&items[pagination.range()], pagination)
}

/// Parse a positive integer query value, falling back to `default` when it
/// is absent, malformed or zero.
pub fn parse_positive(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}
