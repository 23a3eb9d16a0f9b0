//! Page-count arithmetic for the listing API.
//!
//! `trunc(total / page_size) + 1` is used as an *exclusive* upper bound, so
//! when the division is not exact the final partial page is never requested.
//! Existing schedules depend on this range; keep it as is.

use std::ops::Range;

/// Hard page-size limit of the listing API.
pub const PAGE_SIZE: u32 = 50;

/// Total matching releases, minus the pages skipped by a non-first start page.
pub fn adjusted_movie_count(total: u64, start_page: u32, page_size: u32) -> i64 {
    let skipped = (start_page.max(1) as i64 - 1) * page_size as i64;
    total as i64 - skipped
}

/// Exclusive page bound: `trunc(total / page_size) + 1`, floored to 2 so the
/// range starting at page 1 is never empty.
pub fn page_count(total: i64, page_size: u32) -> u32 {
    let count = (total.max(0) / page_size.max(1) as i64) as u32 + 1;
    if count == 1 {
        2
    } else {
        count
    }
}

/// Pages to fetch, in increasing order.
pub fn plan_pages(total: i64, page_size: u32, start_page: u32) -> Range<u32> {
    let start = start_page.max(1);
    if total <= 0 {
        return start..start;
    }
    start..page_count(total, page_size)
}
