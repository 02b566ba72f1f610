//! Page-count arithmetic for the count query
//!
//! Total and available physical page counts are both reported as the fake
//! capacity divided by the real page size. Availability is not tracked.

use crate::constants::DEFAULT_PAGE_SIZE;

/// Page size to divide by: the reported one if positive, else the default.
#[inline]
pub fn effective_page_size(reported: Option<i64>) -> i64 {
    match reported {
        Some(p) if p > 0 => p,
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// `fake_bytes / page_size`, floor-divided and clamped to `max`.
///
/// `max` is the largest value the caller's signed return type can hold
/// (`c_long::MAX` on the C side).
#[inline]
pub fn fake_page_count(fake_bytes: u64, page_size: Option<i64>, max: i64) -> i64 {
    let page_size = effective_page_size(page_size) as u64;
    let pages = fake_bytes / page_size;
    if pages > max as u64 {
        max
    } else {
        pages as i64
    }
}
