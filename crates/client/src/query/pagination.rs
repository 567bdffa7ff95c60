//! Offset/limit pagination cursoring.
//!
//! Cursors are 1-based page numbers. Page `n` covers items
//! `[(n - 1) * limit, n * limit)`, so the first request goes out with
//! offset 0. A short or empty page is terminal.

/// Default page size when a filter does not set one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// The cursor used for the very first page.
pub const INITIAL_PAGE: u32 = 1;

/// Offset for a 1-based page cursor.
#[must_use]
pub const fn page_offset(page: u32, limit: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// Next page cursor, or `None` when the last page was terminal.
///
/// A page with zero items, or with fewer items than `limit`, ends the
/// sequence; otherwise the next cursor is one past the pages fetched
/// so far.
#[must_use]
pub fn next_page_param<T>(pages: &[Vec<T>], limit: u32) -> Option<u32> {
    let last = pages.last()?;
    if last.is_empty() || last.len() < limit as usize {
        return None;
    }
    u32::try_from(pages.len()).ok().map(|fetched| fetched + 1)
}
