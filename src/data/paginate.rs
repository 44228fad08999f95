use serde::Serialize;

pub const MAX_PAGE_SIZE: usize = 100;

/// One page of results plus the metadata clients need to walk the rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub items: Vec<T>,
}

/// Slice `records` into the requested page.
///
/// `page` is raised to at least 1 and `page_size` clamped into
/// `1..=MAX_PAGE_SIZE`. A page past the end has no items; it is not an error.
pub fn paginate<T: Clone>(records: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total = records.len();

    let start = (page - 1).saturating_mul(page_size);
    let items = records
        .iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    Page {
        page,
        page_size,
        total,
        pages: total.div_ceil(page_size),
        has_next: page.saturating_mul(page_size) < total,
        has_prev: page > 1,
        items,
    }
}
