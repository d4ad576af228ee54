use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Never reports fewer than one page.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    total_items.div_ceil(size).max(1)
}

/// `[(page-1)*size, page*size)` clipped to the collection. Pages past the end are empty.
pub fn window(total_items: usize, page: usize, page_size: usize) -> PageWindow {
    let size = page_size.max(1);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(size).min(total_items);
    let end = page.saturating_mul(size).min(total_items);
    PageWindow {
        page,
        page_size: size,
        total_items,
        total_pages: total_pages(total_items, size),
        start,
        end,
    }
}

pub fn slice<T>(items: &[T], page: usize, page_size: usize) -> (&[T], PageWindow) {
    let w = window(items.len(), page, page_size);
    (&items[w.start..w.end], w)
}
