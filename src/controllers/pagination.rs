pub const DEFAULT_WINDOW: u32 = 5;

/// Number of pages for `total` items; an empty collection still has page 1.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

/// Sliding window of page numbers centred on `current`.
pub fn page_window(current: u32, total_pages: u32, width: u32) -> Vec<u32> {
    let total_pages = total_pages.max(1);
    let width = width.clamp(1, total_pages);
    let current = clamp_page(current, total_pages);

    let mut start = current.saturating_sub(width / 2).max(1);
    if start + width - 1 > total_pages {
        start = total_pages - width + 1;
    }
    (start..start + width).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub current: u32,
    pub total_pages: u32,
    pub pages: Vec<u32>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

impl Pager {
    pub fn new(current: u32, total_pages: u32, width: u32) -> Self {
        let total_pages = total_pages.max(1);
        let current = clamp_page(current, total_pages);
        Self {
            current,
            total_pages,
            pages: page_window(current, total_pages, width),
            prev_enabled: current > 1,
            next_enabled: current < total_pages,
        }
    }
}
