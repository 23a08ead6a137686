//! Paginated backend responses.

use serde::{Deserialize, Serialize};

/// One page of results as the backend returns it (0-based `page`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            page: 0,
            size: 0,
            total_elements: 0,
            total_pages: 0,
        }
    }
}

impl<T> Page<T> {
    /// Convert a 1-based UI page number to the backend's 0-based index.
    #[must_use]
    pub const fn to_backend_index(ui_page: u32) -> u32 {
        ui_page.saturating_sub(1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Pagination numbers for templates.
    #[must_use]
    pub fn view(&self) -> PageView {
        PageView::new(self.page + 1, self.total_pages, self.total_elements)
    }

    /// Transform every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// 1-based pagination state for rendering pager links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    pub current: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl PageView {
    #[must_use]
    pub const fn new(current: u32, total_pages: u32, total_items: u64) -> Self {
        let current = if current == 0 { 1 } else { current };
        Self {
            current,
            total_pages,
            total_items,
        }
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    #[must_use]
    pub const fn prev(&self) -> u32 {
        if self.has_prev() { self.current - 1 } else { 1 }
    }

    #[must_use]
    pub const fn next(&self) -> u32 {
        if self.has_next() {
            self.current + 1
        } else {
            self.current
        }
    }

    /// Whether there is more than one page to page through.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}
