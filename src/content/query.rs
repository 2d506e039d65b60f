use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `"desc"` in any case is descending; everything else ascending.
    pub fn parse(dir: &str) -> Self {
        if dir.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Filters and paging for list queries.
#[derive(Debug, Clone, Default)]
pub struct ListParams<S> {
    pub page: i64,
    pub page_size: i64,
    pub status: Option<S>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<SortDirection>,
}

impl<S> ListParams<S> {
    pub fn page(&self) -> usize {
        self.page.max(1) as usize
    }

    /// Zero means unset and falls back to the default size.
    pub fn page_size(&self) -> usize {
        match self.page_size {
            0 => DEFAULT_PAGE_SIZE as usize,
            size => size.clamp(1, MAX_PAGE_SIZE) as usize,
        }
    }

    /// Lowercased search needle, `None` when blank.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn dir_or(&self, default: SortDirection) -> SortDirection {
        self.dir.unwrap_or(default)
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

pub fn cmp_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub pages: usize,
    pub current_page: usize,
}

impl<T> Page<T> {
    /// Slice `items` (already filtered and sorted). Pages past the end are
    /// empty rather than an error.
    pub fn paginate(items: Vec<T>, page: usize, page_size: usize) -> Self {
        let total = items.len();
        let pages = total.div_ceil(page_size);
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            items,
            total,
            pages,
            current_page: page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pages: self.pages,
            current_page: self.current_page,
        }
    }
}
