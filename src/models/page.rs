use serde::{Deserialize, Serialize};

/// `?page=N` query parameter. Pages are 1-indexed.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
}

/// A normalized page request: page >= 1 and per_page >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn from_params(params: &PageParams, per_page: u32) -> Self {
        Self::new(params.page.unwrap_or(1), per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// One row more than the page holds, to learn whether a next page exists.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.per_page) + 1
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with `PageRequest::fetch_limit`.
    pub fn from_overfetch(mut rows: Vec<T>, request: PageRequest) -> Self {
        let has_next = rows.len() > request.per_page as usize;
        rows.truncate(request.per_page as usize);
        Self {
            items: rows,
            page: request.page,
            per_page: request.per_page,
            has_next,
            has_prev: request.page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}
