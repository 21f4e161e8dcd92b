use serde::Serialize;

use crate::validation::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// One-based page selection. Both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::InvalidPagination { field: "page" });
        }
        if limit == 0 {
            return Err(ValidationError::InvalidPagination { field: "limit" });
        }
        Ok(Self { page, limit })
    }

    pub fn from_optional(page: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        Self::new(page.unwrap_or(DEFAULT_PAGE), limit.unwrap_or(DEFAULT_LIMIT))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }

    /// Cut the requested window out of an already filtered and sorted result set.
    pub fn window<T>(&self, items: Vec<T>) -> Page<T> {
        let count = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.skip())
            .take(self.limit as usize)
            .collect();

        Page {
            items,
            count,
            page: self.page,
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A page of results plus the total number of matches ignoring pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            limit: self.limit,
        }
    }
}
