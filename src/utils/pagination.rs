//! Page parameters and the page envelope shared by every listing.

use bookshelf_store::{Sort, SortOrder};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_SIZE: u32 = 20;
pub const SORT_FIELD: &str = "created_at";
/// Deepest result the engine serves without a scroll (`from + size`).
pub const MAX_RESULT_WINDOW: u64 = 10_000;

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

fn default_sort() -> String {
    format!("-{SORT_FIELD}")
}

/// Rejects pages that end beyond [`MAX_RESULT_WINDOW`].
pub fn check_window(page: u32, size: u32) -> Result<(), ValidationError> {
    if u64::from(page) * u64::from(size) > MAX_RESULT_WINDOW {
        let mut error = ValidationError::new("result_window");
        error.message = Some(format!("page * size must not exceed {MAX_RESULT_WINDOW}").into());
        return Err(error);
    }
    Ok(())
}

fn page_window(params: &PageParams) -> Result<(), ValidationError> {
    check_window(params.page, params.size)
}

fn sorted_page_window(params: &SortedPageParams) -> Result<(), ValidationError> {
    check_window(params.page, params.size)
}

/// `?page&size` with `page >= 1` and `1 <= size <= 100`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "page_window"))]
pub struct PageParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100))]
    pub size: u32,
}

impl PageParams {
    /// Offset of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.size as usize
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_SIZE,
        }
    }
}

/// `?page&size&sort` where `sort` is `created_at` or `-created_at`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "sorted_page_window"))]
pub struct SortedPageParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100))]
    pub size: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
}

impl SortedPageParams {
    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            size: self.size,
        }
    }

    /// A leading `-` means newest first.
    pub fn sort_clause(&self) -> Sort {
        let order = if self.sort.starts_with('-') {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        Sort {
            field: SORT_FIELD.to_string(),
            order,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total: u64, params: &PageParams, items: Vec<T>) -> Self {
        Self {
            total,
            page: params.page,
            size: params.size,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_starts_at_zero() {
        assert_eq!(PageParams { page: 1, size: 20 }.offset(), 0);
        assert_eq!(PageParams { page: 3, size: 25 }.offset(), 50);
    }

    #[test]
    fn size_is_bounded() {
        assert!(PageParams { page: 1, size: 100 }.validate().is_ok());
        assert!(PageParams { page: 1, size: 101 }.validate().is_err());
        assert!(PageParams { page: 1, size: 0 }.validate().is_err());
        assert!(PageParams { page: 0, size: 10 }.validate().is_err());
    }

    #[test]
    fn pages_past_the_result_window_are_rejected() {
        assert!(PageParams { page: 100, size: 100 }.validate().is_ok());
        assert!(PageParams { page: 200, size: 100 }.validate().is_err());

        let deep = SortedPageParams {
            page: 10_001,
            size: 1,
            sort: default_sort(),
        };
        assert!(deep.validate().is_err());
    }

    #[test]
    fn sort_prefix_selects_direction() {
        let params = |sort: &str| SortedPageParams {
            page: 1,
            size: 10,
            sort: sort.to_string(),
        };

        assert_eq!(params("-created_at").sort_clause(), Sort::desc("created_at"));
        assert_eq!(params("created_at").sort_clause(), Sort::asc("created_at"));
        assert_eq!(default_sort(), "-created_at");
    }
}
