use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::modules::books::models::Book;
use crate::utils::pagination::{check_window, PageParams, DEFAULT_PAGE, DEFAULT_SIZE};

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

// NaN slips through range bounds since every comparison with it is false.
fn validate_search_params(params: &SearchParams) -> Result<(), ValidationError> {
    if !params.min_rating.is_finite() {
        let mut error = ValidationError::new("range");
        error.message = Some("min_rating must be a number between 0 and 5".into());
        return Err(error);
    }
    check_window(params.page, params.size)
}

/// `GET /search/` parameters. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_search_params"))]
pub struct SearchParams {
    /// Free text matched against title, author, and genres.
    pub query_main: Option<String>,
    /// Exact genre.
    pub genre: Option<String>,
    /// Minimum mean rating; books without reviews count as 0.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0))]
    pub min_rating: f64,
    pub year: Option<i32>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100))]
    pub size: u32,
}

impl SearchParams {
    /// Free text, with blank input treated as absent.
    pub fn text(&self) -> Option<&str> {
        self.query_main
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref().filter(|genre| !genre.is_empty())
    }

    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            size: self.size,
        }
    }
}

/// A search hit: the book plus its mean rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSearchItem {
    #[serde(flatten)]
    pub book: Book,
    pub avg_rating: Option<f64>,
}
