use serde::{Deserialize, Serialize};
use validator::Validate;

/// A review as stored and as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    /// Unique identifier for the review
    pub id: String,
    /// Book the review was written for
    pub book_id: String,
    /// Rating from 1 to 5
    pub rating: i32,
    /// Free-text body
    pub text: String,
    /// Creation time, ISO-8601 UTC
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request model for `POST /reviews/`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReview {
    pub book_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub text: String,
}

/// Request model for `POST /books/{id}/reviews/`; the book comes from the path.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookReview {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub text: String,
}

impl Review {
    pub fn new(id: String, book_id: String, rating: i32, text: String, created_at: String) -> Self {
        Self {
            id,
            book_id,
            rating,
            text,
            created_at: Some(created_at),
        }
    }
}
