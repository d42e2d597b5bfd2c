use serde::{Deserialize, Serialize};

use crate::modules::reviews::models::Review;

/// Book document as stored in the books index and returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Publication year
    pub year: i32,
    /// Genre keywords
    #[serde(default)]
    pub genres: Vec<String>,
    /// Creation time, ISO-8601 UTC
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBook {
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Publication year
    pub year: i32,
    /// Genre keywords, empty when omitted
    #[serde(default)]
    pub genres: Vec<String>,
}

impl CreateBook {
    pub fn into_book(self, id: String, created_at: String) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            year: self.year,
            genres: self.genres,
            created_at: Some(created_at),
        }
    }
}

/// Book detail view with its mean rating and most recent reviews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookWithReviews {
    #[serde(flatten)]
    pub book: Book,
    pub avg_rating: Option<f64>,
    pub reviews: Vec<Review>,
}

