pub mod models;
mod routes;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{settings::Settings, AppState, InitCtx, Module};
use bookshelf_store::IndexDefinition;
use serde_json::json;

/// Books module: book resources, reviews scoped to a book, and the books index.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Mapping of the books index. `title` and `author` carry a `raw` keyword
/// subfield for exact matches.
pub fn books_mappings() -> serde_json::Value {
    json!({
        "properties": {
            "id": { "type": "keyword" },
            "title": {
                "type": "text",
                "fields": { "raw": { "type": "keyword" } }
            },
            "author": {
                "type": "text",
                "fields": { "raw": { "type": "keyword" } }
            },
            "year": { "type": "integer" },
            "genres": { "type": "keyword" },
            "created_at": { "type": "date" }
        }
    })
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            index = %ctx.state.indices.books,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, state: AppState) -> Router {
        routes::router(state)
    }

    fn indices(&self, settings: &Settings) -> Vec<IndexDefinition> {
        vec![IndexDefinition::new(
            settings.store.books_index.clone(),
            books_mappings(),
        )]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/books/": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Identifier of the new book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Created" }
                                    }
                                }
                            },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                            { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 } },
                            { "name": "sort", "in": "query", "schema": { "type": "string", "default": "-created_at" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BooksPage" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/{book_id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/plus-reviews/{book_id}": {
                    "get": {
                        "summary": "Get a book with its mean rating and latest reviews",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book with up to 100 reviews, newest first",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookWithReviews" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/{book_id}/reviews/": {
                    "post": {
                        "summary": "Review a book",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBookReview" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Identifier of the new review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Created" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "get": {
                        "summary": "List a book's reviews, newest first",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                            { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of reviews",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ReviewsPage" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/{book_id}/reviews/{review_id}": {
                    "get": {
                        "summary": "Get one of a book's reviews",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "review_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "The review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Review" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Review does not belong to this book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Review not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique identifier for the book" },
                            "title": { "type": "string", "description": "Title of the book" },
                            "author": { "type": "string", "description": "Author of the book" },
                            "year": { "type": "integer", "description": "Publication year" },
                            "genres": { "type": "array", "items": { "type": "string" } },
                            "created_at": { "type": "string", "format": "date-time", "nullable": true }
                        },
                        "required": ["id", "title", "author", "year", "genres"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "year": { "type": "integer" },
                            "genres": { "type": "array", "items": { "type": "string" }, "default": [] }
                        },
                        "required": ["title", "author", "year"]
                    },
                    "CreateBookReview": {
                        "type": "object",
                        "properties": {
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "text": { "type": "string" }
                        },
                        "required": ["rating", "text"]
                    },
                    "BookWithReviews": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Book" },
                            {
                                "type": "object",
                                "properties": {
                                    "avg_rating": { "type": "number", "nullable": true },
                                    "reviews": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Review" }
                                    }
                                },
                                "required": ["reviews"]
                            }
                        ]
                    },
                    "BooksPage": {
                        "type": "object",
                        "properties": {
                            "total": { "type": "integer" },
                            "page": { "type": "integer" },
                            "size": { "type": "integer" },
                            "items": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["total", "page", "size", "items"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::{Book, CreateBook};
    use serde_json::json;

    #[test]
    fn books_index_has_raw_subfields() {
        let defs = BooksModule::new().indices(&Settings::default());

        assert_eq!(defs[0].name, "books");
        let props = &defs[0].mappings["properties"];
        assert_eq!(props["title"]["fields"]["raw"]["type"], "keyword");
        assert_eq!(props["author"]["fields"]["raw"]["type"], "keyword");
        assert_eq!(props["genres"]["type"], "keyword");
        assert_eq!(defs[0].settings["index"]["number_of_shards"], 1);
    }

    #[test]
    fn genres_default_to_empty() {
        let payload: CreateBook =
            serde_json::from_value(json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}))
                .unwrap();
        assert!(payload.genres.is_empty());
    }

    #[test]
    fn stored_books_drop_unknown_fields() {
        let book: Book = serde_json::from_value(json!({
            "id": "b1",
            "title": "Dune",
            "author": "Frank Herbert",
            "year": 1965,
            "genres": ["sci-fi"],
            "created_at": "2024-01-01T00:00:00.000000000Z",
            "internal": "dropped"
        }))
        .unwrap();

        let out = serde_json::to_value(&book).unwrap();
        assert!(out.get("internal").is_none());
        assert_eq!(out["genres"], json!(["sci-fi"]));
    }
}
