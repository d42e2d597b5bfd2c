pub mod models;
pub mod query;

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use bookshelf_http::AppError;
use bookshelf_kernel::{AppState, InitCtx, Module};
use serde_json::json;
use validator::Validate;

use crate::modules::books::models::Book;
use crate::utils::pagination::Page;
use models::{BookSearchItem, SearchParams};

/// Book search with rating enrichment.
pub struct SearchModule;

impl SearchModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SearchModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for SearchModule {
    fn name(&self) -> &'static str {
        "search"
    }

    fn routes(&self, state: AppState) -> Router {
        Router::new()
            .route("/search", get(search_books))
            .route("/search/", get(search_books))
            .with_state(state)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/search/": {
                    "get": {
                        "summary": "Search books",
                        "description": "Filters apply before paging; the rating threshold applies to the returned page only.",
                        "tags": ["Search"],
                        "parameters": [
                            { "name": "query_main", "in": "query", "schema": { "type": "string" } },
                            { "name": "genre", "in": "query", "schema": { "type": "string" } },
                            { "name": "min_rating", "in": "query", "schema": { "type": "number", "minimum": 0, "maximum": 5, "default": 0 } },
                            { "name": "year", "in": "query", "schema": { "type": "integer" } },
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                            { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of matching books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SearchPage" }
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
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookSearchItem": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Book" },
                            {
                                "type": "object",
                                "properties": {
                                    "avg_rating": { "type": "number", "nullable": true }
                                }
                            }
                        ]
                    },
                    "SearchPage": {
                        "type": "object",
                        "properties": {
                            "total": { "type": "integer" },
                            "page": { "type": "integer" },
                            "size": { "type": "integer" },
                            "items": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/BookSearchItem" }
                            }
                        },
                        "required": ["total", "page", "size", "items"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "search module started");
        Ok(())
    }
}

async fn search_books(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Page<BookSearchItem>>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    let request = query::books_request(&params);
    let response = state.store.search(&state.indices.books, &request).await?;
    let books = response.hits_as::<Book>()?;
    let pagination = params.pagination();

    if books.is_empty() {
        return Ok(Json(Page::new(response.total, &pagination, Vec::new())));
    }

    let ids: Vec<String> = books.iter().map(|book| book.id.clone()).collect();
    let ratings = state
        .store
        .search(&state.indices.reviews, &query::ratings_request(&ids))
        .await?;
    let averages: HashMap<&str, Option<f64>> = ratings
        .buckets(query::BY_BOOK)
        .iter()
        .map(|bucket| (bucket.key.as_str(), bucket.metric(query::AVG_RATING)))
        .collect();

    // Applied to this page only, so a page may come back short.
    let items: Vec<BookSearchItem> = books
        .into_iter()
        .map(|book| {
            let avg_rating = averages.get(book.id.as_str()).copied().flatten();
            BookSearchItem { book, avg_rating }
        })
        .filter(|item| item.avg_rating.unwrap_or(0.0) >= params.min_rating)
        .collect();

    tracing::debug!(
        total = response.total,
        returned = items.len(),
        min_rating = params.min_rating,
        "search completed"
    );
    Ok(Json(Page::new(response.total, &pagination, items)))
}
