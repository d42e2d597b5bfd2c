use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use bookshelf_http::AppError;
use bookshelf_kernel::{AppState, Module};
use bookshelf_store::{Aggregation, Query, SearchRequest, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::json;

const TOP_LIMIT: usize = 5;

/// One entry of the top-rated list. Title and author are null when the
/// book document no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopRatedBook {
    pub book_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopRatedResponse {
    pub top: Vec<TopRatedBook>,
}

#[derive(Debug, Deserialize)]
struct BookMeta {
    title: Option<String>,
    author: Option<String>,
}

pub struct AnalyticsModule;

impl AnalyticsModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AnalyticsModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for AnalyticsModule {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn routes(&self, state: AppState) -> Router {
        Router::new()
            .route("/analytics/top-rated", get(top_rated))
            .with_state(state)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/analytics/top-rated": {
                    "get": {
                        "summary": "Top 5 books by mean rating",
                        "tags": ["Analytics"],
                        "responses": {
                            "200": {
                                "description": "Best rated books, highest first",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/TopRatedResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "TopRatedBook": {
                        "type": "object",
                        "properties": {
                            "book_id": { "type": "string" },
                            "title": { "type": "string", "nullable": true },
                            "author": { "type": "string", "nullable": true },
                            "avg_rating": { "type": "number" }
                        },
                        "required": ["book_id", "avg_rating"]
                    },
                    "TopRatedResponse": {
                        "type": "object",
                        "properties": {
                            "top": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/TopRatedBook" }
                            }
                        },
                        "required": ["top"]
                    }
                }
            }
        }))
    }
}

fn top_rated_request() -> SearchRequest {
    let mut per_book = BTreeMap::new();
    per_book.insert("avg_rating".to_string(), Aggregation::avg("rating"));

    SearchRequest::new(Query::MatchAll).aggregate(
        "by_book",
        Aggregation::Terms {
            field: "book_id".to_string(),
            size: TOP_LIMIT,
            order: Some(("avg_rating".to_string(), SortOrder::Desc)),
            aggs: per_book,
        },
    )
}

async fn top_rated(State(state): State<AppState>) -> Result<Json<TopRatedResponse>, AppError> {
    let response = state
        .store
        .search(&state.indices.reviews, &top_rated_request())
        .await?;
    let buckets = response.buckets("by_book");
    if buckets.is_empty() {
        return Ok(Json(TopRatedResponse { top: Vec::new() }));
    }

    let ids: Vec<String> = buckets.iter().map(|bucket| bucket.key.clone()).collect();
    let docs = state.store.multi_get(&state.indices.books, &ids).await?;

    let mut top = Vec::with_capacity(buckets.len());
    for (bucket, doc) in buckets.iter().zip(docs) {
        let meta = match doc {
            Some(source) => Some(
                serde_json::from_value::<BookMeta>(source).map_err(anyhow::Error::from)?,
            ),
            None => {
                tracing::warn!(book_id = %bucket.key, "rated book has no document");
                None
            }
        };
        let (title, author) = meta
            .map(|meta| (meta.title, meta.author))
            .unwrap_or_default();
        top.push(TopRatedBook {
            book_id: bucket.key.clone(),
            title,
            author,
            avg_rating: bucket.metric("avg_rating").unwrap_or(0.0),
        });
    }

    Ok(Json(TopRatedResponse { top }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_rated_orders_buckets_by_mean() {
        let body = top_rated_request().to_json();

        assert_eq!(body["size"], 0);
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(
            body["aggs"]["by_book"]["terms"],
            json!({ "field": "book_id", "size": 5, "order": { "avg_rating": "desc" } })
        );
    }
}
