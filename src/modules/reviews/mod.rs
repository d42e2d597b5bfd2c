pub mod models;
pub(crate) mod routes;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{settings::Settings, AppState, InitCtx, Module};
use bookshelf_store::IndexDefinition;
use serde_json::json;

/// Top-level review resources and the reviews index.
pub struct ReviewsModule;

impl ReviewsModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ReviewsModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Mapping of the reviews index.
pub fn reviews_mappings() -> serde_json::Value {
    json!({
        "properties": {
            "id": { "type": "keyword" },
            "book_id": { "type": "keyword" },
            "rating": { "type": "integer" },
            "text": { "type": "text" },
            "created_at": { "type": "date" }
        }
    })
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            index = %ctx.state.indices.reviews,
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self, state: AppState) -> Router {
        routes::router(state)
    }

    fn indices(&self, settings: &Settings) -> Vec<IndexDefinition> {
        vec![IndexDefinition::new(
            settings.store.reviews_index.clone(),
            reviews_mappings(),
        )]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/reviews/": {
                    "post": {
                        "summary": "Create a review",
                        "tags": ["Reviews"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateReview" }
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
                        "summary": "List reviews",
                        "tags": ["Reviews"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                            { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 } },
                            { "name": "sort", "in": "query", "schema": { "type": "string", "default": "-created_at" } }
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
                "/reviews/{review_id}": {
                    "get": {
                        "summary": "Get a review",
                        "tags": ["Reviews"],
                        "parameters": [
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
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "book_id": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "text": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time", "nullable": true }
                        },
                        "required": ["id", "book_id", "rating", "text"]
                    },
                    "CreateReview": {
                        "type": "object",
                        "properties": {
                            "book_id": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "text": { "type": "string" }
                        },
                        "required": ["book_id", "rating", "text"]
                    },
                    "ReviewsPage": {
                        "type": "object",
                        "properties": {
                            "total": { "type": "integer" },
                            "page": { "type": "integer" },
                            "size": { "type": "integer" },
                            "items": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            }
                        },
                        "required": ["total", "page", "size", "items"]
                    },
                    "Created": {
                        "type": "object",
                        "properties": { "id": { "type": "string" } },
                        "required": ["id"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

/// Create a new instance of the reviews module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ReviewsModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviews_index_uses_configured_name() {
        let mut settings = Settings::default();
        settings.store.reviews_index = "reviews-test".to_string();

        let defs = ReviewsModule::new().indices(&settings);

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "reviews-test");
        assert_eq!(defs[0].mappings["properties"]["book_id"]["type"], "keyword");
        assert_eq!(defs[0].mappings["properties"]["rating"]["type"], "integer");
    }
}
