use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_store::{DocumentStore, IndexDefinition};

use crate::settings::{Settings, StoreSettings};

/// Names of the indices each record kind lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNames {
    pub books: String,
    pub reviews: String,
}

impl From<&StoreSettings> for IndexNames {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            books: settings.books_index.clone(),
            reviews: settings.reviews_index.clone(),
        }
    }
}

/// Shared handler state: the single store handle for the process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub indices: IndexNames,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, indices: IndexNames) -> Self {
        Self { store, indices }
    }
}

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub state: &'a AppState,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup before indices are ensured
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes, paths included
    fn routes(&self, _state: AppState) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Indices this module owns, created at start-up when missing
    fn indices(&self, _settings: &Settings) -> Vec<IndexDefinition> {
        vec![]
    }

    /// Called after indices are ensured
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
