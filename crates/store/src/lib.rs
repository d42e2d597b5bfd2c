//! Document store boundary for the bookshelf service.
//!
//! All storage, querying, and aggregation is delegated to an external search
//! engine. This crate exposes that engine through the [`DocumentStore`] trait,
//! a typed query model, and the start-up index bootstrap.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod bootstrap;
pub mod engine;
pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod query;

pub use bootstrap::{ensure_indices, BootstrapReport, IndexDefinition};
pub use engine::OpenSearchStore;
pub use error::StoreError;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use query::{
    Aggregation, AggregationResult, Bucket, Query, SearchRequest, SearchResponse, Sort, SortOrder,
};

/// How long a write waits before the document is visible to searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Return immediately; visibility may lag.
    #[default]
    NoWait,
    /// Return once a scheduled refresh has made the write visible.
    WaitFor,
    /// Force a refresh before returning.
    Immediate,
}

/// Operations the service needs from the search engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), StoreError>;

    /// Fetch a document source by id. `Ok(None)` when the id is unknown.
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Write `document` under `id`, replacing any previous version.
    async fn index(
        &self,
        index: &str,
        id: &str,
        document: Value,
        refresh: Refresh,
    ) -> Result<(), StoreError>;

    async fn search(&self, index: &str, request: &SearchRequest)
        -> Result<SearchResponse, StoreError>;

    /// Fetch several documents at once; one slot per id, `None` where absent.
    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Option<Value>>, StoreError>;
}

/// [`DocumentStore::get`] decoded into `T`.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    index: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(index, id).await? {
        Some(source) => Ok(Some(serde_json::from_value(source)?)),
        None => Ok(None),
    }
}
