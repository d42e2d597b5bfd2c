//! Store doubles for handler unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_kernel::{AppState, IndexNames};
use bookshelf_store::{
    DocumentStore, IndexDefinition, Refresh, SearchRequest, SearchResponse, StoreError,
};
use serde_json::Value;

/// Store whose every call fails as if the engine were down.
pub(crate) struct DownStore;

#[async_trait]
impl DocumentStore for DownStore {
    async fn index_exists(&self, _index: &str) -> Result<bool, StoreError> {
        Err(StoreError::connection("connection refused"))
    }

    async fn create_index(&self, _definition: &IndexDefinition) -> Result<(), StoreError> {
        Err(StoreError::connection("connection refused"))
    }

    async fn get(&self, _index: &str, _id: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::connection("connection refused"))
    }

    async fn index(
        &self,
        _index: &str,
        _id: &str,
        _document: Value,
        _refresh: Refresh,
    ) -> Result<(), StoreError> {
        panic!("nothing may be written when the parent lookup fails");
    }

    async fn search(
        &self,
        _index: &str,
        _request: &SearchRequest,
    ) -> Result<SearchResponse, StoreError> {
        Err(StoreError::connection("connection refused"))
    }

    async fn multi_get(
        &self,
        _index: &str,
        _ids: &[String],
    ) -> Result<Vec<Option<Value>>, StoreError> {
        Err(StoreError::connection("connection refused"))
    }
}

pub(crate) fn down_state() -> AppState {
    let indices = IndexNames {
        books: "books".to_string(),
        reviews: "reviews".to_string(),
    };
    AppState::new(Arc::new(DownStore), indices)
}
