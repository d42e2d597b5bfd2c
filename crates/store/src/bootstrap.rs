//! Index definitions and the start-up check that creates missing indices.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::DocumentStore;

/// Name, mappings, and settings for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub mappings: Value,
    pub settings: Value,
}

impl IndexDefinition {
    /// Definition with the default single-shard, zero-replica settings.
    pub fn new(name: impl Into<String>, mappings: Value) -> Self {
        Self {
            name: name.into(),
            mappings,
            settings: default_settings(),
        }
    }
}

pub fn default_settings() -> Value {
    json!({
        "index": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        }
    })
}

/// Outcome of [`ensure_indices`].
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub failed: Vec<(String, StoreError)>,
}

impl BootstrapReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create every index in `definitions` that does not exist yet.
///
/// Failures are logged and recorded; the remaining indices are still
/// attempted. Callers decide whether a failed index is fatal.
pub async fn ensure_indices(
    store: &dyn DocumentStore,
    definitions: &[IndexDefinition],
) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    for definition in definitions {
        let result = match store.index_exists(&definition.name).await {
            Ok(true) => {
                report.existing.push(definition.name.clone());
                continue;
            }
            Ok(false) => store.create_index(definition).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(index = %definition.name, "index created");
                report.created.push(definition.name.clone());
            }
            Err(e) => {
                warn!(index = %definition.name, error = %e, "failed to ensure index");
                report.failed.push((definition.name.clone(), e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::query::{SearchRequest, SearchResponse};
    use crate::Refresh;
    use async_trait::async_trait;

    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn index_exists(&self, _index: &str) -> Result<bool, StoreError> {
            Err(StoreError::request("connection refused"))
        }

        async fn create_index(&self, _definition: &IndexDefinition) -> Result<(), StoreError> {
            Err(StoreError::request("connection refused"))
        }

        async fn get(&self, _index: &str, _id: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::request("connection refused"))
        }

        async fn index(
            &self,
            _index: &str,
            _id: &str,
            _document: Value,
            _refresh: Refresh,
        ) -> Result<(), StoreError> {
            Err(StoreError::request("connection refused"))
        }

        async fn search(
            &self,
            _index: &str,
            _request: &SearchRequest,
        ) -> Result<SearchResponse, StoreError> {
            Err(StoreError::request("connection refused"))
        }

        async fn multi_get(
            &self,
            _index: &str,
            _ids: &[String],
        ) -> Result<Vec<Option<Value>>, StoreError> {
            Err(StoreError::request("connection refused"))
        }
    }

    fn definitions() -> Vec<IndexDefinition> {
        vec![
            IndexDefinition::new("books", json!({"properties": {}})),
            IndexDefinition::new("reviews", json!({"properties": {}})),
        ]
    }

    #[test]
    fn default_settings_use_single_shard_without_replicas() {
        let settings = default_settings();
        assert_eq!(settings["index"]["number_of_shards"], 1);
        assert_eq!(settings["index"]["number_of_replicas"], 0);
    }

    #[tokio::test]
    async fn creates_only_missing_indices() {
        let store = MemoryStore::new();
        store
            .create_index(&IndexDefinition::new("books", json!({})))
            .await
            .unwrap();

        let report = ensure_indices(&store, &definitions()).await;

        assert!(report.is_ok());
        assert_eq!(report.existing, vec!["books"]);
        assert_eq!(report.created, vec!["reviews"]);
        assert!(store.index_exists("reviews").await.unwrap());
    }

    #[tokio::test]
    async fn failures_are_reported_not_raised() {
        let report = ensure_indices(&UnreachableStore, &definitions()).await;

        assert!(!report.is_ok());
        assert_eq!(report.failed.len(), 2);
        assert!(report.created.is_empty());
    }
}
