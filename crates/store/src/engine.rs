//! OpenSearch / Elasticsearch REST implementation of [`DocumentStore`].

use async_trait::async_trait;
use opensearch::{
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    params, GetParts, IndexParts, MgetParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::bootstrap::IndexDefinition;
use crate::error::StoreError;
use crate::query::{SearchRequest, SearchResponse};
use crate::{DocumentStore, Refresh};

/// Document store backed by a single search engine node.
pub struct OpenSearchStore {
    client: OpenSearch,
}

impl OpenSearchStore {
    /// Build a client for `url` (e.g. `http://localhost:9200`).
    ///
    /// No request is issued; an unreachable node surfaces on first use.
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        info!(url = %url, "Created document store client");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    async fn json_body(response: Response) -> Result<Value, StoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::decode(e.to_string()))
    }

    /// Turn a non-success response into an error, keeping the body for context.
    async fn failure(index: &str, response: Response) -> StoreError {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 404 && body.contains("index_not_found_exception") {
            return StoreError::index_not_found(index);
        }
        error!(index, status, body = %body, "Document store request failed");
        StoreError::status(status, body)
    }
}

fn refresh_param(refresh: Refresh) -> Option<params::Refresh> {
    match refresh {
        Refresh::NoWait => None,
        Refresh::WaitFor => Some(params::Refresh::WaitFor),
        Refresh::Immediate => Some(params::Refresh::True),
    }
}

/// Interpret a `_mget` body, keeping one slot per requested id.
fn parse_mget(body: &Value, ids: &[String]) -> Result<Vec<Option<Value>>, StoreError> {
    let docs = body
        .get("docs")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::decode("mget response without docs"))?;

    Ok(ids
        .iter()
        .map(|id| {
            docs.iter()
                .find(|doc| doc.get("_id").and_then(Value::as_str) == Some(id.as_str()))
                .filter(|doc| doc.get("found").and_then(Value::as_bool).unwrap_or(false))
                .and_then(|doc| doc.get("_source").cloned())
        })
        .collect())
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::failure(index, response).await),
        }
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&definition.name))
            .body(json!({
                "settings": definition.settings,
                "mappings": definition.mappings,
            }))
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::failure(&definition.name, response).await);
        }
        info!(index = %definition.name, "Created index");
        Ok(())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            return Err(Self::failure(index, response).await);
        }

        let body = Self::json_body(response).await?;
        match body.get("found").and_then(Value::as_bool) {
            Some(true) => body
                .get("_source")
                .cloned()
                .map(Some)
                .ok_or_else(|| StoreError::decode("found document without _source")),
            Some(false) => Ok(None),
            // A 404 without `found` means the index itself is missing.
            None if status.as_u16() == 404 => Err(StoreError::index_not_found(index)),
            None => Err(StoreError::decode("get response without found flag")),
        }
    }

    async fn index(
        &self,
        index: &str,
        id: &str,
        document: Value,
        refresh: Refresh,
    ) -> Result<(), StoreError> {
        let mut request = self.client.index(IndexParts::IndexId(index, id)).body(document);
        if let Some(refresh) = refresh_param(refresh) {
            request = request.refresh(refresh);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::failure(index, response).await);
        }
        debug!(index, id, ?refresh, "Document indexed");
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, StoreError> {
        let body = request.to_json();
        debug!(index, body = %body, "Issuing search");

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::failure(index, response).await);
        }
        let body = Self::json_body(response).await?;
        SearchResponse::from_json(&body, request)
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Option<Value>>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .mget(MgetParts::Index(index))
            .body(json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| StoreError::request(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::failure(index, response).await);
        }
        let body = Self::json_body(response).await?;
        parse_mget(&body, ids)
    }
}
