#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use bookshelf_app::app;
use bookshelf_kernel::{settings::Settings, AppState, IndexNames};
use bookshelf_store::{
    DocumentStore, IndexDefinition, MemoryStore, Refresh, SearchRequest, SearchResponse, StoreError,
};
use serde_json::{json, Value};
use tower::ServiceExt as _;

/// In-memory store that remembers the index and refresh level of every write.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    writes: Mutex<Vec<(String, Refresh)>>,
}

impl RecordingStore {
    pub fn writes(&self) -> Vec<(String, Refresh)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Refresh level of the latest write to `index`.
    pub fn last_refresh(&self, index: &str) -> Option<Refresh> {
        self.writes()
            .into_iter()
            .rev()
            .find(|(name, _)| name == index)
            .map(|(_, refresh)| refresh)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        self.inner.index_exists(index).await
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), StoreError> {
        self.inner.create_index(definition).await
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(index, id).await
    }

    async fn index(
        &self,
        index: &str,
        id: &str,
        document: Value,
        refresh: Refresh,
    ) -> Result<(), StoreError> {
        self.inner.index(index, id, document, refresh).await?;
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((index.to_string(), refresh));
        }
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, StoreError> {
        self.inner.search(index, request).await
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Option<Value>>, StoreError> {
        self.inner.multi_get(index, ids).await
    }
}

/// Full router over an in-memory store with both indices created.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<RecordingStore>,
    pub settings: Settings,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::default();
        let store = Arc::new(RecordingStore::default());
        let registry = app::registry();

        let report = app::bootstrap(&registry, &settings, store.as_ref()).await;
        anyhow::ensure!(report.is_ok(), "index bootstrap failed: {:?}", report.failed);

        let state = AppState::new(
            store.clone() as Arc<dyn DocumentStore>,
            IndexNames::from(&settings.store),
        );
        let router = bookshelf_http::build_router(&registry, &settings, state);

        Ok(Self {
            router,
            store,
            settings,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("content-type", "application/json")
            .body(match body {
                Some(value) => Body::from(serde_json::to_vec(&value)?),
                None => Body::empty(),
            })
            .context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        Ok((status, body))
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::GET, path_and_query, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn create_book(
        &self,
        title: &str,
        author: &str,
        year: i32,
        genres: &[&str],
    ) -> anyhow::Result<String> {
        let (status, body) = self
            .post(
                "/books/",
                json!({ "title": title, "author": author, "year": year, "genres": genres }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "create book failed: {status} {body}");
        created_id(&body)
    }

    pub async fn create_review(&self, book_id: &str, rating: i32, text: &str) -> anyhow::Result<String> {
        let (status, body) = self
            .post(
                &format!("/books/{book_id}/reviews/"),
                json!({ "rating": rating, "text": text }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "create review failed: {status} {body}");
        created_id(&body)
    }

    /// Write a review straight into the store, bypassing the parent check.
    pub async fn seed_review(&self, id: &str, book_id: &str, rating: i32) -> anyhow::Result<()> {
        self.store
            .index(
                &self.settings.store.reviews_index,
                id,
                json!({
                    "id": id,
                    "book_id": book_id,
                    "rating": rating,
                    "text": "seeded",
                    "created_at": "2024-01-01T00:00:00.000000000Z"
                }),
                Refresh::Immediate,
            )
            .await?;
        Ok(())
    }

    pub fn review_count(&self) -> usize {
        self.store.inner.len(&self.settings.store.reviews_index)
    }
}

fn created_id(body: &Value) -> anyhow::Result<String> {
    body["id"]
        .as_str()
        .map(str::to_string)
        .context("response has no id")
}

/// `items[*].<field>` of a page body.
pub fn item_field<'a>(page: &'a Value, field: &str) -> Vec<&'a str> {
    page["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item[field].as_str()).collect())
        .unwrap_or_default()
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
