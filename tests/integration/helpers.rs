//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use kbhub_cache::CacheManager;
use kbhub_core::config::AppConfig;
use kbhub_core::types::FolderId;
use kbhub_database::{MemoryStore, Stores};
use kbhub_entity::source::SourceRow;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// In-memory store behind the router, for seeding sources
    pub store: Arc<MemoryStore>,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application backed by in-memory stores
    pub async fn new() -> Self {
        let config = AppConfig::default();

        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(Arc::clone(&store));
        let cache = Arc::new(
            CacheManager::new(&config.cache)
                .await
                .expect("Failed to init cache"),
        );

        let state = kbhub_api::build_state(config.clone(), stores, cache);
        let router = kbhub_api::build_app(state, &config.server.cors);

        Self {
            router,
            store,
            config,
        }
    }

    /// Insert a source, optionally inside a folder
    pub fn seed_source(&self, source_id: &str, title: &str, folder_id: Option<FolderId>) {
        self.store
            .upsert_source(SourceRow {
                source_id: source_id.to_string(),
                title: Some(title.to_string()),
                source_url: None,
                source_display_name: None,
                folder_id,
                metadata: serde_json::json!({ "knowledge_type": "technical" }),
                created_at: chrono::Utc::now(),
            })
            .expect("Failed to seed source");
    }

    /// Create a folder through the API and return its ID
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> String {
        let response = self
            .request(
                "POST",
                "/api/folders",
                Some(serde_json::json!({ "name": name, "parent_id": parent_id })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("Folder ID missing")
            .to_string()
    }

    /// Send a request through the router
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
