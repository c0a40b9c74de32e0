//! Application builder: wires services, router, and middleware into an Axum app.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::trace::TraceLayer;

use kbhub_cache::CacheManager;
use kbhub_core::config::{AppConfig, CorsConfig};
use kbhub_database::Stores;
use kbhub_service::{FolderService, SourceService, TreeService};

use crate::middleware::compression::build_compression_layer;
use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the services on top of the given stores and cache.
pub fn build_state(config: AppConfig, stores: Stores, cache: Arc<CacheManager>) -> AppState {
    let tree_service = Arc::new(TreeService::new(
        Arc::clone(&stores.folders),
        Arc::clone(&stores.sources),
        Arc::clone(&cache),
        config.folders.tree_cache_ttl_seconds,
    ));
    let folder_service = Arc::new(FolderService::new(
        Arc::clone(&stores.folders),
        Arc::clone(&stores.sources),
        Arc::clone(&tree_service),
        config.folders.clone(),
    ));
    let source_service = Arc::new(SourceService::new(
        Arc::clone(&stores.folders),
        Arc::clone(&stores.sources),
        Arc::clone(&tree_service),
    ));

    AppState {
        config: Arc::new(config),
        stores,
        cache,
        folder_service,
        tree_service,
        source_service,
        started_at: Instant::now(),
    }
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState, cors_config: &CorsConfig) -> Router {
    build_router(state)
        .layer(build_compression_layer())
        .layer(build_cors_layer(cors_config))
        .layer(TraceLayer::new_for_http())
}
