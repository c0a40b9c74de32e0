//! Route definitions for the KBHub HTTP API.
//!
//! All routes are mounted under `/api` and receive `AppState` through
//! Axum's `State` extractor.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with every route and the request-logging middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(folder_routes())
        .merge(source_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .fallback(handlers::health::not_found)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Folder CRUD, tree, contents, path, and move.
fn folder_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/folders",
            get(handlers::folder::list_folders).post(handlers::folder::create_folder),
        )
        .route("/folders/tree", get(handlers::folder::get_tree))
        .route(
            "/folders/{id}",
            get(handlers::folder::get_folder)
                .put(handlers::folder::update_folder)
                .delete(handlers::folder::delete_folder),
        )
        .route(
            "/folders/{id}/contents",
            get(handlers::folder::get_folder_contents),
        )
        .route("/folders/{id}/path", get(handlers::folder::get_folder_path))
        .route("/folders/{id}/move", put(handlers::folder::move_folder))
}

/// Source placement.
fn source_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sources/{source_id}/folder",
            put(handlers::source::move_source),
        )
        .route("/sources/move", post(handlers::source::batch_move_sources))
}

/// Liveness and dependency status.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
