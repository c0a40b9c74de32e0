//! Health check handlers.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use kbhub_core::error::AppError;
use kbhub_database::FolderStore;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let database_ok = match state.stores.folders.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            false
        }
    };
    let cache_ok = match state.cache.is_reachable().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Cache health check failed");
            false
        }
    };

    let status = if database_ok && cache_ok { "ok" } else { "degraded" };
    Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        store_backend: state.stores.backend().as_str().to_string(),
        database: if database_ok { "connected" } else { "unreachable" }.to_string(),
        cache_provider: state.cache.provider_name().to_string(),
        cache: if cache_ok { "connected" } else { "unreachable" }.to_string(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError(AppError::not_found("Route not found"))
}
