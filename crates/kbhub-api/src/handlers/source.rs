//! Source placement handlers.

use axum::Json;
use axum::extract::{Path, State};

use kbhub_entity::source::SourceMoveResult;

use crate::dto::request::{BatchMoveSourcesRequest, MoveSourceRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// PUT /api/sources/{source_id}/folder
pub async fn move_source(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
    ValidatedJson(req): ValidatedJson<MoveSourceRequest>,
) -> Result<Json<ApiResponse<SourceMoveResult>>, ApiError> {
    let result = state
        .source_service
        .move_source(&source_id, req.folder_id)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// POST /api/sources/move
pub async fn batch_move_sources(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BatchMoveSourcesRequest>,
) -> Result<Json<ApiResponse<SourceMoveResult>>, ApiError> {
    let result = state
        .source_service
        .batch_move_sources(&req.source_ids, req.folder_id)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}
