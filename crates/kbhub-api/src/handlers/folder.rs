//! Folder CRUD, tree, and contents handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use kbhub_entity::folder::{DeleteFolderOutcome, FolderContents, FolderTree, FolderView};

use crate::dto::request::{
    ContentsQuery, CreateFolderRequest, DeleteFolderQuery, ListFoldersQuery, MoveFolderRequest,
    TreeQuery, UpdateFolderRequest,
};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{FolderPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/folders?parent_id=...&include_counts=...
pub async fn list_folders(
    State(state): State<AppState>,
    Query(query): Query<ListFoldersQuery>,
) -> Result<Json<ApiResponse<Vec<FolderView>>>, ApiError> {
    let folders = state
        .folder_service
        .list_folders(query.parent_id, query.include_counts)
        .await?;
    Ok(Json(ApiResponse::ok(folders)))
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderView>>), ApiError> {
    let folder = state.folder_service.create_folder(req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(folder))))
}

/// GET /api/folders/tree?include_sources=...
pub async fn get_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<ApiResponse<FolderTree>>, ApiError> {
    let tree = state.tree_service.get_tree(query.include_sources).await?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// GET /api/folders/{id}
pub async fn get_folder(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
) -> Result<Json<ApiResponse<FolderView>>, ApiError> {
    let folder = state.folder_service.get_folder(id).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// PUT /api/folders/{id}
pub async fn update_folder(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
    ValidatedJson(req): ValidatedJson<UpdateFolderRequest>,
) -> Result<Json<ApiResponse<FolderView>>, ApiError> {
    let folder = state.folder_service.update_folder(id, req.into()).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// DELETE /api/folders/{id}?move_contents_to_parent=...
pub async fn delete_folder(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
    Query(query): Query<DeleteFolderQuery>,
) -> Result<Json<ApiResponse<DeleteFolderOutcome>>, ApiError> {
    let outcome = state
        .folder_service
        .delete_folder(id, query.move_contents_to_parent)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/folders/{id}/contents
pub async fn get_folder_contents(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<ApiResponse<FolderContents>>, ApiError> {
    let contents = state
        .folder_service
        .get_folder_contents(id, query.include_sources, query.include_subfolders)
        .await?;
    Ok(Json(ApiResponse::ok(contents)))
}

/// GET /api/folders/{id}/path
pub async fn get_folder_path(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let path = state.tree_service.get_path(id).await?;
    Ok(Json(ApiResponse::ok(path)))
}

/// PUT /api/folders/{id}/move
pub async fn move_folder(
    State(state): State<AppState>,
    FolderPath(id): FolderPath,
    ValidatedJson(req): ValidatedJson<MoveFolderRequest>,
) -> Result<Json<ApiResponse<FolderView>>, ApiError> {
    let folder = state
        .folder_service
        .move_folder(id, req.new_parent_id)
        .await?;
    Ok(Json(ApiResponse::ok(folder)))
}
