//! Typed path parameter helpers.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use kbhub_core::error::AppError;
use kbhub_core::types::FolderId;

use crate::error::ApiError;

/// Parses a folder ID from a path segment.
pub fn parse_folder_id(s: &str) -> Result<FolderId, AppError> {
    s.parse::<FolderId>()
        .map_err(|_| AppError::validation(format!("Invalid folder ID: {s}")))
}

/// The `{id}` segment of a folder route.
#[derive(Debug, Clone, Copy)]
pub struct FolderPath(pub FolderId);

impl<S> FromRequestParts<S> for FolderPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(parse_folder_id(&raw)?))
    }
}
