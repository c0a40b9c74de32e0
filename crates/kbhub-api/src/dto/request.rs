//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use kbhub_core::types::FolderId;
use kbhub_service::{CreateFolderInput, UpdateFolderInput};

/// Create folder request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name. Length is checked by the service after trimming.
    #[validate(length(min = 1, message = "Folder name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(equal = 7, message = "Color must look like #RRGGBB"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub icon: Option<String>,
    /// Parent folder (root when absent).
    pub parent_id: Option<FolderId>,
    pub position: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

impl From<CreateFolderRequest> for CreateFolderInput {
    fn from(req: CreateFolderRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            color: req.color,
            icon: req.icon,
            parent_id: req.parent_id,
            position: req.position,
            metadata: req.metadata,
        }
    }
}

/// Update folder request. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFolderRequest {
    #[validate(length(min = 1, message = "Folder name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(equal = 7, message = "Color must look like #RRGGBB"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub icon: Option<String>,
    pub position: Option<i32>,
    /// New parent; moves the folder when present.
    pub parent_id: Option<FolderId>,
    pub metadata: Option<serde_json::Value>,
}

impl From<UpdateFolderRequest> for UpdateFolderInput {
    fn from(req: UpdateFolderRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            color: req.color,
            icon: req.icon,
            position: req.position,
            parent_id: req.parent_id,
            metadata: req.metadata,
        }
    }
}

/// Move folder request. A null `new_parent_id` moves the folder to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MoveFolderRequest {
    #[serde(default)]
    pub new_parent_id: Option<FolderId>,
}

/// Move one source. A null `folder_id` moves it to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MoveSourceRequest {
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// Move many sources at once.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchMoveSourcesRequest {
    #[validate(length(min = 1, message = "At least one source ID is required"))]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// `GET /api/folders` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFoldersQuery {
    /// Parent to list (roots when absent).
    pub parent_id: Option<FolderId>,
    #[serde(default = "default_true")]
    pub include_counts: bool,
}

/// `GET /api/folders/tree` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub include_sources: bool,
}

/// `DELETE /api/folders/{id}` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFolderQuery {
    /// Reattach contents to the parent instead of deleting them.
    #[serde(default = "default_true")]
    pub move_contents_to_parent: bool,
}

/// `GET /api/folders/{id}/contents` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentsQuery {
    #[serde(default = "default_true")]
    pub include_sources: bool,
    #[serde(default = "default_true")]
    pub include_subfolders: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let mut req = CreateFolderRequest {
            name: "Research".into(),
            description: None,
            color: Some("#00ff41".into()),
            icon: None,
            parent_id: None,
            position: None,
            metadata: None,
        };
        assert!(req.validate().is_ok());

        req.name = String::new();
        assert!(req.validate().is_err());

        req.name = "ok".into();
        req.color = Some("#fff".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_batch_move_requires_ids() {
        let req: BatchMoveSourcesRequest =
            serde_json::from_str(r#"{"source_ids": []}"#).unwrap();
        assert!(req.folder_id.is_none());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_move_folder_null_parent_means_root() {
        let req: MoveFolderRequest = serde_json::from_str(r#"{"new_parent_id": null}"#).unwrap();
        assert!(req.new_parent_id.is_none());
        let req: MoveFolderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.new_parent_id.is_none());
    }
}
