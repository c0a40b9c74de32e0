//! Folder entity model.

use chrono::{DateTime, Utc};
use kbhub_core::types::FolderId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder in the knowledge-base hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// Folder name (1..=255 characters).
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Optional `#RRGGBB` colour.
    pub color: Option<String>,
    /// Optional icon identifier (e.g., `folder`, `book`).
    pub icon: Option<String>,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<FolderId>,
    /// Sort order among siblings.
    pub position: i32,
    /// Free-form JSON metadata.
    pub metadata: serde_json::Value,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Sibling sort key: `(position, name)`.
    pub fn sort_key(&self) -> (i32, &str) {
        (self.position, self.name.as_str())
    }
}

/// Derived counts that are computed on read, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStats {
    /// Sources placed directly in the folder.
    pub source_count: i64,
    /// Immediate child folders.
    pub subfolder_count: i64,
    /// Own sources plus those of every descendant.
    pub total_sources: i64,
}

/// A folder together with its derived counts, serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderView {
    #[serde(flatten)]
    pub folder: Folder,
    #[serde(flatten)]
    pub stats: FolderStats,
}

impl FolderView {
    /// Wrap a folder with the given counts.
    pub fn new(folder: Folder, stats: FolderStats) -> Self {
        Self { folder, stats }
    }

    /// Wrap a folder with all counts at zero.
    pub fn bare(folder: Folder) -> Self {
        Self::new(folder, FolderStats::default())
    }

    /// The folder ID.
    pub fn id(&self) -> FolderId {
        self.folder.id
    }

    /// The parent folder ID.
    pub fn parent_id(&self) -> Option<FolderId> {
        self.folder.parent_id
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFolder {
    /// Folder name, already trimmed and validated.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional colour.
    pub color: Option<String>,
    /// Optional icon.
    pub icon: Option<String>,
    /// Parent folder (None for root).
    pub parent_id: Option<FolderId>,
    /// Sort order.
    pub position: i32,
    /// Free-form metadata object.
    pub metadata: serde_json::Value,
}

/// A partial update of folder attributes. `None` leaves a field unchanged.
///
/// The parent is not part of the change set. A move passes it to the store
/// alongside the changes so both land together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub position: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

impl FolderChanges {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.position.is_none()
            && self.metadata.is_none()
    }

    /// Apply the change set to an in-memory folder record.
    pub fn apply_to(&self, folder: &mut Folder) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(description) = &self.description {
            folder.description = Some(description.clone());
        }
        if let Some(color) = &self.color {
            folder.color = Some(color.clone());
        }
        if let Some(icon) = &self.icon {
            folder.icon = Some(icon.clone());
        }
        if let Some(position) = self.position {
            folder.position = position;
        }
        if let Some(metadata) = &self.metadata {
            folder.metadata = metadata.clone();
        }
    }
}

/// Result of deleting a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFolderOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Whether contents were reattached to the parent instead of deleted.
    pub moved_to_parent: bool,
    pub folders_deleted: u64,
    pub sources_deleted: u64,
    pub sources_moved: u64,
    pub subfolders_moved: u64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a folder with fixed timestamps for tests.
    pub fn folder(name: &str, parent_id: Option<FolderId>, position: i32) -> Folder {
        let now = Utc::now();
        Folder {
            id: FolderId::new(),
            name: name.to_string(),
            description: None,
            color: None,
            icon: None,
            parent_id,
            position,
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }
}
