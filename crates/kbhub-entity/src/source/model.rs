//! Source-in-folder entity model.

use chrono::{DateTime, Utc};
use kbhub_core::types::FolderId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Minimal source representation for folder views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInFolder {
    /// Source ID (same value as `source_id`).
    pub id: String,
    /// Knowledge source identifier.
    pub source_id: String,
    /// Source title.
    pub title: Option<String>,
    /// Source URL.
    pub source_url: Option<String>,
    /// Display name.
    pub source_display_name: Option<String>,
    /// Containing folder (null at root).
    pub folder_id: Option<FolderId>,
    /// When the source was created.
    pub created_at: DateTime<Utc>,
    /// `technical` or `business`, taken from the source metadata.
    pub knowledge_type: Option<String>,
    /// Tags taken from the source metadata.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A row of the `kb_sources` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SourceRow {
    pub source_id: String,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub source_display_name: Option<String>,
    pub folder_id: Option<FolderId>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<SourceRow> for SourceInFolder {
    fn from(row: SourceRow) -> Self {
        let knowledge_type = row
            .metadata
            .get("knowledge_type")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let tags = row
            .metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: row.source_id.clone(),
            source_id: row.source_id,
            title: row.title,
            source_url: row.source_url,
            source_display_name: row.source_display_name,
            folder_id: row.folder_id,
            created_at: row.created_at,
            knowledge_type,
            tags,
        }
    }
}

/// Result of moving one or more sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMoveResult {
    /// Human-readable summary.
    pub message: String,
    /// Number of sources whose placement changed.
    pub count: u64,
    /// Target folder (null for root).
    pub folder_id: Option<FolderId>,
}
