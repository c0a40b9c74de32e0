//! Source placement repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use kbhub_core::error::{AppError, ErrorKind};
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::source::{SourceInFolder, SourceRow};

use crate::store::SourceStore;

const SOURCE_COLUMNS: &str =
    "source_id, title, source_url, source_display_name, folder_id, metadata, created_at";

/// Repository for the folder placement of knowledge sources.
#[derive(Debug, Clone)]
pub struct SourceRepository {
    pool: PgPool,
}

impl SourceRepository {
    /// Create a new source repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for SourceRepository {
    async fn list_in_folder(&self, folder: FolderId) -> AppResult<Vec<SourceInFolder>> {
        let rows = sqlx::query_as::<_, SourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM kb_sources WHERE folder_id = $1 ORDER BY created_at DESC"
        ))
        .bind(folder)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sources", e))?;
        Ok(rows.into_iter().map(SourceInFolder::from).collect())
    }

    async fn count_in_folder(&self, folder: FolderId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM kb_sources WHERE folder_id = $1")
            .bind(folder)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count sources", e))
    }

    async fn counts_by_folder(&self) -> AppResult<HashMap<FolderId, i64>> {
        let rows: Vec<(FolderId, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) FROM kb_sources \
             WHERE folder_id IS NOT NULL GROUP BY folder_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count sources", e))?;
        Ok(rows.into_iter().collect())
    }

    async fn count_all(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM kb_sources")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count sources", e))
    }

    async fn list_placed(&self) -> AppResult<Vec<SourceInFolder>> {
        let rows = sqlx::query_as::<_, SourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM kb_sources WHERE folder_id IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sources", e))?;
        Ok(rows.into_iter().map(SourceInFolder::from).collect())
    }

    async fn exists(&self, source_id: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM kb_sources WHERE source_id = $1)",
        )
        .bind(source_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check source existence", e)
        })
    }

    async fn move_to_folder(
        &self,
        source_ids: &[String],
        folder: Option<FolderId>,
    ) -> AppResult<u64> {
        if source_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE kb_sources SET folder_id = $2 WHERE source_id = ANY($1)")
            .bind(source_ids)
            .bind(folder)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err)
                    if db_err.constraint() == Some("kb_sources_folder_id_fkey") =>
                {
                    AppError::not_found("Target folder does not exist")
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to move sources", e),
            })?;
        Ok(result.rows_affected())
    }
}
