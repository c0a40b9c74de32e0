//! Folder repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};

use kbhub_core::error::{AppError, ErrorKind};
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::{Ancestry, CreateFolder, Folder, FolderChanges, MAX_TREE_DEPTH};

use crate::store::{DeleteMode, DeleteOutcome, FolderStore, ensure_clear};

/// `pg_advisory_xact_lock` key guarding folder moves.
const HIERARCHY_LOCK_KEY: i64 = 0x6b62_666f_6c64;

const FOLDER_COLUMNS: &str = "id, name, description, color, icon, parent_id, position, metadata, \
                              created_at, updated_at";

/// Repository for folder CRUD and hierarchy queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn acquire(&self) -> AppResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })
    }
}

fn map_write_error(e: sqlx::Error, context: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) => match db_err.constraint() {
            Some("kb_folders_no_self_parent") => {
                AppError::validation("A folder cannot be its own parent")
            }
            Some("kb_folders_name_length") => {
                AppError::validation("Folder name must be between 1 and 255 characters")
            }
            Some("kb_folders_color_hex") => {
                AppError::validation("Color must be a hex code like #00ff41")
            }
            Some("kb_folders_parent_id_fkey") => {
                AppError::not_found("Parent folder does not exist")
            }
            _ => AppError::with_source(ErrorKind::Database, context.to_string(), e),
        },
        _ => AppError::with_source(ErrorKind::Database, context.to_string(), e),
    }
}

/// Ancestry of `folder` under `new_parent`, read through `conn` so a
/// transaction sees its own locks.
async fn ancestry(
    conn: &mut PgConnection,
    folder: FolderId,
    new_parent: Option<FolderId>,
) -> AppResult<Ancestry> {
    let Some(parent) = new_parent else {
        return Ok(Ancestry::Clear);
    };
    if parent == folder {
        return Ok(Ancestry::Cycle);
    }

    let cycle: bool = sqlx::query_scalar("SELECT kb_is_folder_descendant($1, $2)")
        .bind(parent)
        .bind(folder)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check folder ancestry", e)
        })?;
    if cycle {
        return Ok(Ancestry::Cycle);
    }

    if depth(conn, parent).await? >= MAX_TREE_DEPTH {
        return Ok(Ancestry::DepthExceeded);
    }
    Ok(Ancestry::Clear)
}

async fn depth(conn: &mut PgConnection, id: FolderId) -> AppResult<usize> {
    let depth: i32 = sqlx::query_scalar(
        "WITH RECURSIVE ancestors AS ( \
            SELECT id, parent_id, 0 AS depth FROM kb_folders WHERE id = $1 \
            UNION ALL \
            SELECT f.id, f.parent_id, a.depth + 1 FROM kb_folders f \
            INNER JOIN ancestors a ON f.id = a.parent_id \
            WHERE a.depth < $2 \
         ) SELECT COALESCE(MAX(depth), 0) FROM ancestors",
    )
    .bind(id)
    .bind(MAX_TREE_DEPTH as i32)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to compute folder depth", e))?;
    Ok(depth.max(0) as usize)
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(&format!("SELECT {FOLDER_COLUMNS} FROM kb_folders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn exists(&self, id: FolderId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM kb_folders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check folder existence", e)
            })
    }

    async fn list_by_parent(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM kb_folders \
             WHERE parent_id IS NOT DISTINCT FROM $1 \
             ORDER BY position ASC, name ASC"
        ))
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    async fn list_all(&self) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!("SELECT {FOLDER_COLUMNS} FROM kb_folders"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list all folders", e))
    }

    async fn insert(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(&format!(
            "INSERT INTO kb_folders (name, description, color, icon, parent_id, position, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.color)
        .bind(&data.icon)
        .bind(data.parent_id)
        .bind(data.position)
        .bind(&data.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create folder"))
    }

    async fn update(&self, id: FolderId, changes: &FolderChanges) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(&format!(
            "UPDATE kb_folders SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                color = COALESCE($4, color), \
                icon = COALESCE($5, icon), \
                position = COALESCE($6, position), \
                metadata = COALESCE($7, metadata) \
             WHERE id = $1 RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.color)
        .bind(&changes.icon)
        .bind(changes.position)
        .bind(&changes.metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update folder"))?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    async fn reparent(
        &self,
        id: FolderId,
        parent: Option<FolderId>,
        changes: &FolderChanges,
    ) -> AppResult<Folder> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // Serializes moves; released at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(HIERARCHY_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock folder hierarchy", e)
            })?;

        ensure_clear(ancestry(&mut tx, id, parent).await?)?;

        let folder = sqlx::query_as::<_, Folder>(&format!(
            "UPDATE kb_folders SET \
                parent_id = $2, \
                name = COALESCE($3, name), \
                description = COALESCE($4, description), \
                color = COALESCE($5, color), \
                icon = COALESCE($6, icon), \
                position = COALESCE($7, position), \
                metadata = COALESCE($8, metadata) \
             WHERE id = $1 RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(id)
        .bind(parent)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.color)
        .bind(&changes.icon)
        .bind(changes.position)
        .bind(&changes.metadata)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "Failed to move folder"))?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit folder move", e)
        })?;
        Ok(folder)
    }

    async fn check_reparent(
        &self,
        folder: FolderId,
        new_parent: Option<FolderId>,
    ) -> AppResult<Ancestry> {
        let mut conn = self.acquire().await?;
        ancestry(&mut conn, folder, new_parent).await
    }

    async fn path_names(&self, id: FolderId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, Vec<String>>("SELECT kb_get_folder_path($1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get folder path", e))
    }

    async fn depth(&self, id: FolderId) -> AppResult<usize> {
        let mut conn = self.acquire().await?;
        depth(&mut conn, id).await
    }

    async fn subtree_height(&self, id: FolderId) -> AppResult<usize> {
        let height: i32 = sqlx::query_scalar(
            "WITH RECURSIVE subtree AS ( \
                SELECT id, 0 AS depth FROM kb_folders WHERE id = $1 \
                UNION ALL \
                SELECT f.id, s.depth + 1 FROM kb_folders f \
                INNER JOIN subtree s ON f.parent_id = s.id \
                WHERE s.depth < $2 \
             ) SELECT COALESCE(MAX(depth), 0) FROM subtree",
        )
        .bind(id)
        .bind(MAX_TREE_DEPTH as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to compute subtree height", e)
        })?;
        Ok(height.max(0) as usize)
    }

    async fn count_subfolders(&self, id: FolderId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM kb_folders WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count subfolders", e))
    }

    async fn subfolder_counts(&self) -> AppResult<HashMap<FolderId, i64>> {
        let rows: Vec<(FolderId, i64)> = sqlx::query_as(
            "SELECT parent_id, COUNT(*) FROM kb_folders \
             WHERE parent_id IS NOT NULL GROUP BY parent_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count subfolders", e))?;
        Ok(rows.into_iter().collect())
    }

    async fn count_total_sources(&self, id: FolderId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT kb_count_folder_sources($1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count folder sources", e)
            })
    }

    async fn delete(&self, id: FolderId, mode: DeleteMode) -> AppResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let parent: Option<Option<FolderId>> =
            sqlx::query_scalar("SELECT parent_id FROM kb_folders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock folder", e))?;
        let Some(parent) = parent else {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        };

        let mut outcome = DeleteOutcome::default();
        match mode {
            DeleteMode::MoveContentsToParent => {
                outcome.sources_moved =
                    sqlx::query("UPDATE kb_sources SET folder_id = $2 WHERE folder_id = $1")
                        .bind(id)
                        .bind(parent)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to move sources", e)
                        })?
                        .rows_affected();

                outcome.subfolders_moved =
                    sqlx::query("UPDATE kb_folders SET parent_id = $2 WHERE parent_id = $1")
                        .bind(id)
                        .bind(parent)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::with_source(
                                ErrorKind::Database,
                                "Failed to move subfolders",
                                e,
                            )
                        })?
                        .rows_affected();

                outcome.folders_deleted = sqlx::query("DELETE FROM kb_folders WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to delete folder", e)
                    })?
                    .rows_affected();
            }
            DeleteMode::Recursive => {
                let subtree: Vec<FolderId> = sqlx::query_scalar(
                    "WITH RECURSIVE subtree AS ( \
                        SELECT id, 0 AS depth FROM kb_folders WHERE id = $1 \
                        UNION ALL \
                        SELECT f.id, s.depth + 1 FROM kb_folders f \
                        INNER JOIN subtree s ON f.parent_id = s.id \
                        WHERE s.depth < $2 \
                     ) SELECT id FROM subtree",
                )
                .bind(id)
                .bind(MAX_TREE_DEPTH as i32)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to collect subtree", e)
                })?;

                outcome.sources_deleted =
                    sqlx::query("DELETE FROM kb_sources WHERE folder_id = ANY($1)")
                        .bind(&subtree)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to delete sources", e)
                        })?
                        .rows_affected();

                outcome.folders_deleted =
                    sqlx::query("DELETE FROM kb_folders WHERE id = ANY($1)")
                        .bind(&subtree)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to delete folders", e)
                        })?
                        .rows_affected();
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit folder delete", e)
        })?;
        Ok(outcome)
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
