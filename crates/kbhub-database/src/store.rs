//! Store traits for folders and source placement, plus backend selection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use kbhub_core::config::{DatabaseConfig, StoreBackend};
use kbhub_core::error::AppError;
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::{Ancestry, CreateFolder, Folder, FolderChanges, MAX_TREE_DEPTH};
use kbhub_entity::source::SourceInFolder;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::migration::run_migrations;
use crate::repositories::{FolderRepository, SourceRepository};

/// What happens to a folder's contents when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Subfolders and sources are reattached to the deleted folder's parent.
    MoveContentsToParent,
    /// The whole subtree is deleted together with its sources.
    Recursive,
}

impl DeleteMode {
    /// Map the API flag onto a delete mode.
    pub fn from_flag(move_contents_to_parent: bool) -> Self {
        if move_contents_to_parent {
            Self::MoveContentsToParent
        } else {
            Self::Recursive
        }
    }
}

/// Rows affected by a folder delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub folders_deleted: u64,
    pub sources_deleted: u64,
    pub sources_moved: u64,
    pub subfolders_moved: u64,
}

/// Persistence operations over the folder hierarchy.
#[async_trait]
pub trait FolderStore: Send + Sync + fmt::Debug + 'static {
    /// Find a folder by ID.
    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>>;

    /// Whether a folder exists.
    async fn exists(&self, id: FolderId) -> AppResult<bool>;

    /// Children of `parent` (roots when `None`), ordered by `(position, name)`.
    async fn list_by_parent(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>>;

    /// Every folder, in no particular order.
    async fn list_all(&self) -> AppResult<Vec<Folder>>;

    /// Insert a new folder.
    async fn insert(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Apply a partial update. Fails with `NotFound` for unknown folders.
    async fn update(&self, id: FolderId, changes: &FolderChanges) -> AppResult<Folder>;

    /// Move a folder under `parent` (`None` is the root) and apply
    /// `changes` in one atomic step.
    ///
    /// The ancestry check runs inside the same critical section as the
    /// write, so concurrent moves can never close a cycle. A rejected move
    /// leaves the folder untouched.
    async fn reparent(
        &self,
        id: FolderId,
        parent: Option<FolderId>,
        changes: &FolderChanges,
    ) -> AppResult<Folder>;

    /// Check whether `folder` may be placed under `new_parent`.
    async fn check_reparent(
        &self,
        folder: FolderId,
        new_parent: Option<FolderId>,
    ) -> AppResult<Ancestry>;

    /// Folder names from the root down to `id`; empty for unknown folders.
    async fn path_names(&self, id: FolderId) -> AppResult<Vec<String>>;

    /// Number of ancestors of `id` (0 for a root).
    async fn depth(&self, id: FolderId) -> AppResult<usize>;

    /// Height of the subtree under `id` (0 for a leaf).
    async fn subtree_height(&self, id: FolderId) -> AppResult<usize>;

    /// Number of immediate children.
    async fn count_subfolders(&self, id: FolderId) -> AppResult<i64>;

    /// Immediate child count for every folder that has children.
    async fn subfolder_counts(&self) -> AppResult<HashMap<FolderId, i64>>;

    /// Sources in `id` and every descendant.
    async fn count_total_sources(&self, id: FolderId) -> AppResult<i64>;

    /// Delete a folder atomically according to `mode`.
    async fn delete(&self, id: FolderId, mode: DeleteMode) -> AppResult<DeleteOutcome>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Persistence operations over source placement.
#[async_trait]
pub trait SourceStore: Send + Sync + fmt::Debug + 'static {
    /// Sources directly in `folder`, newest first.
    async fn list_in_folder(&self, folder: FolderId) -> AppResult<Vec<SourceInFolder>>;

    /// Number of sources directly in `folder`.
    async fn count_in_folder(&self, folder: FolderId) -> AppResult<i64>;

    /// Direct source count for every folder that holds sources.
    async fn counts_by_folder(&self) -> AppResult<HashMap<FolderId, i64>>;

    /// Total number of sources, placed or not.
    async fn count_all(&self) -> AppResult<i64>;

    /// Every source that sits in a folder.
    async fn list_placed(&self) -> AppResult<Vec<SourceInFolder>>;

    /// Whether a source exists.
    async fn exists(&self, source_id: &str) -> AppResult<bool>;

    /// Move sources to `folder` (root when `None`). Returns rows affected.
    async fn move_to_folder(&self, source_ids: &[String], folder: Option<FolderId>)
    -> AppResult<u64>;
}

/// Turn a failed ancestry check into the error a rejected move reports.
pub(crate) fn ensure_clear(ancestry: Ancestry) -> AppResult<()> {
    match ancestry {
        Ancestry::Clear => Ok(()),
        Ancestry::Cycle => Err(AppError::validation(
            "Cannot move folder: would create circular reference",
        )),
        Ancestry::DepthExceeded => Err(AppError::validation(format!(
            "Cannot move folder: nesting exceeds {MAX_TREE_DEPTH} levels"
        ))),
    }
}

/// The configured folder and source stores.
#[derive(Debug, Clone)]
pub struct Stores {
    pub folders: Arc<dyn FolderStore>,
    pub sources: Arc<dyn SourceStore>,
    backend: StoreBackend,
    pool: Option<DatabasePool>,
}

impl Stores {
    /// Connect the backend selected by `database.backend`.
    ///
    /// The Postgres backend runs pending migrations when
    /// `database.run_migrations` is set.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StoreBackend::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self::postgres(pool))
            }
            StoreBackend::Memory => {
                info!("Using in-memory folder store");
                Ok(Self::memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    /// Stores backed by Postgres repositories sharing one pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            folders: Arc::new(FolderRepository::new(pool.pool().clone())),
            sources: Arc::new(SourceRepository::new(pool.pool().clone())),
            backend: StoreBackend::Postgres,
            pool: Some(pool),
        }
    }

    /// Stores backed by one shared in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            folders: store.clone(),
            sources: store,
            backend: StoreBackend::Memory,
            pool: None,
        }
    }

    /// The active backend.
    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    /// The Postgres pool, when the Postgres backend is active.
    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }

    /// Close the pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
