//! Optimistic folder mutations over a [`FolderTransport`].
//!
//! Every mutation follows the same sequence:
//!
//! 1. bump the generation counter so refreshes already in flight are
//!    discarded when they land;
//! 2. snapshot the cache and apply the patch;
//! 3. call the server;
//! 4. on failure restore the snapshot and return the error;
//! 5. on settle refetch every cached view to reconcile with the server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use kbhub_core::error::AppError;
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::{DeleteFolderOutcome, Folder, FolderTree, FolderView};
use kbhub_entity::source::SourceMoveResult;

use crate::api::{CreateFolderRequest, FolderTransport, UpdateFolderRequest};
use crate::cache::{FolderCache, FolderCacheSnapshot};
use crate::dnd::DropAction;

/// A folder view cache kept in step with the server through optimistic updates.
#[derive(Debug)]
pub struct OptimisticFolders<T: FolderTransport> {
    transport: Arc<T>,
    cache: RwLock<FolderCache>,
    generation: AtomicU64,
}

impl<T: FolderTransport> OptimisticFolders<T> {
    /// Wrap a transport with an empty cache.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            cache: RwLock::new(FolderCache::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// A copy of the current cache.
    pub async fn view(&self) -> FolderCache {
        self.cache.read().await.clone()
    }

    /// The current generation. Every mutation advances it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch the tree and cache it, unless a mutation started meanwhile.
    pub async fn refresh_tree(&self, include_sources: bool) -> AppResult<FolderTree> {
        let started = self.generation();
        let tree = self.transport.get_tree(include_sources).await?;

        let mut cache = self.cache.write().await;
        if self.generation() == started {
            cache.set_tree(tree.clone(), include_sources);
        } else {
            debug!(started, "Discarding superseded tree refresh");
        }
        Ok(tree)
    }

    /// Fetch `parent`'s children and cache them, unless a mutation started meanwhile.
    pub async fn refresh_list(&self, parent: Option<FolderId>) -> AppResult<Vec<FolderView>> {
        let started = self.generation();
        let folders = self.transport.list_folders(parent, true).await?;

        let mut cache = self.cache.write().await;
        if self.generation() == started {
            cache.set_list(parent, folders.clone());
        } else {
            debug!(started, "Discarding superseded list refresh");
        }
        Ok(folders)
    }

    /// Create a folder, showing a placeholder until the server answers.
    pub async fn create_folder(&self, request: CreateFolderRequest) -> AppResult<FolderView> {
        let placeholder = placeholder_for(&request);
        let temp_id = placeholder.id();

        let snapshot = self
            .begin(|cache| {
                cache.apply_create(placeholder);
                Ok(())
            })
            .await?;

        let result = self.transport.create_folder(&request).await;
        if let Ok(view) = &result {
            self.cache.write().await.replace_folder(temp_id, view.clone());
            info!(folder_id = %view.id(), "Folder created");
        }
        self.settle(snapshot, result).await
    }

    /// Update a folder's attributes and, when `parent_id` is set, move it.
    pub async fn update_folder(
        &self,
        id: FolderId,
        request: UpdateFolderRequest,
    ) -> AppResult<FolderView> {
        let changes = request.changes();
        let snapshot = self
            .begin(|cache| {
                if let Some(parent) = request.parent_id {
                    cache.apply_move(id, Some(parent))?;
                }
                cache.apply_update(id, &changes);
                Ok(())
            })
            .await?;

        let result = self.transport.update_folder(id, &request).await;
        self.settle(snapshot, result).await
    }

    /// Move a folder (`None` moves it to the root).
    ///
    /// Moves into the folder itself or a descendant are refused before any
    /// request is sent.
    pub async fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> AppResult<FolderView> {
        let snapshot = self
            .begin(|cache| cache.apply_move(id, new_parent_id))
            .await?;

        let result = self.transport.move_folder(id, new_parent_id).await;
        self.settle(snapshot, result).await
    }

    /// Delete a folder.
    pub async fn delete_folder(
        &self,
        id: FolderId,
        move_contents_to_parent: bool,
    ) -> AppResult<DeleteFolderOutcome> {
        let snapshot = self
            .begin(|cache| {
                cache.apply_delete(id, move_contents_to_parent);
                Ok(())
            })
            .await?;

        let result = self
            .transport
            .delete_folder(id, move_contents_to_parent)
            .await;
        self.settle(snapshot, result).await
    }

    /// Place sources in a folder (`None` for the root).
    pub async fn move_sources(
        &self,
        source_ids: &[String],
        folder_id: Option<FolderId>,
    ) -> AppResult<SourceMoveResult> {
        if source_ids.is_empty() {
            return Err(AppError::validation("At least one source ID is required"));
        }
        let snapshot = self
            .begin(|cache| {
                cache.apply_source_move(source_ids, folder_id);
                Ok(())
            })
            .await?;

        let result = match source_ids {
            [single] => self.transport.move_source(single, folder_id).await,
            many => self.transport.batch_move_sources(many, folder_id).await,
        };
        self.settle(snapshot, result).await
    }

    /// Carry out a validated drop.
    pub async fn apply_drop(&self, action: DropAction) -> AppResult<()> {
        match action {
            DropAction::MoveFolder {
                folder_id,
                new_parent_id,
            } => self.move_folder(folder_id, new_parent_id).await.map(|_| ()),
            DropAction::MoveSources {
                source_ids,
                folder_id,
            } => self.move_sources(&source_ids, folder_id).await.map(|_| ()),
        }
    }

    /// Cancel in-flight refreshes, snapshot, and patch the cache.
    ///
    /// A patch that fails leaves the cache untouched.
    async fn begin(
        &self,
        patch: impl FnOnce(&mut FolderCache) -> AppResult<()>,
    ) -> AppResult<FolderCacheSnapshot> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut cache = self.cache.write().await;
        let snapshot = cache.snapshot();
        if let Err(e) = patch(&mut cache) {
            cache.restore(snapshot);
            return Err(e);
        }
        Ok(snapshot)
    }

    /// Roll back on failure, then reconcile with the server either way.
    async fn settle<R>(&self, snapshot: FolderCacheSnapshot, result: AppResult<R>) -> AppResult<R> {
        if let Err(e) = &result {
            warn!(error = %e, "Folder mutation failed; rolling back");
            self.cache.write().await.restore(snapshot);
        }
        self.reconcile().await;
        result
    }

    /// Refetch every cached view.
    async fn reconcile(&self) {
        let (tree, include_sources, lists) = {
            let cache = self.cache.read().await;
            (
                cache.tree().is_some(),
                cache.tree_includes_sources(),
                cache.cached_lists(),
            )
        };
        if tree && let Err(e) = self.refresh_tree(include_sources).await {
            warn!(error = %e, "Tree refresh after mutation failed");
        }
        for parent in lists {
            if let Err(e) = self.refresh_list(parent).await {
                if e.is_not_found() {
                    continue;
                }
                warn!(error = %e, parent = ?parent, "List refresh after mutation failed");
            }
        }
    }
}

/// The view shown while a create request is in flight.
fn placeholder_for(request: &CreateFolderRequest) -> FolderView {
    let now = Utc::now();
    FolderView::bare(Folder {
        id: FolderId::new(),
        name: request.name.trim().to_string(),
        description: request.description.clone(),
        color: request.color.clone(),
        icon: request.icon.clone(),
        parent_id: request.parent_id,
        position: request.position.unwrap_or(0),
        metadata: request
            .metadata
            .clone()
            .unwrap_or_else(|| serde_json::json!({})),
        created_at: now,
        updated_at: now,
    })
}
