//! Folder tree building and path resolution, backed by the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use kbhub_cache::CacheManager;
use kbhub_cache::keys;
use kbhub_core::error::AppError;
use kbhub_core::types::FolderId;
use kbhub_database::{FolderStore, SourceStore};
use kbhub_entity::folder::FolderTree;
use kbhub_entity::folder::hierarchy::build_tree;

/// Builds the folder tree and resolves folder paths.
#[derive(Debug, Clone)]
pub struct TreeService {
    folders: Arc<dyn FolderStore>,
    sources: Arc<dyn SourceStore>,
    cache: Arc<CacheManager>,
    ttl: Duration,
    /// Bumped by every invalidation. A view built under an older epoch may
    /// predate a mutation and must not stay cached.
    epoch: Arc<AtomicU64>,
}

impl TreeService {
    /// Creates a new tree service. Cached trees live for `ttl_seconds`.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        sources: Arc<dyn SourceStore>,
        cache: Arc<CacheManager>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            folders,
            sources,
            cache,
            ttl: Duration::from_secs(ttl_seconds),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The complete folder hierarchy, optionally with each folder's sources.
    pub async fn get_tree(&self, include_sources: bool) -> Result<FolderTree, AppError> {
        let key = keys::folder_tree(include_sources);
        let epoch = self.epoch.load(Ordering::Acquire);
        match self.cache.get_json::<FolderTree>(&key).await {
            Ok(Some(tree)) => {
                debug!(include_sources, "Folder tree served from cache");
                return Ok(tree);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Folder tree cache read failed; rebuilding"),
        }

        let folders = self.folders.list_all().await?;
        let direct_counts = self.sources.counts_by_folder().await?;
        let sources = if include_sources {
            Some(self.sources.list_placed().await?)
        } else {
            None
        };
        let total_sources = self.sources.count_all().await?;

        let roots = build_tree(folders, &direct_counts, sources);
        let tree = FolderTree::from_roots(roots, total_sources);

        self.store_view(&key, &tree, epoch).await;
        Ok(tree)
    }

    /// Folder names from the root down to `folder_id`.
    pub async fn get_path(&self, folder_id: FolderId) -> Result<Vec<String>, AppError> {
        let key = keys::folder_path(folder_id);
        let epoch = self.epoch.load(Ordering::Acquire);
        match self.cache.get_json::<Vec<String>>(&key).await {
            Ok(Some(path)) => return Ok(path),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Folder path cache read failed"),
        }

        if !self.folders.exists(folder_id).await? {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }
        let path = self.folders.path_names(folder_id).await?;

        self.store_view(&key, &path, epoch).await;
        Ok(path)
    }

    /// Drop every cached tree and path. Called after each mutation.
    pub async fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        match self.cache.invalidate_prefix(keys::FOLDER_VIEWS).await {
            Ok(count) => debug!(count, "Invalidated folder caches"),
            Err(e) => warn!(error = %e, "Failed to invalidate folder caches"),
        }
    }

    /// Cache a view built while `epoch` was current.
    ///
    /// An invalidation that lands between the epoch check and the write is
    /// caught by the second check; one that lands after it removes the entry
    /// itself, since the epoch is bumped before the prefix is cleared.
    async fn store_view<T: Serialize + Sync>(&self, key: &str, value: &T, epoch: u64) {
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(key, "Folder view outdated before caching; skipped");
            return;
        }
        if let Err(e) = self.cache.set_json(key, value, self.ttl).await {
            warn!(key, error = %e, "Failed to cache folder view");
            return;
        }
        if self.epoch.load(Ordering::Acquire) != epoch
            && let Err(e) = self.cache.remove(key).await
        {
            warn!(key, error = %e, "Failed to drop outdated folder view");
        }
    }
}
