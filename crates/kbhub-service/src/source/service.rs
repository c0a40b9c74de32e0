//! Moving knowledge sources between folders.

use std::sync::Arc;

use tracing::info;

use kbhub_core::error::AppError;
use kbhub_core::types::FolderId;
use kbhub_database::{FolderStore, SourceStore};
use kbhub_entity::source::SourceMoveResult;

use crate::folder::TreeService;
use crate::folder::validation::validate_source_ids;

/// Places sources into folders.
#[derive(Debug, Clone)]
pub struct SourceService {
    folders: Arc<dyn FolderStore>,
    sources: Arc<dyn SourceStore>,
    tree: Arc<TreeService>,
}

impl SourceService {
    /// Creates a new source service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        sources: Arc<dyn SourceStore>,
        tree: Arc<TreeService>,
    ) -> Self {
        Self {
            folders,
            sources,
            tree,
        }
    }

    /// Moves one source to `folder_id` (root when `None`).
    pub async fn move_source(
        &self,
        source_id: &str,
        folder_id: Option<FolderId>,
    ) -> Result<SourceMoveResult, AppError> {
        let source_id = source_id.trim();
        if source_id.is_empty() {
            return Err(AppError::validation("Source ID cannot be blank"));
        }
        self.ensure_target(folder_id).await?;
        if !self.sources.exists(source_id).await? {
            return Err(AppError::not_found(format!("Source {source_id} not found")));
        }

        let count = self
            .sources
            .move_to_folder(&[source_id.to_string()], folder_id)
            .await?;
        self.tree.invalidate().await;

        info!(source_id, folder_id = ?folder_id, "Source moved");
        Ok(SourceMoveResult {
            message: "Source moved successfully".to_string(),
            count,
            folder_id,
        })
    }

    /// Moves many sources to `folder_id` in one operation.
    ///
    /// Unknown source IDs are skipped; `count` reports how many moved.
    pub async fn batch_move_sources(
        &self,
        source_ids: &[String],
        folder_id: Option<FolderId>,
    ) -> Result<SourceMoveResult, AppError> {
        let source_ids = validate_source_ids(source_ids)?;
        self.ensure_target(folder_id).await?;

        let count = self.sources.move_to_folder(&source_ids, folder_id).await?;
        self.tree.invalidate().await;

        info!(
            requested = source_ids.len(),
            moved = count,
            folder_id = ?folder_id,
            "Sources moved"
        );
        Ok(SourceMoveResult {
            message: format!("Moved {count} sources successfully"),
            count,
            folder_id,
        })
    }

    async fn ensure_target(&self, folder_id: Option<FolderId>) -> Result<(), AppError> {
        if let Some(folder_id) = folder_id
            && !self.folders.exists(folder_id).await?
        {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kbhub_cache::CacheManager;
    use kbhub_core::config::CacheConfig;
    use kbhub_core::error::ErrorKind;
    use kbhub_database::{MemoryStore, Stores};
    use kbhub_entity::folder::CreateFolder;
    use kbhub_entity::source::SourceRow;

    use super::*;

    async fn setup() -> (Arc<MemoryStore>, SourceService, Arc<TreeService>, FolderId) {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(store.clone());
        let cache = Arc::new(CacheManager::new(&CacheConfig::default()).await.unwrap());
        let tree = Arc::new(TreeService::new(
            stores.folders.clone(),
            stores.sources.clone(),
            cache,
            60,
        ));
        let folder = stores
            .folders
            .insert(&CreateFolder {
                name: "inbox".into(),
                description: None,
                color: None,
                icon: None,
                parent_id: None,
                position: 0,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();
        for id in ["a", "b", "c"] {
            store
                .upsert_source(SourceRow {
                    source_id: id.into(),
                    title: None,
                    source_url: None,
                    source_display_name: None,
                    folder_id: None,
                    metadata: serde_json::json!({}),
                    created_at: chrono::Utc::now(),
                })
                .unwrap();
        }
        let service = SourceService::new(stores.folders, stores.sources, tree.clone());
        (store, service, tree, folder.id)
    }

    #[tokio::test]
    async fn test_move_source_into_folder_and_back_to_root() {
        let (store, service, _tree, folder) = setup().await;

        let result = service.move_source("a", Some(folder)).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(store.count_in_folder(folder).await.unwrap(), 1);

        service.move_source("a", None).await.unwrap();
        assert_eq!(store.count_in_folder(folder).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_move_source_errors() {
        let (_store, service, _tree, folder) = setup().await;

        let err = service.move_source("ghost", Some(folder)).await.unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .move_source("a", Some(FolderId::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service.move_source(" ", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_batch_move_dedupes_and_skips_unknown() {
        let (store, service, _tree, folder) = setup().await;

        let ids: Vec<String> = ["a", "b", "a", "ghost"].iter().map(|s| s.to_string()).collect();
        let result = service.batch_move_sources(&ids, Some(folder)).await.unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.message, "Moved 2 sources successfully");
        assert_eq!(store.count_in_folder(folder).await.unwrap(), 2);

        let err = service.batch_move_sources(&[], Some(folder)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_moves_refresh_the_cached_tree() {
        let (_store, service, tree, folder) = setup().await;
        let before = tree.get_tree(false).await.unwrap();
        assert_eq!(before.tree[0].view.stats.source_count, 0);

        service
            .batch_move_sources(&["a".into(), "b".into()], Some(folder))
            .await
            .unwrap();
        let after = tree.get_tree(false).await.unwrap();
        assert_eq!(after.tree[0].view.stats.source_count, 2);
        assert_eq!(after.total_sources, 3);
    }
}
