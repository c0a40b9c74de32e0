//! Folder CRUD operations with hierarchy rules.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use kbhub_core::config::FolderConfig;
use kbhub_core::error::AppError;
use kbhub_core::types::FolderId;
use kbhub_database::{DeleteMode, FolderStore, SourceStore};
use kbhub_entity::folder::{
    Ancestry, CreateFolder, DeleteFolderOutcome, Folder, FolderChanges, FolderContents,
    FolderStats, FolderView,
};

use super::tree::TreeService;
use super::validation;

/// Input for creating a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFolderInput {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Parent folder ID (None for root-level).
    pub parent_id: Option<FolderId>,
    /// Sort order; defaults to 0.
    pub position: Option<i32>,
    /// Free-form object; defaults to `{}`.
    pub metadata: Option<serde_json::Value>,
}

/// Input for updating a folder. Only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFolderInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub position: Option<i32>,
    /// When supplied, the folder is moved under this parent.
    pub parent_id: Option<FolderId>,
    pub metadata: Option<serde_json::Value>,
}

/// Manages folder CRUD operations.
#[derive(Debug, Clone)]
pub struct FolderService {
    folders: Arc<dyn FolderStore>,
    sources: Arc<dyn SourceStore>,
    tree: Arc<TreeService>,
    config: FolderConfig,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        sources: Arc<dyn SourceStore>,
        tree: Arc<TreeService>,
        config: FolderConfig,
    ) -> Self {
        Self {
            folders,
            sources,
            tree,
            config,
        }
    }

    /// Creates a new folder.
    pub async fn create_folder(&self, input: CreateFolderInput) -> Result<FolderView, AppError> {
        let name = validation::validate_folder_name(&input.name)?;
        if let Some(color) = &input.color {
            validation::validate_color(color)?;
        }
        let icon = input
            .icon
            .as_deref()
            .map(validation::validate_icon)
            .transpose()?;
        let metadata = input.metadata.unwrap_or_else(|| serde_json::json!({}));
        validation::validate_metadata(&metadata)?;

        if let Some(parent_id) = input.parent_id {
            if !self.folders.exists(parent_id).await? {
                return Err(AppError::not_found(format!(
                    "Parent folder {parent_id} does not exist"
                )));
            }
            let depth = self.folders.depth(parent_id).await? + 1;
            self.ensure_depth(depth)?;
        }

        let record = CreateFolder {
            name,
            description: input.description,
            color: input.color,
            icon,
            parent_id: input.parent_id,
            position: input.position.unwrap_or(0),
            metadata,
        };
        let folder = self.folders.insert(&record).await?;
        self.tree.invalidate().await;

        info!(
            folder_id = %folder.id,
            parent_id = ?folder.parent_id,
            name = %folder.name,
            "Folder created"
        );

        Ok(FolderView::bare(folder))
    }

    /// Gets a folder with its counts.
    pub async fn get_folder(&self, folder_id: FolderId) -> Result<FolderView, AppError> {
        let folder = self.require_folder(folder_id).await?;
        self.with_counts(folder).await
    }

    /// Lists the children of `parent_id` (roots when `None`).
    pub async fn list_folders(
        &self,
        parent_id: Option<FolderId>,
        include_counts: bool,
    ) -> Result<Vec<FolderView>, AppError> {
        let folders = self.folders.list_by_parent(parent_id).await?;
        let mut views = Vec::with_capacity(folders.len());
        for folder in folders {
            let view = if include_counts {
                self.with_counts(folder).await?
            } else {
                FolderView::bare(folder)
            };
            views.push(view);
        }
        Ok(views)
    }

    /// Updates a folder's attributes and, when `parent_id` is given, its parent.
    pub async fn update_folder(
        &self,
        folder_id: FolderId,
        input: UpdateFolderInput,
    ) -> Result<FolderView, AppError> {
        let existing = self.require_folder(folder_id).await?;

        let changes = FolderChanges {
            name: input
                .name
                .as_deref()
                .map(validation::validate_folder_name)
                .transpose()?,
            description: input.description,
            color: match input.color {
                Some(color) => {
                    validation::validate_color(&color)?;
                    Some(color)
                }
                None => None,
            },
            icon: input
                .icon
                .as_deref()
                .map(validation::validate_icon)
                .transpose()?,
            position: input.position,
            metadata: match input.metadata {
                Some(metadata) => {
                    validation::validate_metadata(&metadata)?;
                    Some(metadata)
                }
                None => None,
            },
        };

        let reparent = input
            .parent_id
            .filter(|parent| existing.parent_id != Some(*parent));
        if let Some(parent) = reparent {
            self.ensure_can_reparent(folder_id, Some(parent)).await?;
        }

        if changes.is_empty() && reparent.is_none() {
            return self.with_counts(existing).await;
        }

        let folder = match reparent {
            Some(parent) => {
                self.folders
                    .reparent(folder_id, Some(parent), &changes)
                    .await?
            }
            None => self.folders.update(folder_id, &changes).await?,
        };
        self.tree.invalidate().await;

        info!(folder_id = %folder_id, moved = reparent.is_some(), "Folder updated");
        self.with_counts(folder).await
    }

    /// Moves a folder under `new_parent_id` (root when `None`).
    pub async fn move_folder(
        &self,
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> Result<FolderView, AppError> {
        let existing = self.require_folder(folder_id).await?;
        self.ensure_can_reparent(folder_id, new_parent_id).await?;

        if existing.parent_id == new_parent_id {
            return self.with_counts(existing).await;
        }

        let folder = self
            .folders
            .reparent(folder_id, new_parent_id, &FolderChanges::default())
            .await?;
        self.tree.invalidate().await;

        info!(
            folder_id = %folder_id,
            from = ?existing.parent_id,
            to = ?new_parent_id,
            "Folder moved"
        );
        self.with_counts(folder).await
    }

    /// Deletes a folder, either reattaching or deleting its contents.
    pub async fn delete_folder(
        &self,
        folder_id: FolderId,
        move_contents_to_parent: bool,
    ) -> Result<DeleteFolderOutcome, AppError> {
        let folder = self.require_folder(folder_id).await?;
        let outcome = self
            .folders
            .delete(folder_id, DeleteMode::from_flag(move_contents_to_parent))
            .await?;
        self.tree.invalidate().await;

        info!(
            folder_id = %folder_id,
            move_contents_to_parent,
            folders_deleted = outcome.folders_deleted,
            sources_deleted = outcome.sources_deleted,
            sources_moved = outcome.sources_moved,
            subfolders_moved = outcome.subfolders_moved,
            "Folder deleted"
        );

        Ok(DeleteFolderOutcome {
            message: format!("Folder '{}' deleted successfully", folder.name),
            moved_to_parent: move_contents_to_parent,
            folders_deleted: outcome.folders_deleted,
            sources_deleted: outcome.sources_deleted,
            sources_moved: outcome.sources_moved,
            subfolders_moved: outcome.subfolders_moved,
        })
    }

    /// Gets a folder with its immediate contents and path.
    pub async fn get_folder_contents(
        &self,
        folder_id: FolderId,
        include_sources: bool,
        include_subfolders: bool,
    ) -> Result<FolderContents, AppError> {
        let view = self.get_folder(folder_id).await?;

        let subfolders = if include_subfolders {
            self.list_folders(Some(folder_id), true).await?
        } else {
            Vec::new()
        };
        let sources = if include_sources {
            self.sources.list_in_folder(folder_id).await?
        } else {
            Vec::new()
        };
        let path = self.tree.get_path(folder_id).await?;

        Ok(FolderContents {
            view,
            subfolders,
            sources,
            path,
        })
    }

    async fn require_folder(&self, folder_id: FolderId) -> Result<Folder, AppError> {
        self.folders
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    async fn with_counts(&self, folder: Folder) -> Result<FolderView, AppError> {
        let stats = FolderStats {
            source_count: self.sources.count_in_folder(folder.id).await?,
            subfolder_count: self.folders.count_subfolders(folder.id).await?,
            total_sources: self.folders.count_total_sources(folder.id).await?,
        };
        Ok(FolderView::new(folder, stats))
    }

    /// Rejects self-parenting, missing targets, cycles, and depth overflow.
    /// The store repeats the cycle check atomically with the write.
    async fn ensure_can_reparent(
        &self,
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> Result<(), AppError> {
        let Some(parent_id) = new_parent_id else {
            return Ok(());
        };
        if parent_id == folder_id {
            return Err(AppError::validation("A folder cannot be moved into itself"));
        }
        if !self.folders.exists(parent_id).await? {
            return Err(AppError::not_found(format!(
                "Target folder {parent_id} does not exist"
            )));
        }

        match self.folders.check_reparent(folder_id, new_parent_id).await? {
            Ancestry::Clear => {}
            Ancestry::Cycle => {
                return Err(AppError::validation(
                    "Cannot move folder: would create circular reference",
                ));
            }
            Ancestry::DepthExceeded => {
                return Err(AppError::validation(format!(
                    "Cannot move folder: nesting exceeds {} levels",
                    self.config.max_depth
                )));
            }
        }

        let depth = self.folders.depth(parent_id).await?
            + 1
            + self.folders.subtree_height(folder_id).await?;
        self.ensure_depth(depth)
    }

    /// `depth` is the number of ancestors the deepest affected folder would have.
    fn ensure_depth(&self, depth: usize) -> Result<(), AppError> {
        if depth >= self.config.max_depth {
            return Err(AppError::validation(format!(
                "Folder nesting cannot exceed {} levels",
                self.config.max_depth
            )));
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
    use kbhub_entity::source::SourceRow;

    use super::*;

    struct Fixture {
        store: Arc<MemoryStore>,
        folders: FolderService,
        tree: Arc<TreeService>,
    }

    async fn fixture_with(config: FolderConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(store.clone());
        let cache = Arc::new(CacheManager::new(&CacheConfig::default()).await.unwrap());
        let tree = Arc::new(TreeService::new(
            stores.folders.clone(),
            stores.sources.clone(),
            cache,
            60,
        ));
        let folders = FolderService::new(stores.folders, stores.sources, tree.clone(), config);
        Fixture {
            store,
            folders,
            tree,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(FolderConfig::default()).await
    }

    fn input(name: &str, parent_id: Option<FolderId>) -> CreateFolderInput {
        CreateFolderInput {
            name: name.into(),
            parent_id,
            ..Default::default()
        }
    }

    fn seed_source(store: &MemoryStore, id: &str, folder_id: Option<FolderId>) {
        store
            .upsert_source(SourceRow {
                source_id: id.into(),
                title: None,
                source_url: None,
                source_display_name: None,
                folder_id,
                metadata: serde_json::json!({}),
                created_at: chrono::Utc::now(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_defaults_and_trims() {
        let fx = fixture().await;
        let view = fx
            .folders
            .create_folder(CreateFolderInput {
                name: "  Research ".into(),
                color: Some("#00ff41".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(view.folder.name, "Research");
        assert_eq!(view.folder.position, 0);
        assert_eq!(view.folder.metadata, serde_json::json!({}));
        assert_eq!(view.stats, FolderStats::default());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_and_missing_parent() {
        let fx = fixture().await;

        let err = fx.folders.create_folder(input("", None)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = fx
            .folders
            .create_folder(input("a/b", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = fx
            .folders
            .create_folder(input("child", Some(FolderId::new())))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_enforces_max_depth() {
        let fx = fixture_with(FolderConfig {
            max_depth: 3,
            ..Default::default()
        })
        .await;
        let a = fx.folders.create_folder(input("a", None)).await.unwrap();
        let b = fx.folders.create_folder(input("b", Some(a.id()))).await.unwrap();
        let c = fx.folders.create_folder(input("c", Some(b.id()))).await.unwrap();

        let err = fx
            .folders
            .create_folder(input("d", Some(c.id())))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_get_folder_reports_counts() {
        let fx = fixture().await;
        let parent = fx.folders.create_folder(input("parent", None)).await.unwrap();
        let child = fx
            .folders
            .create_folder(input("child", Some(parent.id())))
            .await
            .unwrap();
        seed_source(&fx.store, "s1", Some(parent.id()));
        seed_source(&fx.store, "s2", Some(child.id()));

        let view = fx.folders.get_folder(parent.id()).await.unwrap();
        assert_eq!(view.stats.source_count, 1);
        assert_eq!(view.stats.subfolder_count, 1);
        assert_eq!(view.stats.total_sources, 2);

        let err = fx.folders.get_folder(FolderId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_without_counts_reports_zero() {
        let fx = fixture().await;
        let parent = fx.folders.create_folder(input("p", None)).await.unwrap();
        seed_source(&fx.store, "s1", Some(parent.id()));

        let listed = fx.folders.list_folders(None, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stats.source_count, 0);

        let listed = fx.folders.list_folders(None, true).await.unwrap();
        assert_eq!(listed[0].stats.source_count, 1);
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let fx = fixture().await;
        let created = fx
            .folders
            .create_folder(CreateFolderInput {
                name: "notes".into(),
                description: Some("keep".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = fx
            .folders
            .update_folder(
                created.id(),
                UpdateFolderInput {
                    name: Some("Notes".into()),
                    position: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.folder.name, "Notes");
        assert_eq!(updated.folder.position, 4);
        assert_eq!(updated.folder.description.as_deref(), Some("keep"));

        let unchanged = fx
            .folders
            .update_folder(created.id(), UpdateFolderInput::default())
            .await
            .unwrap();
        assert_eq!(unchanged.folder.name, "Notes");
    }

    #[tokio::test]
    async fn test_update_with_parent_rejects_cycles() {
        let fx = fixture().await;
        let a = fx.folders.create_folder(input("a", None)).await.unwrap();
        let b = fx.folders.create_folder(input("b", Some(a.id()))).await.unwrap();

        let err = fx
            .folders
            .update_folder(
                a.id(),
                UpdateFolderInput {
                    parent_id: Some(b.id()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("circular"));
    }

    #[tokio::test]
    async fn test_move_folder_rules() {
        let fx = fixture().await;
        let a = fx.folders.create_folder(input("a", None)).await.unwrap();
        let b = fx.folders.create_folder(input("b", Some(a.id()))).await.unwrap();
        let c = fx.folders.create_folder(input("c", None)).await.unwrap();

        let err = fx.folders.move_folder(a.id(), Some(a.id())).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = fx.folders.move_folder(a.id(), Some(b.id())).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = fx
            .folders
            .move_folder(a.id(), Some(FolderId::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let moved = fx.folders.move_folder(a.id(), Some(c.id())).await.unwrap();
        assert_eq!(moved.parent_id(), Some(c.id()));

        let rooted = fx.folders.move_folder(b.id(), None).await.unwrap();
        assert!(rooted.folder.is_root());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_swaps_never_form_a_cycle() {
        let fx = fixture().await;
        for _ in 0..50 {
            let a = fx.folders.create_folder(input("a", None)).await.unwrap().id();
            let b = fx.folders.create_folder(input("b", None)).await.unwrap().id();

            let first = tokio::spawn({
                let folders = fx.folders.clone();
                async move { folders.move_folder(a, Some(b)).await }
            });
            let second = tokio::spawn({
                let folders = fx.folders.clone();
                async move { folders.move_folder(b, Some(a)).await }
            });
            let results = [first.await.unwrap(), second.await.unwrap()];

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            let a_parent = fx.store.find_by_id(a).await.unwrap().unwrap().parent_id;
            let b_parent = fx.store.find_by_id(b).await.unwrap().unwrap().parent_id;
            assert!(a_parent.is_none() || b_parent.is_none());
        }
    }

    #[tokio::test]
    async fn test_update_with_rejected_move_leaves_name_unchanged() {
        let fx = fixture().await;
        let a = fx.folders.create_folder(input("a", None)).await.unwrap();
        let b = fx.folders.create_folder(input("b", Some(a.id()))).await.unwrap();
        let c = fx.folders.create_folder(input("c", None)).await.unwrap();

        let err = fx
            .folders
            .update_folder(
                a.id(),
                UpdateFolderInput {
                    name: Some("renamed".into()),
                    parent_id: Some(b.id()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(fx.folders.get_folder(a.id()).await.unwrap().folder.name, "a");

        let updated = fx
            .folders
            .update_folder(
                a.id(),
                UpdateFolderInput {
                    name: Some("renamed".into()),
                    parent_id: Some(c.id()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.folder.name, "renamed");
        assert_eq!(updated.parent_id(), Some(c.id()));
    }

    #[tokio::test]
    async fn test_delete_moves_contents_to_parent() {
        let fx = fixture().await;
        let top = fx.folders.create_folder(input("top", None)).await.unwrap();
        let mid = fx.folders.create_folder(input("mid", Some(top.id()))).await.unwrap();
        let leaf = fx.folders.create_folder(input("leaf", Some(mid.id()))).await.unwrap();
        seed_source(&fx.store, "s1", Some(mid.id()));

        let outcome = fx.folders.delete_folder(mid.id(), true).await.unwrap();
        assert!(outcome.moved_to_parent);
        assert_eq!(outcome.subfolders_moved, 1);
        assert_eq!(outcome.sources_moved, 1);
        assert_eq!(outcome.message, "Folder 'mid' deleted successfully");

        let leaf_view = fx.folders.get_folder(leaf.id()).await.unwrap();
        assert_eq!(leaf_view.parent_id(), Some(top.id()));
        let top_view = fx.folders.get_folder(top.id()).await.unwrap();
        assert_eq!(top_view.stats.source_count, 1);
    }

    #[tokio::test]
    async fn test_delete_recursive_removes_everything_below() {
        let fx = fixture().await;
        let top = fx.folders.create_folder(input("top", None)).await.unwrap();
        let leaf = fx.folders.create_folder(input("leaf", Some(top.id()))).await.unwrap();
        seed_source(&fx.store, "s1", Some(leaf.id()));
        seed_source(&fx.store, "s2", None);

        let outcome = fx.folders.delete_folder(top.id(), false).await.unwrap();
        assert!(!outcome.moved_to_parent);
        assert_eq!(outcome.folders_deleted, 2);
        assert_eq!(outcome.sources_deleted, 1);
        assert!(fx.folders.get_folder(leaf.id()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_contents_include_path_and_sources() {
        let fx = fixture().await;
        let top = fx.folders.create_folder(input("top", None)).await.unwrap();
        let mid = fx.folders.create_folder(input("mid", Some(top.id()))).await.unwrap();
        fx.folders.create_folder(input("leaf", Some(mid.id()))).await.unwrap();
        seed_source(&fx.store, "s1", Some(mid.id()));

        let contents = fx
            .folders
            .get_folder_contents(mid.id(), true, true)
            .await
            .unwrap();
        assert_eq!(contents.path, vec!["top", "mid"]);
        assert_eq!(contents.subfolders.len(), 1);
        assert_eq!(contents.sources.len(), 1);

        let bare = fx
            .folders
            .get_folder_contents(mid.id(), false, false)
            .await
            .unwrap();
        assert!(bare.subfolders.is_empty());
        assert!(bare.sources.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cached_tree() {
        let fx = fixture().await;
        fx.folders.create_folder(input("one", None)).await.unwrap();
        assert_eq!(fx.tree.get_tree(false).await.unwrap().total_folders, 1);

        fx.folders.create_folder(input("two", None)).await.unwrap();
        assert_eq!(fx.tree.get_tree(false).await.unwrap().total_folders, 2);
    }
}
