//! In-process folder and source store.
//!
//! Mirrors the Postgres schema rules (parent foreign key, no self
//! parenting, cascading deletes) so services behave the same on both
//! backends. Used by `database.backend = "memory"` and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use kbhub_core::error::AppError;
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::{Ancestry, CreateFolder, Folder, FolderChanges, FolderIndex};
use kbhub_entity::source::{SourceInFolder, SourceRow};

use crate::store::{DeleteMode, DeleteOutcome, FolderStore, SourceStore, ensure_clear};

#[derive(Debug, Default)]
struct Inner {
    folders: HashMap<FolderId, Folder>,
    sources: HashMap<String, SourceRow>,
}

impl Inner {
    fn index(&self) -> FolderIndex {
        FolderIndex::from_folders(self.folders.values())
    }

    fn require_folder(&self, id: FolderId) -> AppResult<()> {
        if self.folders.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Folder {id} not found")))
        }
    }
}

/// Folder and source store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AppError::internal("Memory store lock poisoned"))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AppError::internal("Memory store lock poisoned"))
    }

    /// Insert or replace a source row.
    ///
    /// Sources are owned by the ingestion side of the application; this
    /// entry point exists for seeding and tests.
    pub fn upsert_source(&self, row: SourceRow) -> AppResult<()> {
        let mut inner = self.write()?;
        if let Some(folder_id) = row.folder_id {
            inner.require_folder(folder_id)?;
        }
        inner.sources.insert(row.source_id.clone(), row);
        Ok(())
    }
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.read()?.folders.get(&id).cloned())
    }

    async fn exists(&self, id: FolderId) -> AppResult<bool> {
        Ok(self.read()?.folders.contains_key(&id))
    }

    async fn list_by_parent(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>> {
        let inner = self.read()?;
        let mut folders: Vec<Folder> = inner
            .folders
            .values()
            .filter(|f| f.parent_id == parent)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(folders)
    }

    async fn list_all(&self) -> AppResult<Vec<Folder>> {
        Ok(self.read()?.folders.values().cloned().collect())
    }

    async fn insert(&self, data: &CreateFolder) -> AppResult<Folder> {
        let mut inner = self.write()?;
        if let Some(parent) = data.parent_id
            && !inner.folders.contains_key(&parent)
        {
            return Err(AppError::not_found("Parent folder does not exist"));
        }

        let now = Utc::now();
        let folder = Folder {
            id: FolderId::new(),
            name: data.name.clone(),
            description: data.description.clone(),
            color: data.color.clone(),
            icon: data.icon.clone(),
            parent_id: data.parent_id,
            position: data.position,
            metadata: data.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn update(&self, id: FolderId, changes: &FolderChanges) -> AppResult<Folder> {
        let mut inner = self.write()?;
        let folder = inner
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        changes.apply_to(folder);
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }

    async fn reparent(
        &self,
        id: FolderId,
        parent: Option<FolderId>,
        changes: &FolderChanges,
    ) -> AppResult<Folder> {
        let mut inner = self.write()?;
        inner.require_folder(id)?;
        if parent == Some(id) {
            return Err(AppError::validation("A folder cannot be its own parent"));
        }
        if let Some(parent) = parent
            && !inner.folders.contains_key(&parent)
        {
            return Err(AppError::not_found("Parent folder does not exist"));
        }
        ensure_clear(inner.index().check_reparent(id, parent))?;

        let folder = inner
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        changes.apply_to(folder);
        folder.parent_id = parent;
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }

    async fn check_reparent(
        &self,
        folder: FolderId,
        new_parent: Option<FolderId>,
    ) -> AppResult<Ancestry> {
        Ok(self.read()?.index().check_reparent(folder, new_parent))
    }

    async fn path_names(&self, id: FolderId) -> AppResult<Vec<String>> {
        Ok(self.read()?.index().path_names(id))
    }

    async fn depth(&self, id: FolderId) -> AppResult<usize> {
        Ok(self.read()?.index().depth(id))
    }

    async fn subtree_height(&self, id: FolderId) -> AppResult<usize> {
        Ok(self.read()?.index().subtree_height(id))
    }

    async fn count_subfolders(&self, id: FolderId) -> AppResult<i64> {
        let inner = self.read()?;
        Ok(inner
            .folders
            .values()
            .filter(|f| f.parent_id == Some(id))
            .count() as i64)
    }

    async fn subfolder_counts(&self) -> AppResult<HashMap<FolderId, i64>> {
        let inner = self.read()?;
        let mut counts = HashMap::new();
        for parent in inner.folders.values().filter_map(|f| f.parent_id) {
            *counts.entry(parent).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_total_sources(&self, id: FolderId) -> AppResult<i64> {
        let inner = self.read()?;
        if !inner.folders.contains_key(&id) {
            return Ok(0);
        }
        let mut subtree: HashSet<FolderId> = inner.index().descendants(id).into_iter().collect();
        subtree.insert(id);
        Ok(inner
            .sources
            .values()
            .filter(|s| s.folder_id.is_some_and(|f| subtree.contains(&f)))
            .count() as i64)
    }

    async fn delete(&self, id: FolderId, mode: DeleteMode) -> AppResult<DeleteOutcome> {
        let mut inner = self.write()?;
        let parent = inner
            .folders
            .get(&id)
            .map(|f| f.parent_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let mut outcome = DeleteOutcome::default();
        match mode {
            DeleteMode::MoveContentsToParent => {
                for source in inner.sources.values_mut() {
                    if source.folder_id == Some(id) {
                        source.folder_id = parent;
                        outcome.sources_moved += 1;
                    }
                }
                let now = Utc::now();
                for folder in inner.folders.values_mut() {
                    if folder.parent_id == Some(id) {
                        folder.parent_id = parent;
                        folder.updated_at = now;
                        outcome.subfolders_moved += 1;
                    }
                }
                inner.folders.remove(&id);
                outcome.folders_deleted = 1;
            }
            DeleteMode::Recursive => {
                let mut subtree: HashSet<FolderId> =
                    inner.index().descendants(id).into_iter().collect();
                subtree.insert(id);

                let before = inner.sources.len();
                inner
                    .sources
                    .retain(|_, s| !s.folder_id.is_some_and(|f| subtree.contains(&f)));
                outcome.sources_deleted = (before - inner.sources.len()) as u64;

                inner.folders.retain(|fid, _| !subtree.contains(fid));
                outcome.folders_deleted = subtree.len() as u64;
            }
        }
        Ok(outcome)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.read().is_ok())
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn list_in_folder(&self, folder: FolderId) -> AppResult<Vec<SourceInFolder>> {
        let inner = self.read()?;
        let mut rows: Vec<&SourceRow> = inner
            .sources
            .values()
            .filter(|s| s.folder_id == Some(folder))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().cloned().map(SourceInFolder::from).collect())
    }

    async fn count_in_folder(&self, folder: FolderId) -> AppResult<i64> {
        let inner = self.read()?;
        Ok(inner
            .sources
            .values()
            .filter(|s| s.folder_id == Some(folder))
            .count() as i64)
    }

    async fn counts_by_folder(&self) -> AppResult<HashMap<FolderId, i64>> {
        let inner = self.read()?;
        let mut counts = HashMap::new();
        for folder in inner.sources.values().filter_map(|s| s.folder_id) {
            *counts.entry(folder).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_all(&self) -> AppResult<i64> {
        Ok(self.read()?.sources.len() as i64)
    }

    async fn list_placed(&self) -> AppResult<Vec<SourceInFolder>> {
        let inner = self.read()?;
        Ok(inner
            .sources
            .values()
            .filter(|s| s.folder_id.is_some())
            .cloned()
            .map(SourceInFolder::from)
            .collect())
    }

    async fn exists(&self, source_id: &str) -> AppResult<bool> {
        Ok(self.read()?.sources.contains_key(source_id))
    }

    async fn move_to_folder(
        &self,
        source_ids: &[String],
        folder: Option<FolderId>,
    ) -> AppResult<u64> {
        let mut inner = self.write()?;
        if let Some(target) = folder {
            inner.require_folder(target)?;
        }
        let mut moved = 0;
        for id in source_ids {
            if let Some(source) = inner.sources.get_mut(id) {
                source.folder_id = folder;
                moved += 1;
            }
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use kbhub_core::error::ErrorKind;

    use super::*;

    fn create(name: &str, parent_id: Option<FolderId>) -> CreateFolder {
        CreateFolder {
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            parent_id,
            position: 0,
            metadata: serde_json::json!({}),
        }
    }

    fn source(id: &str, folder_id: Option<FolderId>, age_minutes: i64) -> SourceRow {
        SourceRow {
            source_id: id.into(),
            title: Some(id.to_uppercase()),
            source_url: None,
            source_display_name: None,
            folder_id,
            metadata: serde_json::json!({ "tags": ["t"] }),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    /// root
    /// └── mid (2 sources)
    ///     └── leaf (1 source)
    async fn seeded() -> (MemoryStore, FolderId, FolderId, FolderId) {
        let store = MemoryStore::new();
        let root = store.insert(&create("root", None)).await.unwrap();
        let mid = store.insert(&create("mid", Some(root.id))).await.unwrap();
        let leaf = store.insert(&create("leaf", Some(mid.id))).await.unwrap();
        store.upsert_source(source("a", Some(mid.id), 10)).unwrap();
        store.upsert_source(source("b", Some(mid.id), 1)).unwrap();
        store.upsert_source(source("c", Some(leaf.id), 5)).unwrap();
        store.upsert_source(source("loose", None, 5)).unwrap();
        (store, root.id, mid.id, leaf.id)
    }

    #[tokio::test]
    async fn test_insert_requires_existing_parent() {
        let store = MemoryStore::new();
        let err = store
            .insert(&create("orphan", Some(FolderId::new())))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_by_parent_orders_by_position_then_name() {
        let store = MemoryStore::new();
        let mut b = create("b", None);
        b.position = 1;
        store.insert(&b).await.unwrap();
        store.insert(&create("z", None)).await.unwrap();
        store.insert(&create("a", None)).await.unwrap();

        let names: Vec<String> = store
            .list_by_parent(None)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a", "z", "b"]);
    }

    #[tokio::test]
    async fn test_counts_and_paths() {
        let (store, root, mid, leaf) = seeded().await;

        assert_eq!(store.count_total_sources(root).await.unwrap(), 3);
        assert_eq!(store.count_total_sources(mid).await.unwrap(), 3);
        assert_eq!(store.count_in_folder(mid).await.unwrap(), 2);
        assert_eq!(store.count_subfolders(root).await.unwrap(), 1);
        assert_eq!(store.count_all().await.unwrap(), 4);
        assert_eq!(
            store.path_names(leaf).await.unwrap(),
            vec!["root", "mid", "leaf"]
        );
        assert_eq!(store.depth(leaf).await.unwrap(), 2);
        assert_eq!(store.subtree_height(root).await.unwrap(), 2);

        let listed: Vec<String> = store
            .list_in_folder(mid)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.source_id)
            .collect();
        assert_eq!(listed, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_check_reparent_and_reparent() {
        let (store, root, _mid, leaf) = seeded().await;

        assert_eq!(
            store.check_reparent(root, Some(leaf)).await.unwrap(),
            Ancestry::Cycle
        );
        assert_eq!(
            store.check_reparent(leaf, None).await.unwrap(),
            Ancestry::Clear
        );
        let err = store
            .reparent(root, Some(root), &FolderChanges::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let moved = store
            .reparent(leaf, None, &FolderChanges::default())
            .await
            .unwrap();
        assert!(moved.is_root());
    }

    #[tokio::test]
    async fn test_reparent_rechecks_ancestry_under_the_lock() {
        let store = MemoryStore::new();
        let a = store.insert(&create("a", None)).await.unwrap().id;
        let b = store.insert(&create("b", None)).await.unwrap().id;

        // Both moves would pass a check made before either write.
        assert_eq!(store.check_reparent(a, Some(b)).await.unwrap(), Ancestry::Clear);
        assert_eq!(store.check_reparent(b, Some(a)).await.unwrap(), Ancestry::Clear);

        store
            .reparent(a, Some(b), &FolderChanges::default())
            .await
            .unwrap();
        let err = store
            .reparent(b, Some(a), &FolderChanges::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("circular"));
        assert!(store.find_by_id(b).await.unwrap().unwrap().is_root());
    }

    #[tokio::test]
    async fn test_rejected_reparent_keeps_attribute_changes_out() {
        let (store, _root, mid, leaf) = seeded().await;
        let rename = FolderChanges {
            name: Some("renamed".into()),
            ..Default::default()
        };

        let err = store
            .reparent(mid, Some(FolderId::new()), &rename)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = store.reparent(mid, Some(leaf), &rename).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(store.find_by_id(mid).await.unwrap().unwrap().name, "mid");

        let moved = store.reparent(mid, None, &rename).await.unwrap();
        assert_eq!(moved.name, "renamed");
        assert!(moved.is_root());
    }

    #[tokio::test]
    async fn test_delete_moving_contents_to_parent() {
        let (store, root, mid, leaf) = seeded().await;

        let outcome = store
            .delete(mid, DeleteMode::MoveContentsToParent)
            .await
            .unwrap();
        assert_eq!(outcome.folders_deleted, 1);
        assert_eq!(outcome.sources_moved, 2);
        assert_eq!(outcome.subfolders_moved, 1);

        assert!(!FolderStore::exists(&store, mid).await.unwrap());
        let leaf_row = store.find_by_id(leaf).await.unwrap().unwrap();
        assert_eq!(leaf_row.parent_id, Some(root));
        assert_eq!(store.count_in_folder(root).await.unwrap(), 2);
        assert_eq!(store.count_total_sources(root).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_recursive_removes_subtree_and_sources() {
        let (store, root, mid, leaf) = seeded().await;

        let outcome = store.delete(mid, DeleteMode::Recursive).await.unwrap();
        assert_eq!(outcome.folders_deleted, 2);
        assert_eq!(outcome.sources_deleted, 3);

        assert!(!FolderStore::exists(&store, leaf).await.unwrap());
        assert!(FolderStore::exists(&store, root).await.unwrap());
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_move_sources_requires_target_and_counts_known_ids() {
        let (store, root, _mid, _leaf) = seeded().await;

        let moved = store
            .move_to_folder(&["a".into(), "ghost".into(), "loose".into()], Some(root))
            .await
            .unwrap();
        assert_eq!(moved, 2);
        assert_eq!(store.count_in_folder(root).await.unwrap(), 2);

        let err = store
            .move_to_folder(&["a".into()], Some(FolderId::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
