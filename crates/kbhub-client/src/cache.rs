//! Cached folder views and the patches applied to them optimistically.
//!
//! The cache holds at most one tree and any number of list views keyed by
//! parent (`None` is the root list). Every patch keeps the derived counts
//! of the tree and of the lists in step, so a view rendered from the
//! cache right after a mutation matches what the server will report.

use std::collections::HashMap;

use kbhub_core::error::AppError;
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::hierarchy::{
    count_nodes, find_node, find_node_mut, remove_node, sort_siblings,
};
use kbhub_entity::folder::{
    Ancestry, FolderChanges, FolderIndex, FolderStats, FolderTree, FolderTreeNode, FolderView,
};
use kbhub_entity::source::SourceInFolder;

/// A point-in-time copy of the cache, used to roll back failed mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderCacheSnapshot(FolderCache);

/// Cached tree and list views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderCache {
    tree: Option<FolderTree>,
    tree_includes_sources: bool,
    lists: HashMap<Option<FolderId>, Vec<FolderView>>,
}

impl FolderCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached tree, if any.
    pub fn tree(&self) -> Option<&FolderTree> {
        self.tree.as_ref()
    }

    /// Whether the cached tree was loaded with sources.
    pub fn tree_includes_sources(&self) -> bool {
        self.tree_includes_sources
    }

    /// Replace the cached tree.
    pub fn set_tree(&mut self, tree: FolderTree, includes_sources: bool) {
        self.tree = Some(tree);
        self.tree_includes_sources = includes_sources;
    }

    /// The cached list of `parent`'s children.
    pub fn list(&self, parent: Option<FolderId>) -> Option<&[FolderView]> {
        self.lists.get(&parent).map(Vec::as_slice)
    }

    /// Parents whose child lists are cached.
    pub fn cached_lists(&self) -> Vec<Option<FolderId>> {
        self.lists.keys().copied().collect()
    }

    /// Replace the cached list of `parent`'s children.
    pub fn set_list(&mut self, parent: Option<FolderId>, mut folders: Vec<FolderView>) {
        sort_views(&mut folders);
        self.lists.insert(parent, folders);
    }

    /// Drop every cached view.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The cached view of a folder, from the tree or any list.
    pub fn folder(&self, id: FolderId) -> Option<&FolderView> {
        self.tree
            .as_ref()
            .and_then(|t| find_node(&t.tree, id))
            .map(|n| &n.view)
            .or_else(|| self.lists.values().flatten().find(|v| v.id() == id))
    }

    /// Parent/child index over everything cached.
    pub fn index(&self) -> FolderIndex {
        match &self.tree {
            Some(tree) => FolderIndex::from_tree(&tree.tree),
            None => FolderIndex::from_folders(self.lists.values().flatten().map(|v| &v.folder)),
        }
    }

    /// Copy the current state.
    pub fn snapshot(&self) -> FolderCacheSnapshot {
        FolderCacheSnapshot(self.clone())
    }

    /// Return to a previously taken snapshot.
    pub fn restore(&mut self, snapshot: FolderCacheSnapshot) {
        *self = snapshot.0;
    }

    /// Add a newly created folder to the tree and to its parent's list.
    ///
    /// A folder that is already cached is left alone.
    pub fn apply_create(&mut self, view: FolderView) {
        let id = view.id();
        if self.folder(id).is_some() {
            return;
        }
        let parent = view.parent_id();

        if let Some(tree) = &mut self.tree {
            attach(&mut tree.tree, FolderTreeNode::leaf(view.clone()));
            tree.total_folders += 1;
        }
        if let Some(list) = self.lists.get_mut(&parent) {
            list.push(view);
            sort_views(list);
        }
        if let Some(parent) = parent {
            self.adjust(parent, |s| s.subfolder_count += 1);
        }
    }

    /// Remove a folder.
    ///
    /// With `move_contents_to_parent` its subfolders and sources are
    /// reattached to its parent; otherwise the whole subtree goes and its
    /// sources are subtracted from every ancestor. Returns whether the
    /// folder was cached.
    pub fn apply_delete(&mut self, id: FolderId, move_contents_to_parent: bool) -> bool {
        let Some(existing) = self.folder(id).cloned() else {
            return false;
        };
        let parent = existing.parent_id();
        let index = self.index();
        let ancestors = index.ancestors(id);
        let descendants = index.descendants(id);
        let stats = existing.stats;

        let mut orphans: Vec<FolderView> = self.lists.remove(&Some(id)).unwrap_or_default();

        if let Some(tree) = &mut self.tree
            && let Some(node) = remove_node(&mut tree.tree, id)
        {
            if move_contents_to_parent {
                tree.total_folders -= 1;
                let FolderTreeNode {
                    children, sources, ..
                } = node;
                let sources: Vec<SourceInFolder> = sources
                    .into_iter()
                    .map(|mut s| {
                        s.folder_id = parent;
                        s
                    })
                    .collect();
                orphans = children.iter().map(|c| c.view.clone()).collect();
                for mut child in children {
                    child.view.folder.parent_id = parent;
                    attach(&mut tree.tree, child);
                }
                if let Some(parent) = parent
                    && let Some(parent_node) = find_node_mut(&mut tree.tree, parent)
                {
                    parent_node.sources.extend(sources);
                    sort_sources(&mut parent_node.sources);
                }
            } else {
                tree.total_folders -= count_nodes(std::slice::from_ref(&node)) as i64;
                tree.total_sources -= stats.total_sources;
            }
        }

        if let Some(list) = self.lists.get_mut(&parent) {
            list.retain(|v| v.id() != id);
        }

        if move_contents_to_parent {
            for orphan in &mut orphans {
                orphan.folder.parent_id = parent;
            }
            if let Some(list) = self.lists.get_mut(&parent) {
                list.extend(orphans);
                sort_views(list);
            }
            if let Some(parent) = parent {
                let moved_folders = stats.subfolder_count;
                self.adjust(parent, |s| {
                    s.subfolder_count += moved_folders - 1;
                    s.source_count += stats.source_count;
                });
            }
        } else {
            for folder in descendants {
                self.lists.remove(&Some(folder));
            }
            if let Some(parent) = parent {
                self.adjust(parent, |s| s.subfolder_count -= 1);
            }
            for ancestor in ancestors {
                self.adjust(ancestor, |s| s.total_sources -= stats.total_sources);
            }
        }
        true
    }

    /// Move a folder under `new_parent` (root when `None`).
    ///
    /// Rejects moving a folder into itself or into one of its descendants.
    pub fn apply_move(&mut self, id: FolderId, new_parent: Option<FolderId>) -> AppResult<()> {
        if new_parent == Some(id) {
            return Err(AppError::validation("A folder cannot be moved into itself"));
        }
        let Some(existing) = self.folder(id).cloned() else {
            return Err(AppError::not_found(format!("Folder {id} is not cached")));
        };
        let index = self.index();
        match index.check_reparent(id, new_parent) {
            Ancestry::Clear => {}
            Ancestry::Cycle => {
                return Err(AppError::validation(
                    "Cannot move a folder into one of its own subfolders",
                ));
            }
            Ancestry::DepthExceeded => {
                return Err(AppError::validation("Folder hierarchy is too deep"));
            }
        }

        let old_parent = existing.parent_id();
        if old_parent == new_parent {
            return Ok(());
        }
        let carried = existing.stats.total_sources;
        let old_chain = index.ancestors(id);
        let new_chain: Vec<FolderId> = new_parent
            .map(|p| {
                let mut chain = vec![p];
                chain.extend(index.ancestors(p));
                chain
            })
            .unwrap_or_default();

        if let Some(tree) = &mut self.tree
            && let Some(mut node) = remove_node(&mut tree.tree, id)
        {
            node.view.folder.parent_id = new_parent;
            attach(&mut tree.tree, node);
        }

        let mut moved = existing;
        moved.folder.parent_id = new_parent;
        if let Some(list) = self.lists.get_mut(&old_parent) {
            list.retain(|v| v.id() != id);
        }
        if let Some(list) = self.lists.get_mut(&new_parent) {
            list.push(moved);
            sort_views(list);
        }

        if let Some(old_parent) = old_parent {
            self.adjust(old_parent, |s| s.subfolder_count -= 1);
        }
        if let Some(new_parent) = new_parent {
            self.adjust(new_parent, |s| s.subfolder_count += 1);
        }
        for ancestor in old_chain {
            self.adjust(ancestor, |s| s.total_sources -= carried);
        }
        for ancestor in new_chain {
            self.adjust(ancestor, |s| s.total_sources += carried);
        }
        Ok(())
    }

    /// Apply attribute changes to every cached copy of a folder.
    pub fn apply_update(&mut self, id: FolderId, changes: &FolderChanges) {
        if let Some(tree) = &mut self.tree
            && let Some(node) = find_node_mut(&mut tree.tree, id)
        {
            changes.apply_to(&mut node.view.folder);
            resort_tree(&mut tree.tree);
        }
        for list in self.lists.values_mut() {
            if let Some(view) = list.iter_mut().find(|v| v.id() == id) {
                changes.apply_to(&mut view.folder);
                sort_views(list);
            }
        }
    }

    /// Relocate sources to `folder` (root when `None`).
    ///
    /// A source's current folder is the tree node listing it, or the root
    /// when no node does. Counts are therefore exact only when the tree
    /// was loaded with sources. Returns how many sources changed folder.
    pub fn apply_source_move(&mut self, source_ids: &[String], folder: Option<FolderId>) -> usize {
        let index = self.index();
        let chain = |start: Option<FolderId>| -> Vec<FolderId> {
            start
                .map(|f| {
                    let mut chain = vec![f];
                    chain.extend(index.ancestors(f));
                    chain
                })
                .unwrap_or_default()
        };

        let mut moved = 0;
        for source_id in source_ids {
            let (from, detached) = self.detach_source(source_id);
            if from == folder {
                if let Some(source) = detached {
                    self.attach_source(source, folder);
                }
                continue;
            }
            moved += 1;

            if let Some(from) = from {
                self.adjust(from, |s| s.source_count -= 1);
            }
            for ancestor in chain(from) {
                self.adjust(ancestor, |s| s.total_sources -= 1);
            }
            if let Some(to) = folder {
                self.adjust(to, |s| s.source_count += 1);
            }
            for ancestor in chain(folder) {
                self.adjust(ancestor, |s| s.total_sources += 1);
            }

            if let Some(mut source) = detached {
                source.folder_id = folder;
                self.attach_source(source, folder);
            }
        }
        moved
    }

    /// Swap an optimistic placeholder for the server's record.
    pub fn replace_folder(&mut self, temp_id: FolderId, view: FolderView) {
        let real_id = view.id();
        if let Some(tree) = &mut self.tree {
            if let Some(node) = find_node_mut(&mut tree.tree, temp_id) {
                node.view = view.clone();
            }
            reparent_children(&mut tree.tree, temp_id, real_id);
            resort_tree(&mut tree.tree);
        }
        for list in self.lists.values_mut() {
            let mut touched = false;
            for entry in list.iter_mut() {
                if entry.id() == temp_id {
                    *entry = view.clone();
                    touched = true;
                } else if entry.parent_id() == Some(temp_id) {
                    entry.folder.parent_id = Some(real_id);
                }
            }
            if touched {
                sort_views(list);
            }
        }
        if let Some(children) = self.lists.remove(&Some(temp_id)) {
            self.lists.insert(Some(real_id), children);
        }
    }

    /// Patch the counts of every cached copy of `id`.
    fn adjust(&mut self, id: FolderId, patch: impl Fn(&mut FolderStats)) {
        if let Some(tree) = &mut self.tree
            && let Some(node) = find_node_mut(&mut tree.tree, id)
        {
            patch(&mut node.view.stats);
        }
        for view in self.lists.values_mut().flatten() {
            if view.id() == id {
                patch(&mut view.stats);
            }
        }
    }

    fn detach_source(&mut self, source_id: &str) -> (Option<FolderId>, Option<SourceInFolder>) {
        let Some(tree) = &mut self.tree else {
            return (None, None);
        };
        detach_source_from(&mut tree.tree, source_id)
            .map(|(folder, source)| (Some(folder), Some(source)))
            .unwrap_or((None, None))
    }

    fn attach_source(&mut self, source: SourceInFolder, folder: Option<FolderId>) {
        // Root sources are not part of the tree.
        let Some(folder) = folder else {
            return;
        };
        if let Some(tree) = &mut self.tree
            && let Some(node) = find_node_mut(&mut tree.tree, folder)
        {
            node.sources.push(source);
            sort_sources(&mut node.sources);
        }
    }
}

/// Insert a node under its parent, or as a root when the parent is absent.
fn attach(roots: &mut Vec<FolderTreeNode>, node: FolderTreeNode) {
    match node.view.parent_id() {
        Some(parent) => match find_node_mut(roots, parent) {
            Some(parent_node) => {
                parent_node.children.push(node);
                sort_siblings(&mut parent_node.children);
            }
            None => {
                roots.push(node);
                sort_siblings(roots);
            }
        },
        None => {
            roots.push(node);
            sort_siblings(roots);
        }
    }
}

fn detach_source_from(
    nodes: &mut [FolderTreeNode],
    source_id: &str,
) -> Option<(FolderId, SourceInFolder)> {
    for node in nodes {
        if let Some(pos) = node.sources.iter().position(|s| s.source_id == source_id) {
            return Some((node.view.id(), node.sources.remove(pos)));
        }
        if let Some(found) = detach_source_from(&mut node.children, source_id) {
            return Some(found);
        }
    }
    None
}

fn reparent_children(nodes: &mut [FolderTreeNode], from: FolderId, to: FolderId) {
    for node in nodes {
        if node.view.parent_id() == Some(from) {
            node.view.folder.parent_id = Some(to);
        }
        reparent_children(&mut node.children, from, to);
    }
}

fn resort_tree(nodes: &mut [FolderTreeNode]) {
    sort_siblings(nodes);
    for node in nodes {
        resort_tree(&mut node.children);
    }
}

fn sort_views(views: &mut [FolderView]) {
    views.sort_by(|a, b| a.folder.sort_key().cmp(&b.folder.sort_key()));
}

/// Newest first.
fn sort_sources(sources: &mut [SourceInFolder]) {
    sources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
