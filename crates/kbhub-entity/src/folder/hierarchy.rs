//! Tree utilities over the adjacency-list folder hierarchy.
//!
//! Everything here is synchronous and side-effect free. The database
//! memory backend, the services, and the client cache all use the same
//! walks so that cycle and depth rules agree everywhere.

use std::collections::{HashMap, HashSet, VecDeque};

use kbhub_core::config::FolderConfig;
use kbhub_core::types::FolderId;

use super::model::{Folder, FolderStats, FolderView};
use super::tree::FolderTreeNode;
use crate::source::SourceInFolder;

/// Maximum number of parent hops any ancestor walk will take.
pub const MAX_TREE_DEPTH: usize = FolderConfig::DEPTH_LIMIT;

/// Result of checking a prospective reparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestry {
    /// The folder may be placed under the new parent.
    Clear,
    /// The new parent is the folder itself or one of its descendants.
    Cycle,
    /// The walk from the new parent exceeded [`MAX_TREE_DEPTH`].
    DepthExceeded,
}

/// Parent/child lookup tables built from a flat folder list or a tree.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    parents: HashMap<FolderId, Option<FolderId>>,
    names: HashMap<FolderId, String>,
    children: HashMap<FolderId, Vec<FolderId>>,
}

impl FolderIndex {
    /// Index a flat list of folders.
    pub fn from_folders<'a>(folders: impl IntoIterator<Item = &'a Folder>) -> Self {
        let mut index = Self::default();
        for folder in folders {
            index.insert(folder.id, folder.parent_id, &folder.name);
        }
        index
    }

    /// Index every node of a tree.
    pub fn from_tree(nodes: &[FolderTreeNode]) -> Self {
        let mut index = Self::default();
        let mut stack: Vec<&FolderTreeNode> = nodes.iter().collect();
        while let Some(node) = stack.pop() {
            index.insert(node.view.id(), node.view.parent_id(), &node.view.folder.name);
            stack.extend(node.children.iter());
        }
        index
    }

    fn insert(&mut self, id: FolderId, parent_id: Option<FolderId>, name: &str) {
        self.parents.insert(id, parent_id);
        self.names.insert(id, name.to_string());
        if let Some(parent) = parent_id {
            self.children.entry(parent).or_default().push(id);
        }
    }

    /// Whether the folder is known to the index.
    pub fn contains(&self, id: FolderId) -> bool {
        self.parents.contains_key(&id)
    }

    /// Number of indexed folders.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The parent of a folder, `None` for roots and unknown folders.
    pub fn parent_of(&self, id: FolderId) -> Option<FolderId> {
        self.parents.get(&id).copied().flatten()
    }

    /// Ancestors of a folder, nearest first.
    ///
    /// The walk stops at a root, at an unknown parent, on a repeated
    /// folder, or after [`MAX_TREE_DEPTH`] hops.
    pub fn ancestors(&self, id: FolderId) -> Vec<FolderId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if result.len() >= MAX_TREE_DEPTH || !seen.insert(parent) {
                break;
            }
            result.push(parent);
            current = self.parent_of(parent);
        }
        result
    }

    /// Folder names from the root down to `id` (inclusive).
    pub fn path_names(&self, id: FolderId) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain.push(id);
        chain
            .into_iter()
            .filter_map(|f| self.names.get(&f).cloned())
            .collect()
    }

    /// Number of ancestors (0 for a root folder).
    pub fn depth(&self, id: FolderId) -> usize {
        self.ancestors(id).len()
    }

    /// Every descendant of `id`, breadth first, excluding `id` itself.
    pub fn descendants(&self, id: FolderId) -> Vec<FolderId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for &child in self.children.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    result.push(child);
                    queue.push_back(child);
                }
            }
        }
        result
    }

    /// Immediate children of `id`.
    pub fn children_of(&self, id: FolderId) -> &[FolderId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Height of the subtree rooted at `id` (0 for a leaf).
    pub fn subtree_height(&self, id: FolderId) -> usize {
        let mut height = 0;
        let mut level = vec![id];
        let mut seen = HashSet::from([id]);
        loop {
            let next: Vec<FolderId> = level
                .iter()
                .flat_map(|f| self.children_of(*f).iter().copied())
                .filter(|c| seen.insert(*c))
                .collect();
            if next.is_empty() {
                return height;
            }
            height += 1;
            level = next;
        }
    }

    /// Check whether `folder` may be placed under `new_parent`.
    ///
    /// Walks up from `new_parent`; reaching `folder` is a cycle. `None`
    /// (move to root) is always clear.
    pub fn check_reparent(&self, folder: FolderId, new_parent: Option<FolderId>) -> Ancestry {
        let Some(start) = new_parent else {
            return Ancestry::Clear;
        };
        let mut current = Some(start);
        let mut hops = 0;
        while let Some(id) = current {
            if id == folder {
                return Ancestry::Cycle;
            }
            if hops >= MAX_TREE_DEPTH {
                return Ancestry::DepthExceeded;
            }
            hops += 1;
            current = self.parent_of(id);
        }
        Ancestry::Clear
    }
}

/// Sort sibling nodes by `(position, name)`.
pub fn sort_siblings(nodes: &mut [FolderTreeNode]) {
    nodes.sort_by(|a, b| a.view.folder.sort_key().cmp(&b.view.folder.sort_key()));
}

/// Build the folder tree from flat rows.
///
/// `direct_counts` maps a folder to the number of sources placed directly
/// in it. When `sources` is given each node also carries its own sources,
/// newest first. Folders whose parent is absent from `folders` become
/// roots, as do folders only reachable through a parent cycle.
pub fn build_tree(
    folders: Vec<Folder>,
    direct_counts: &HashMap<FolderId, i64>,
    sources: Option<Vec<SourceInFolder>>,
) -> Vec<FolderTreeNode> {
    let known: HashSet<FolderId> = folders.iter().map(|f| f.id).collect();

    let mut by_folder: HashMap<FolderId, Vec<SourceInFolder>> = HashMap::new();
    for source in sources.into_iter().flatten() {
        if let Some(folder_id) = source.folder_id {
            by_folder.entry(folder_id).or_default().push(source);
        }
    }
    for list in by_folder.values_mut() {
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    let mut root_ids = Vec::new();
    let mut child_ids: HashMap<FolderId, Vec<FolderId>> = HashMap::new();
    let mut rows: HashMap<FolderId, Folder> = HashMap::with_capacity(folders.len());
    for folder in folders {
        match folder.parent_id.filter(|p| known.contains(p)) {
            Some(parent) => child_ids.entry(parent).or_default().push(folder.id),
            None => root_ids.push(folder.id),
        }
        rows.insert(folder.id, folder);
    }

    let mut builder = TreeBuilder {
        rows,
        child_ids,
        direct_counts,
        sources: by_folder,
    };

    let mut roots: Vec<FolderTreeNode> = root_ids
        .into_iter()
        .filter_map(|id| builder.build(id, 0))
        .collect();

    // Rows left over sit on a parent cycle and were never reached.
    let mut stranded: Vec<FolderId> = builder.rows.keys().copied().collect();
    stranded.sort();
    for id in stranded {
        if let Some(node) = builder.build(id, 0) {
            roots.push(node);
        }
    }

    sort_siblings(&mut roots);
    roots
}

struct TreeBuilder<'a> {
    rows: HashMap<FolderId, Folder>,
    child_ids: HashMap<FolderId, Vec<FolderId>>,
    direct_counts: &'a HashMap<FolderId, i64>,
    sources: HashMap<FolderId, Vec<SourceInFolder>>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, id: FolderId, depth: usize) -> Option<FolderTreeNode> {
        let folder = self.rows.remove(&id)?;
        let mut children = Vec::new();
        if depth < MAX_TREE_DEPTH {
            for child in self.child_ids.remove(&id).unwrap_or_default() {
                if let Some(node) = self.build(child, depth + 1) {
                    children.push(node);
                }
            }
        }
        sort_siblings(&mut children);

        let source_count = self.direct_counts.get(&id).copied().unwrap_or(0);
        let total_sources = source_count
            + children
                .iter()
                .map(|c| c.view.stats.total_sources)
                .sum::<i64>();
        let stats = FolderStats {
            source_count,
            subfolder_count: children.len() as i64,
            total_sources,
        };

        Some(FolderTreeNode {
            view: FolderView::new(folder, stats),
            children,
            sources: self.sources.remove(&id).unwrap_or_default(),
        })
    }
}

/// Find a node anywhere in the tree.
pub fn find_node(nodes: &[FolderTreeNode], id: FolderId) -> Option<&FolderTreeNode> {
    for node in nodes {
        if node.view.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Find a node anywhere in the tree, mutably.
pub fn find_node_mut(nodes: &mut [FolderTreeNode], id: FolderId) -> Option<&mut FolderTreeNode> {
    for node in nodes {
        if node.view.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// IDs from a root down to the node (inclusive), or `None` when absent.
pub fn path_to_node(nodes: &[FolderTreeNode], id: FolderId) -> Option<Vec<FolderId>> {
    for node in nodes {
        if node.view.id() == id {
            return Some(vec![id]);
        }
        if let Some(mut rest) = path_to_node(&node.children, id) {
            rest.insert(0, node.view.id());
            return Some(rest);
        }
    }
    None
}

/// Total number of nodes in the tree.
pub fn count_nodes(nodes: &[FolderTreeNode]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + count_nodes(&n.children))
        .sum()
}

/// Whether `candidate` lies strictly below `ancestor`.
pub fn contains_descendant(
    nodes: &[FolderTreeNode],
    ancestor: FolderId,
    candidate: FolderId,
) -> bool {
    find_node(nodes, ancestor)
        .map(|node| find_node(&node.children, candidate).is_some())
        .unwrap_or(false)
}

/// Detach a node (with its subtree) from wherever it sits in the tree.
pub fn remove_node(nodes: &mut Vec<FolderTreeNode>, id: FolderId) -> Option<FolderTreeNode> {
    if let Some(pos) = nodes.iter().position(|n| n.view.id() == id) {
        return Some(nodes.remove(pos));
    }
    nodes
        .iter_mut()
        .find_map(|node| remove_node(&mut node.children, id))
}
