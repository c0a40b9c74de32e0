//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use super::hierarchy;
use super::model::FolderView;
use crate::source::SourceInFolder;

/// A node in a folder tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderTreeNode {
    /// The folder and its counts.
    #[serde(flatten)]
    pub view: FolderView,
    /// Child folder nodes, ordered by `(position, name)`.
    #[serde(default)]
    pub children: Vec<FolderTreeNode>,
    /// Sources directly in this folder, present only when requested.
    #[serde(default)]
    pub sources: Vec<SourceInFolder>,
}

impl FolderTreeNode {
    /// A leaf node without children or sources.
    pub fn leaf(view: FolderView) -> Self {
        Self {
            view,
            children: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// The complete folder tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderTree {
    /// Root-level folders with nested children.
    pub tree: Vec<FolderTreeNode>,
    /// Total number of folders in the tree.
    pub total_folders: i64,
    /// Total number of sources, placed or not.
    pub total_sources: i64,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap root nodes, counting the folders they contain.
    pub fn from_roots(tree: Vec<FolderTreeNode>, total_sources: i64) -> Self {
        let total_folders = hierarchy::count_nodes(&tree) as i64;
        Self {
            tree,
            total_folders,
            total_sources,
        }
    }
}
