//! Folder domain entities.

pub mod contents;
pub mod hierarchy;
pub mod model;
pub mod tree;

pub use contents::FolderContents;
pub use hierarchy::{Ancestry, FolderIndex, MAX_TREE_DEPTH};
pub use model::{
    CreateFolder, DeleteFolderOutcome, Folder, FolderChanges, FolderStats, FolderView,
};
pub use tree::{FolderTree, FolderTreeNode};
