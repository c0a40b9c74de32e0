//! Folder with its immediate contents.

use serde::{Deserialize, Serialize};

use super::model::FolderView;
use crate::source::SourceInFolder;

/// A folder with its immediate (non-recursive) contents and its path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderContents {
    #[serde(flatten)]
    pub view: FolderView,
    /// Immediate subfolders with counts.
    #[serde(default)]
    pub subfolders: Vec<FolderView>,
    /// Sources in this folder, newest first.
    #[serde(default)]
    pub sources: Vec<SourceInFolder>,
    /// Folder names from the root down to this folder.
    #[serde(default)]
    pub path: Vec<String>,
}
