//! Folder management, tree, and validation services.

pub mod service;
pub mod tree;
pub mod validation;

pub use service::{CreateFolderInput, FolderService, UpdateFolderInput};
pub use tree::TreeService;
