//! Cache keys for derived folder views.
//!
//! Every folder view lives under [`FOLDER_VIEWS`], so any folder or source
//! mutation can drop all of them with a single prefix invalidation.

use kbhub_core::types::FolderId;

/// Prefix shared by every folder-derived entry.
pub const FOLDER_VIEWS: &str = "kbhub:folder:";

/// The full tree, with or without per-folder source lists.
pub fn folder_tree(include_sources: bool) -> String {
    let variant = if include_sources { "with_sources" } else { "folders" };
    format!("{FOLDER_VIEWS}tree:{variant}")
}

/// Root-to-folder name path.
pub fn folder_path(folder_id: FolderId) -> String {
    format!("{FOLDER_VIEWS}path:{folder_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_keys_share_the_invalidation_prefix() {
        assert!(folder_tree(true).starts_with(FOLDER_VIEWS));
        assert!(folder_tree(false).starts_with(FOLDER_VIEWS));
        assert!(folder_path(FolderId::new()).starts_with(FOLDER_VIEWS));
        assert_ne!(folder_tree(true), folder_tree(false));
    }
}
