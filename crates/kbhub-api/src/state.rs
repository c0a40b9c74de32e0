//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use kbhub_cache::CacheManager;
use kbhub_core::config::AppConfig;
use kbhub_database::Stores;
use kbhub_service::{FolderService, SourceService, TreeService};

/// Shared state threaded through every route via `State`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Folder and source stores.
    pub stores: Stores,
    /// Cache manager.
    pub cache: Arc<CacheManager>,
    /// Folder CRUD.
    pub folder_service: Arc<FolderService>,
    /// Tree and path lookups.
    pub tree_service: Arc<TreeService>,
    /// Source placement.
    pub source_service: Arc<SourceService>,
    /// When the state was built, for uptime reporting.
    pub started_at: Instant,
}
