//! Folder hierarchy limits.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Limits and caching behaviour for the folder hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Maximum nesting depth, at most [`FolderConfig::DEPTH_LIMIT`].
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// How long a built folder tree stays cached.
    #[serde(default = "default_tree_cache_ttl")]
    pub tree_cache_ttl_seconds: u64,
}

impl FolderConfig {
    /// Hard cap on parent hops. Every ancestor walk stops here, in Rust and
    /// in the SQL helper functions.
    pub const DEPTH_LIMIT: usize = 100;

    /// Reject depths the ancestor walks could not honour.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_depth == 0 || self.max_depth > Self::DEPTH_LIMIT {
            return Err(AppError::configuration(format!(
                "folders.max_depth must be between 1 and {}, got {}",
                Self::DEPTH_LIMIT,
                self.max_depth
            )));
        }
        Ok(())
    }
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            tree_cache_ttl_seconds: default_tree_cache_ttl(),
        }
    }
}

fn default_max_depth() -> usize {
    FolderConfig::DEPTH_LIMIT
}

fn default_tree_cache_ttl() -> u64 {
    60
}
