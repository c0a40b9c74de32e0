//! Storage seam for derived folder views.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Key/value store for serialized views such as the folder tree.
///
/// Values are opaque strings and every entry carries its own TTL. Entries are
/// grouped by key prefix so that one mutation can drop a whole family of
/// views at once.
#[async_trait]
pub trait CacheProvider: Send + Sync + fmt::Debug + 'static {
    /// The stored value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Remove every entry whose key starts with `prefix` and return how many
    /// were removed.
    async fn remove_prefix(&self, prefix: &str) -> AppResult<u64>;

    /// Succeeds when the backend is reachable.
    async fn ping(&self) -> AppResult<()>;
}
