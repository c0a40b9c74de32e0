//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use kbhub_core::config::{CacheBackend, CacheConfig};
use kbhub_core::result::AppResult;
use kbhub_core::traits::cache::CacheProvider;

/// Typed JSON access over the configured [`CacheProvider`].
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
    backend: CacheBackend,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider {
            CacheBackend::Memory => {
                info!("Initializing in-memory cache provider");
                Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))
            }
            CacheBackend::Redis => {
                info!("Initializing Redis cache provider");
                Arc::new(crate::redis::RedisCacheProvider::connect(&config.redis).await?)
            }
        };

        Ok(Self {
            inner,
            backend: config.provider,
        })
    }

    /// Name of the active provider (`memory` or `redis`).
    pub fn provider_name(&self) -> &'static str {
        self.backend.as_str()
    }

    /// Read and deserialize a JSON value.
    ///
    /// An entry that no longer deserializes is dropped and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let Some(raw) = self.inner.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                self.inner.remove(key).await?;
                Ok(None)
            }
        }
    }

    /// Serialize a value as JSON and store it for `ttl`.
    pub async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.inner.put(key, &raw, ttl).await
    }

    /// Drop a single entry.
    pub async fn remove(&self, key: &str) -> AppResult<()> {
        self.inner.remove(key).await
    }

    /// Drop every entry under `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> AppResult<u64> {
        self.inner.remove_prefix(prefix).await
    }

    /// Whether the backend answers.
    pub async fn is_reachable(&self) -> AppResult<bool> {
        self.inner.ping().await.map(|()| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Entry {
        id: uuid::Uuid,
        names: Vec<String>,
    }

    #[tokio::test]
    async fn test_default_config_builds_memory_provider() {
        let cache = CacheManager::new(&CacheConfig::default()).await.unwrap();
        assert_eq!(cache.provider_name(), "memory");
        assert!(cache.is_reachable().await.unwrap());
    }

    #[tokio::test]
    async fn test_json_helpers_roundtrip_and_drop_corrupt_entries() {
        let cache = CacheManager::new(&CacheConfig::default()).await.unwrap();
        let entry = Entry {
            id: uuid::Uuid::new_v4(),
            names: vec!["docs".into()],
        };
        let ttl = Duration::from_secs(30);
        cache.set_json("kbhub:entry", &entry, ttl).await.unwrap();
        let back: Option<Entry> = cache.get_json("kbhub:entry").await.unwrap();
        assert_eq!(back, Some(entry));

        cache.inner.put("kbhub:bad", "{not json", ttl).await.unwrap();
        let bad: Option<Entry> = cache.get_json("kbhub:bad").await.unwrap();
        assert!(bad.is_none());
        assert!(cache.inner.get("kbhub:bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let cache = CacheManager::new(&CacheConfig::default()).await.unwrap();
        let ttl = Duration::from_secs(30);
        cache.set_json("kbhub:folder:a", &1, ttl).await.unwrap();
        cache.set_json("kbhub:folder:b", &2, ttl).await.unwrap();

        assert_eq!(cache.invalidate_prefix("kbhub:folder:").await.unwrap(), 2);
        assert!(cache.get_json::<i32>("kbhub:folder:a").await.unwrap().is_none());
    }
}
