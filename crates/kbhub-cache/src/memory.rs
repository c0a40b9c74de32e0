//! Per-process view cache on moka.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use kbhub_core::config::MemoryCacheConfig;
use kbhub_core::result::AppResult;
use kbhub_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Each entry expires after the TTL it was written with.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// moka-backed [`CacheProvider`].
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    entries: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(config.max_capacity)
                .expire_after(EntryTtl)
                .build(),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> AppResult<u64> {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.entries.remove(&key).await.is_some() {
                removed += 1;
            }
        }
        debug!(prefix, removed, "Removed cached views");
        Ok(removed)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig::default())
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = provider();
        cache.put("kbhub:a", "1", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get("kbhub:a").await.unwrap().as_deref(), Some("1"));

        cache.remove("kbhub:a").await.unwrap();
        assert!(cache.get("kbhub:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_individually() {
        let cache = provider();
        cache.put("short", "x", Duration::from_millis(50)).await.unwrap();
        cache.put("long", "y", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("short").await.unwrap().is_none());
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_remove_prefix_spares_other_keys() {
        let cache = provider();
        let ttl = Duration::from_secs(30);
        cache.put("kbhub:folder:tree:folders", "t", ttl).await.unwrap();
        cache.put("kbhub:folder:path:1", "p", ttl).await.unwrap();
        cache.put("kbhub:other", "o", ttl).await.unwrap();

        assert_eq!(cache.remove_prefix("kbhub:folder:").await.unwrap(), 2);
        assert!(cache.get("kbhub:other").await.unwrap().is_some());
        assert!(cache.get("kbhub:folder:path:1").await.unwrap().is_none());
    }
}
