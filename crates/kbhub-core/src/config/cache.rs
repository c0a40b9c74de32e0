//! Cache configuration for derived folder views.

use serde::{Deserialize, Serialize};

/// Where cached trees and paths live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Per-process moka cache.
    #[default]
    Memory,
    /// Shared Redis instance, for several server processes.
    Redis,
}

impl CacheBackend {
    /// Lowercase name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub provider: CacheBackend,
    #[serde(default)]
    pub redis: RedisCacheConfig,
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

/// `[cache.redis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prepended to every key so several deployments can share one Redis.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// `[cache.memory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Upper bound on cached views; one tree variant plus one path per folder.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "kbhub:".to_string()
}

fn default_max_capacity() -> u64 {
    10_000
}
