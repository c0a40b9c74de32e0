//! # kbhub-cache
//!
//! Caches derived folder views (trees, paths) in one of two backends:
//!
//! - **memory**: per-process [moka](https://crates.io/crates/moka) cache
//! - **redis**: shared Redis instance through the [redis](https://crates.io/crates/redis) crate
//!
//! The backend is chosen by `cache.provider`.

pub mod keys;
pub mod memory;
pub mod provider;
pub mod redis;

pub use provider::CacheManager;
