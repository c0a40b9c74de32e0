//! Core traits defined in `kbhub-core` and implemented by other crates.

pub mod cache;

pub use cache::CacheProvider;
