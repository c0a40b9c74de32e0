//! # kbhub-database
//!
//! PostgreSQL connection management, the folder and source store traits,
//! their Postgres repositories, and an in-memory backend for development
//! and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{DeleteMode, DeleteOutcome, FolderStore, SourceStore, Stores};
