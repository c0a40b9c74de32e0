//! # kbhub-service
//!
//! Business logic service layer for KBHub folders. Each service
//! orchestrates the folder and source stores and the cache to implement
//! application-level use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod folder;
pub mod source;

pub use folder::{CreateFolderInput, FolderService, TreeService, UpdateFolderInput};
pub use source::SourceService;
