//! # kbhub-client
//!
//! Client-side folder management for KBHub.
//!
//! - [`api`]: the [`FolderTransport`] trait mirroring the REST endpoints and
//!   its `reqwest` implementation, [`HttpFolderClient`].
//! - [`cache`]: [`FolderCache`], cached tree and list views with the patch
//!   operations used for optimistic updates.
//! - [`optimistic`]: [`OptimisticFolders`], which applies each mutation to
//!   the cache first and rolls it back when the server refuses it.
//! - [`dnd`]: [`DragController`], the drag-and-drop validation state machine.
//!
//! Hierarchy walks reuse [`kbhub_entity::folder::hierarchy`], the same code
//! the server runs.

pub mod api;
pub mod cache;
pub mod dnd;
pub mod optimistic;

pub use api::{CreateFolderRequest, FolderTransport, HttpFolderClient, UpdateFolderRequest};
pub use cache::{FolderCache, FolderCacheSnapshot};
pub use dnd::{DragController, DragItem, DragState, DropAction, DropVerdict};
pub use optimistic::OptimisticFolders;
