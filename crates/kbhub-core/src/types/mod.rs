//! Core type definitions used across the KBHub workspace.

pub mod id;

pub use id::FolderId;
