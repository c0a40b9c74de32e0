//! Postgres implementations of the store traits.

pub mod folder;
pub mod source;

pub use folder::FolderRepository;
pub use source::SourceRepository;
