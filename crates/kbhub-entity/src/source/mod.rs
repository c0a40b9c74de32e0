//! Source placement entities.

pub mod model;

pub use model::{SourceInFolder, SourceMoveResult, SourceRow};
