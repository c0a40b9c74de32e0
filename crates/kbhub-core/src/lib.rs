//! # kbhub-core
//!
//! Core crate for KBHub. Contains the unified error system, configuration
//! schemas, typed identifiers, and the traits implemented by the
//! infrastructure crates.
//!
//! This crate has **no** internal dependencies on other KBHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
