//! Convenience result type alias for KBHub.

use crate::error::AppError;

/// A specialized `Result` type for KBHub operations.
pub type AppResult<T> = Result<T, AppError>;
