//! # kbhub-api
//!
//! HTTP API layer for KBHub folders built on Axum.
//!
//! Provides the REST endpoints for folders, source placement and health,
//! plus middleware (CORS, compression, request logging), extractors, DTOs,
//! and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state};
pub use error::ApiError;
pub use state::AppState;
