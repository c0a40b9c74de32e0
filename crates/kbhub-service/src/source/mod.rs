//! Source placement service.

pub mod service;

pub use service::SourceService;
