//! # kbhub-entity
//!
//! Domain entity models for KBHub folders. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! additionally derive `sqlx::FromRow`.
//!
//! The [`folder::hierarchy`] module holds the tree utilities shared by the
//! server and the client.

pub mod folder;
pub mod source;
