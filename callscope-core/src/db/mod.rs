//! Database layer for callscope
//!
//! This module provides the local storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for inserts and range queries
//! - A [`CallSource`](crate::source::CallSource) implementation

pub mod repo;
pub mod schema;

pub use repo::Database;
