//! Database layer for tempora
//!
//! This module provides the SQLite event store:
//! - Schema migrations
//! - Event inserts for loading data
//! - The [`EventStore`](crate::store::EventStore) query implementation

pub mod repo;
pub mod schema;

pub use repo::Database;
