//! Layrbase Database: SurrealDB implementation of the `layrbase-core`
//! repository traits.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - One repository per entity ([`repository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use surrealdb::engine::local::Db;
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
