//! SQLite-backed storage implementation.

mod builds;
mod catalog;
mod changes;
mod config;
mod graph;
mod issues;
mod queries;
mod repositories;
mod rows;
pub mod schema;
mod store;
mod transaction;

pub use store::{SqliteStore, StoreOptions};
