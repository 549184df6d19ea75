//! SQLite-backed storage implementation.

mod config;
mod routes;
pub mod schema;
mod store;
mod tasks;

pub use store::SqliteStore;
