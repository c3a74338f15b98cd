//! Database-backed checkpoint storage

mod migrations;
mod models;
mod sqlite;

pub use migrations::run_migrations;
pub use sqlite::SqliteCheckpointStore;
