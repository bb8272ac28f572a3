//! Persistence - SQLite storage for settings and repository snapshots

mod database;

pub use database::{Database, DATABASE_FILE};
